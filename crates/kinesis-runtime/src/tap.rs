//! Read-only bundle snapshots for consumers outside the frame loop

use std::sync::Arc;

use kinesis_stage::UniformBundle;
use parking_lot::RwLock;

/// Shared handle to the most recently published bundle.
///
/// Clones share the same slot. Readers get an `Arc` snapshot and never block
/// the session for longer than a pointer swap.
#[derive(Debug, Clone, Default)]
pub struct BundleTap {
    latest: Arc<RwLock<Arc<UniformBundle>>>,
}

impl BundleTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot
    pub fn publish(&self, bundle: &UniformBundle) {
        let snapshot = Arc::new(bundle.clone());
        *self.latest.write() = snapshot;
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<UniformBundle> {
        Arc::clone(&self.latest.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_snapshot() {
        let tap = BundleTap::new();
        let reader = tap.clone();
        assert_eq!(reader.snapshot().time, 0.0);

        let mut bundle = UniformBundle::default();
        bundle.merge_timing(3.0, 0.016);
        tap.publish(&bundle);

        let snap = reader.snapshot();
        assert_eq!(snap.time, 3.0);

        // Older snapshots are unaffected by later publishes
        bundle.merge_timing(4.0, 0.016);
        tap.publish(&bundle);
        assert_eq!(snap.time, 3.0);
        assert_eq!(reader.snapshot().time, 4.0);
    }

    #[test]
    fn test_tap_across_threads() {
        let tap = BundleTap::new();
        let reader = tap.clone();

        let handle = std::thread::spawn(move || {
            let mut bundle = UniformBundle::default();
            bundle.accent = 0.5;
            tap.publish(&bundle);
        });
        handle.join().unwrap();

        assert_eq!(reader.snapshot().accent, 0.5);
    }
}
