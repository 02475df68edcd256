//! Frame timing model - jittery render deltas with occasional stalls

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// How a simulated host schedules frames
#[derive(Clone, Debug)]
pub struct FrameTimingModel {
    /// Nominal frame interval (milliseconds)
    pub base_ms: f32,
    /// Uniform jitter around the base (milliseconds)
    pub jitter_ms: f32,
    /// Chance that a frame stalls
    pub stall_probability: f64,
    /// Duration of a stalled frame (milliseconds)
    pub stall_ms: f32,
    rng: StdRng,
}

impl FrameTimingModel {
    pub fn new(base_ms: f32, jitter_ms: f32, stall_probability: f64, stall_ms: f32, seed: u64) -> Self {
        FrameTimingModel {
            base_ms,
            jitter_ms,
            stall_probability,
            stall_ms,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 60 fps with a little scheduling noise
    pub fn steady(seed: u64) -> Self {
        Self::new(16.6, 1.5, 0.0, 0.0, seed)
    }

    /// 60 fps with visible jitter and rare long stalls
    pub fn jittery(seed: u64) -> Self {
        Self::new(16.6, 6.0, 0.02, 250.0, seed)
    }

    /// Hardware that cannot hold 30 fps
    pub fn struggling(seed: u64) -> Self {
        Self::new(38.0, 4.0, 0.05, 120.0, seed)
    }

    /// Next frame delta
    pub fn next_delta(&mut self) -> Duration {
        let ms = if self.stall_probability > 0.0 && self.rng.gen_bool(self.stall_probability.min(1.0)) {
            self.stall_ms
        } else if self.jitter_ms > 0.0 {
            self.base_ms + self.rng.gen_range(-self.jitter_ms..=self.jitter_ms)
        } else {
            self.base_ms
        };
        Duration::from_micros((ms.max(0.0) * 1000.0) as u64)
    }
}
