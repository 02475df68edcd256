//! Stage Adapter - copies uniform updates into the active material
//!
//! Values are written into storage the material already owns. Vectors are
//! set component-wise and buffers element-wise, so an update never
//! reallocates or replaces a parameter.

use crate::{Material, Parameter, UniformBundle, UniformUpdate, UniformValue};

/// Outcome of applying one update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Entries written into the material
    pub applied: usize,
    /// Entries the material does not declare
    pub missing: usize,
    /// Entries whose kind differs from the declared parameter
    pub mismatched: usize,
    /// Buffer entries whose length differed from the declared buffer
    pub truncated: usize,
}

impl ApplyReport {
    pub fn skipped(&self) -> usize {
        self.missing + self.mismatched
    }
}

/// Cumulative adapter statistics
#[derive(Debug, Clone, Default)]
pub struct AdapterStats {
    pub updates: u64,
    pub applied: u64,
    pub missing: u64,
    pub mismatched: u64,
    pub truncated: u64,
}

impl AdapterStats {
    fn record(&mut self, report: &ApplyReport) {
        self.updates += 1;
        self.applied += report.applied as u64;
        self.missing += report.missing as u64;
        self.mismatched += report.mismatched as u64;
        self.truncated += report.truncated as u64;
    }
}

/// Binds uniform updates to a material's parameters
#[derive(Debug)]
pub struct StageAdapter<M: Material> {
    material: M,
    stats: AdapterStats,
}

impl<M: Material> StageAdapter<M> {
    pub fn new(material: M) -> Self {
        Self {
            material,
            stats: AdapterStats::default(),
        }
    }

    /// Apply a partial update. Channels absent from the update are untouched.
    pub fn set_uniforms(&mut self, update: &UniformUpdate<'_>) -> ApplyReport {
        let mut report = ApplyReport::default();
        let params = self.material.parameters_mut();

        for (name, value) in update.iter() {
            let Some(param) = params.get_mut(name) else {
                tracing::trace!("uniform {} not declared by material, skipped", name);
                report.missing += 1;
                continue;
            };

            match (param, *value) {
                (Parameter::Scalar(dst), UniformValue::Scalar(v)) => {
                    *dst = v;
                    report.applied += 1;
                }
                (Parameter::Vec2(dst), UniformValue::Vec2(v)) => {
                    dst[0] = v[0];
                    dst[1] = v[1];
                    report.applied += 1;
                }
                (Parameter::Buffer(dst), UniformValue::Buffer(src)) => {
                    let n = dst.len().min(src.len());
                    dst[..n].copy_from_slice(&src[..n]);
                    if dst.len() != src.len() {
                        report.truncated += 1;
                    }
                    report.applied += 1;
                }
                (param, value) => {
                    tracing::debug!(
                        "uniform {} kind mismatch: declared {}, got {}",
                        name,
                        param.kind().name(),
                        value.kind().name()
                    );
                    report.mismatched += 1;
                }
            }
        }

        self.stats.record(&report);
        report
    }

    /// Apply every common channel of a bundle
    pub fn apply_bundle(&mut self, bundle: &UniformBundle) -> ApplyReport {
        self.set_uniforms(&bundle.to_update())
    }

    pub fn material(&self) -> &M {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut M {
        &mut self.material
    }

    /// Swap in a new material, returning the previous one
    pub fn replace_material(&mut self, material: M) -> M {
        std::mem::replace(&mut self.material, material)
    }

    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EffectKind, EffectMaterial, ParameterSet};
    use proptest::prelude::*;

    fn flow_adapter() -> StageAdapter<EffectMaterial> {
        StageAdapter::new(EffectMaterial::for_effect(EffectKind::FlowField))
    }

    #[test]
    fn test_partial_update_leaves_rest() {
        let mut adapter = flow_adapter();
        let before = adapter.material().parameters().clone();

        let report = adapter.set_uniforms(&UniformUpdate::new().scalar("bodySpeed", 0.42));
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped(), 0);

        let params = adapter.material().parameters();
        assert_eq!(params.scalar("bodySpeed"), Some(0.42));
        for (name, param) in before.iter().filter(|(n, _)| *n != "bodySpeed") {
            assert_eq!(params.get(name), Some(param), "{name} changed");
        }
    }

    #[test]
    fn test_vec2_and_buffer_in_place() {
        let mut adapter = flow_adapter();
        let joints: Vec<f32> = (0..66).map(|i| i as f32 / 66.0).collect();

        adapter.set_uniforms(
            &UniformUpdate::new()
                .vec2("pointer", [0.1, 0.9])
                .buffer("joints", &joints),
        );

        let params = adapter.material().parameters();
        assert_eq!(params.vec2("pointer"), Some([0.1, 0.9]));
        assert_eq!(params.buffer("joints"), Some(joints.as_slice()));
    }

    #[test]
    fn test_buffer_length_mismatch_copies_prefix() {
        let mut adapter = StageAdapter::new(ParameterSet::new().with("joints", Parameter::buffer(4)));

        let long = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let report = adapter.set_uniforms(&UniformUpdate::new().buffer("joints", &long));
        assert_eq!(report.truncated, 1);
        assert_eq!(adapter.material().buffer("joints"), Some(&[1.0, 2.0, 3.0, 4.0][..]));

        let short = [9.0, 8.0];
        adapter.set_uniforms(&UniformUpdate::new().buffer("joints", &short));
        assert_eq!(adapter.material().buffer("joints"), Some(&[9.0, 8.0, 3.0, 4.0][..]));
    }

    #[test]
    fn test_missing_and_mismatched_skipped() {
        let mut adapter = StageAdapter::new(EffectMaterial::for_effect(EffectKind::Silhouette));

        let report = adapter.set_uniforms(
            &UniformUpdate::new()
                .vec2("pointer", [0.2, 0.2])
                .vec2("expand", [1.0, 1.0])
                .scalar("accent", 0.5),
        );

        assert_eq!(report.missing, 1);
        assert_eq!(report.mismatched, 1);
        assert_eq!(report.applied, 1);

        let params = adapter.material().parameters();
        assert_eq!(params.scalar("expand"), Some(0.0));
        assert_eq!(params.scalar("accent"), Some(0.5));
        assert!(!params.contains("pointer"));
    }

    #[test]
    fn test_apply_bundle_and_stats() {
        let mut adapter = StageAdapter::new(EffectMaterial::for_effect(EffectKind::ParticleSwarm));
        let mut bundle = UniformBundle::default();
        bundle.merge_timing(2.0, 0.016);
        bundle.accent = 0.3;

        let report = adapter.apply_bundle(&bundle);
        // Swarm omits joints and expand
        assert_eq!(report.missing, 2);
        assert_eq!(report.applied, 8);

        let params = adapter.material().parameters();
        assert_eq!(params.scalar("time"), Some(2.0));
        assert_eq!(params.scalar("accent"), Some(0.3));
        assert_eq!(params.scalar("trailDecay"), Some(0.92));

        adapter.apply_bundle(&bundle);
        assert_eq!(adapter.stats().updates, 2);
        assert_eq!(adapter.stats().applied, 16);
    }

    #[test]
    fn test_replace_material() {
        let mut adapter = flow_adapter();
        let old = adapter.replace_material(EffectMaterial::for_effect(EffectKind::Kaleidoscope));
        assert_eq!(old.kind(), EffectKind::FlowField);
        assert_eq!(adapter.material().kind(), EffectKind::Kaleidoscope);
    }

    proptest! {
        #[test]
        fn prop_scalar_update_touches_only_target(
            idx in 0usize..8,
            value in -10.0f32..10.0,
        ) {
            let names = [
                "bodySpeed", "expand", "accent", "musicReactivity",
                "motionReactivity", "time", "delta", "hueShift",
            ];
            let target = names[idx];

            let mut adapter = flow_adapter();
            let before = adapter.material().parameters().clone();
            adapter.set_uniforms(&UniformUpdate::new().scalar(target, value));

            let params = adapter.material().parameters();
            prop_assert_eq!(params.scalar(target), Some(value));
            for (name, param) in before.iter().filter(|(n, _)| *n != target) {
                prop_assert_eq!(params.get(name), Some(param));
            }
        }
    }
}
