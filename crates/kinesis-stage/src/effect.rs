//! Effect registry
//!
//! The set of visual effects is closed. Each effect owns a shader program
//! and declares the subset of common channels it reads, plus its own extras.

use kinesis_core::{KinesisError, KinesisResult};
use serde::{Deserialize, Serialize};

use crate::{Channel, Material, Parameter, ParameterSet, UniformBundle, UniformKind};

/// Extra uniform carrying the current quality scale
pub const QUALITY_SCALE_UNIFORM: &str = "qualityScale";

/// Visual effect identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// Curl-like flow field steered by pointer and wrists
    #[default]
    FlowField,
    /// Particle trails attracted to the pointer
    ParticleSwarm,
    /// Skeleton outline drawn from the joint buffer
    Silhouette,
    /// Mirrored segments opened by body expansion
    Kaleidoscope,
}

impl EffectKind {
    pub fn all() -> &'static [EffectKind] {
        &[
            EffectKind::FlowField,
            EffectKind::ParticleSwarm,
            EffectKind::Silhouette,
            EffectKind::Kaleidoscope,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::FlowField => "flow-field",
            EffectKind::ParticleSwarm => "particle-swarm",
            EffectKind::Silhouette => "silhouette",
            EffectKind::Kaleidoscope => "kaleidoscope",
        }
    }

    /// Parse a registry name
    pub fn from_name(name: &str) -> KinesisResult<EffectKind> {
        EffectKind::all()
            .iter()
            .copied()
            .find(|e| e.name() == name)
            .ok_or_else(|| KinesisError::UnknownEffect(name.to_string()))
    }

    /// Common channels this effect reads
    pub fn channels(self) -> &'static [Channel] {
        match self {
            EffectKind::FlowField => Channel::all(),
            EffectKind::ParticleSwarm => &[
                Channel::Pointer,
                Channel::PointerVelocity,
                Channel::BodySpeed,
                Channel::Accent,
                Channel::MusicReactivity,
                Channel::MotionReactivity,
                Channel::Time,
                Channel::Delta,
            ],
            EffectKind::Silhouette => &[
                Channel::Joints,
                Channel::Expand,
                Channel::Accent,
                Channel::MotionReactivity,
                Channel::Time,
            ],
            EffectKind::Kaleidoscope => &[
                Channel::Pointer,
                Channel::BodySpeed,
                Channel::Expand,
                Channel::Accent,
                Channel::MusicReactivity,
                Channel::Time,
            ],
        }
    }

    /// Effect-specific uniforms beyond the common set
    fn extras(self) -> Vec<UniformDecl> {
        match self {
            EffectKind::FlowField => vec![
                UniformDecl::scalar("hueShift", 0.0),
                UniformDecl::scalar("flowScale", 1.0),
                UniformDecl::scalar(QUALITY_SCALE_UNIFORM, 1.0),
            ],
            EffectKind::ParticleSwarm => vec![
                UniformDecl::scalar("trailDecay", 0.92),
                UniformDecl::scalar(QUALITY_SCALE_UNIFORM, 1.0),
            ],
            EffectKind::Silhouette => vec![UniformDecl::scalar("lineWidth", 0.004)],
            EffectKind::Kaleidoscope => vec![UniformDecl::scalar("segments", 6.0)],
        }
    }

    fn fragment_source(self) -> &'static str {
        match self {
            EffectKind::FlowField => FLOW_FIELD_FRAGMENT,
            EffectKind::ParticleSwarm => PARTICLE_SWARM_FRAGMENT,
            EffectKind::Silhouette => SILHOUETTE_FRAGMENT,
            EffectKind::Kaleidoscope => KALEIDOSCOPE_FRAGMENT,
        }
    }

    /// Build the program descriptor for this effect
    pub fn program(self) -> EffectProgram {
        let mut declared_uniforms: Vec<UniformDecl> =
            self.channels().iter().map(|c| UniformDecl::channel(*c)).collect();
        declared_uniforms.extend(self.extras());

        EffectProgram {
            kind: self,
            vertex_source: FULLSCREEN_VERTEX,
            fragment_source: self.fragment_source(),
            declared_uniforms,
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One uniform an effect declares, with its initial value
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub initial: Parameter,
}

impl UniformDecl {
    pub fn scalar(name: &'static str, initial: f32) -> Self {
        Self {
            name,
            initial: Parameter::Scalar(initial),
        }
    }

    pub fn vec2(name: &'static str, initial: [f32; 2]) -> Self {
        Self {
            name,
            initial: Parameter::Vec2(initial),
        }
    }

    pub fn buffer(name: &'static str, len: usize) -> Self {
        Self {
            name,
            initial: Parameter::buffer(len),
        }
    }

    /// Declaration of a common channel, initialized to the bundle default
    pub fn channel(channel: Channel) -> Self {
        let defaults = UniformBundle::default();
        Self {
            name: channel.name(),
            initial: Parameter::from_value(defaults.value(channel)),
        }
    }

    pub fn kind(&self) -> UniformKind {
        self.initial.kind()
    }
}

/// Shader sources and uniform declarations for one effect
#[derive(Debug, Clone, PartialEq)]
pub struct EffectProgram {
    pub kind: EffectKind,
    pub vertex_source: &'static str,
    pub fragment_source: &'static str,
    pub declared_uniforms: Vec<UniformDecl>,
}

impl EffectProgram {
    /// Check that common channels are declared with their canonical kind
    pub fn validate(&self) -> KinesisResult<()> {
        for decl in &self.declared_uniforms {
            if let Some(channel) = Channel::from_name(decl.name) {
                if decl.kind() != channel.kind() {
                    return Err(KinesisError::ChannelKindMismatch {
                        channel: decl.name.to_string(),
                        expected: channel.kind().name(),
                        actual: decl.kind().name(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declared_uniforms.iter().any(|d| d.name == name)
    }

    /// Fresh parameter storage for every declared uniform
    pub fn parameters(&self) -> ParameterSet {
        let mut params = ParameterSet::new();
        for decl in &self.declared_uniforms {
            params.declare(decl.name, decl.initial.clone());
        }
        params
    }
}

/// Material bound to one effect program
#[derive(Debug, Clone, PartialEq)]
pub struct EffectMaterial {
    kind: EffectKind,
    params: ParameterSet,
}

impl EffectMaterial {
    pub fn for_effect(kind: EffectKind) -> Self {
        Self {
            kind,
            params: kind.program().parameters(),
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn program(&self) -> EffectProgram {
        self.kind.program()
    }
}

impl Default for EffectMaterial {
    fn default() -> Self {
        Self::for_effect(EffectKind::default())
    }
}

impl Material for EffectMaterial {
    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }
}

const FULLSCREEN_VERTEX: &str = r#"#version 300 es
in vec2 position;
out vec2 vUv;

void main() {
    vUv = position * 0.5 + 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

const FLOW_FIELD_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 vUv;
out vec4 fragColor;

uniform vec2 pointer;
uniform vec2 pointerVelocity;
uniform float joints[66];
uniform float bodySpeed;
uniform float expand;
uniform float accent;
uniform float musicReactivity;
uniform float motionReactivity;
uniform float time;
uniform float delta;
uniform float hueShift;
uniform float flowScale;
uniform float qualityScale;

vec3 palette(float t) {
    return 0.5 + 0.5 * cos(6.28318 * (t + vec3(0.0, 0.33, 0.67) + hueShift));
}

void main() {
    vec2 p = vUv * flowScale * (1.0 + expand);
    vec2 leftWrist = vec2(joints[30], joints[31]);
    vec2 rightWrist = vec2(joints[32], joints[33]);
    float pull = exp(-8.0 * length(leftWrist - vUv)) + exp(-8.0 * length(rightWrist - vUv));
    float swirl = motionReactivity * bodySpeed + length(pointerVelocity) * 0.1;
    float angle = sin(p.x * 3.0 + time) + cos(p.y * 3.0 - time) + swirl + pull;
    vec2 flow = vec2(cos(angle), sin(angle)) + (pointer - vUv);
    float lines = 0.5 + 0.5 * sin(dot(flow, p) * 10.0 * qualityScale + delta);
    float glow = accent * musicReactivity;
    fragColor = vec4(palette(lines + glow) * (0.6 + glow), 1.0);
}
"#;

const PARTICLE_SWARM_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 vUv;
out vec4 fragColor;

uniform vec2 pointer;
uniform vec2 pointerVelocity;
uniform float bodySpeed;
uniform float accent;
uniform float musicReactivity;
uniform float motionReactivity;
uniform float time;
uniform float delta;
uniform float trailDecay;
uniform float qualityScale;

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(127.1, 311.7))) * 43758.5453);
}

void main() {
    float count = floor(48.0 * qualityScale);
    float energy = 0.0;
    for (float i = 0.0; i < 48.0; i += 1.0) {
        if (i >= count) break;
        vec2 seed = vec2(i, i * 1.7);
        float phase = time * (0.2 + hash(seed)) + motionReactivity * bodySpeed;
        vec2 orbit = vec2(cos(phase), sin(phase)) * (0.1 + 0.3 * hash(seed.yx));
        vec2 particle = pointer + orbit - pointerVelocity * delta * 4.0;
        energy += 0.002 / (length(vUv - particle) + 0.001);
    }
    energy *= pow(trailDecay, 1.0 + bodySpeed * 4.0);
    float flash = accent * musicReactivity;
    fragColor = vec4(vec3(energy) * vec3(0.9, 0.6 + flash, 1.0), 1.0);
}
"#;

const SILHOUETTE_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 vUv;
out vec4 fragColor;

uniform float joints[66];
uniform float expand;
uniform float accent;
uniform float motionReactivity;
uniform float time;
uniform float lineWidth;

vec2 joint(int i) {
    return vec2(joints[i * 2], joints[i * 2 + 1]);
}

float segment(vec2 p, vec2 a, vec2 b) {
    vec2 pa = p - a;
    vec2 ba = b - a;
    float h = clamp(dot(pa, ba) / max(dot(ba, ba), 1e-6), 0.0, 1.0);
    return length(pa - ba * h);
}

void main() {
    float d = 1.0;
    d = min(d, segment(vUv, joint(11), joint(12)));
    d = min(d, segment(vUv, joint(11), joint(13)));
    d = min(d, segment(vUv, joint(13), joint(15)));
    d = min(d, segment(vUv, joint(12), joint(14)));
    d = min(d, segment(vUv, joint(14), joint(16)));
    d = min(d, segment(vUv, joint(11), joint(23)));
    d = min(d, segment(vUv, joint(12), joint(24)));
    d = min(d, segment(vUv, joint(23), joint(24)));
    d = min(d, segment(vUv, joint(23), joint(25)));
    d = min(d, segment(vUv, joint(25), joint(27)));
    d = min(d, segment(vUv, joint(24), joint(26)));
    d = min(d, segment(vUv, joint(26), joint(28)));
    float width = lineWidth * (1.0 + expand + accent * motionReactivity);
    float line = smoothstep(width, 0.0, d);
    vec3 tint = 0.5 + 0.5 * cos(time + vec3(0.0, 2.0, 4.0));
    fragColor = vec4(tint * line, 1.0);
}
"#;

const KALEIDOSCOPE_FRAGMENT: &str = r#"#version 300 es
precision highp float;
in vec2 vUv;
out vec4 fragColor;

uniform vec2 pointer;
uniform float bodySpeed;
uniform float expand;
uniform float accent;
uniform float musicReactivity;
uniform float time;
uniform float segments;

void main() {
    vec2 p = vUv - pointer;
    float r = length(p) * (1.0 + expand * 2.0);
    float a = atan(p.y, p.x);
    float wedge = 6.28318 / max(segments, 1.0);
    a = abs(mod(a, wedge) - wedge * 0.5);
    float pattern = sin(r * 20.0 - time * (1.0 + bodySpeed)) * cos(a * 12.0);
    float pulse = accent * musicReactivity;
    fragColor = vec4(vec3(0.5 + 0.5 * pattern) * vec3(1.0, 0.7 + pulse, 0.9), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_names_roundtrip() {
        for kind in EffectKind::all() {
            assert_eq!(EffectKind::from_name(kind.name()), Ok(*kind));
        }
        assert_eq!(
            EffectKind::from_name("plasma"),
            Err(KinesisError::UnknownEffect("plasma".into()))
        );
    }

    #[test]
    fn test_programs_validate() {
        for kind in EffectKind::all() {
            let program = kind.program();
            assert!(program.validate().is_ok(), "{kind} failed validation");
        }
    }

    #[test]
    fn test_sources_declare_every_uniform() {
        for kind in EffectKind::all() {
            let program = kind.program();
            for decl in &program.declared_uniforms {
                assert!(
                    program.fragment_source.contains(&format!(" {};", decl.name))
                        || program.fragment_source.contains(&format!(" {}[", decl.name)),
                    "{kind} source lacks {}",
                    decl.name
                );
            }
        }
    }

    #[test]
    fn test_effects_omit_channels() {
        let swarm = EffectKind::ParticleSwarm.program();
        assert!(!swarm.declares("joints"));
        assert!(!swarm.declares("expand"));
        assert!(swarm.declares(QUALITY_SCALE_UNIFORM));

        let silhouette = EffectKind::Silhouette.program();
        assert!(silhouette.declares("joints"));
        assert!(!silhouette.declares("pointer"));
    }

    #[test]
    fn test_validate_rejects_wrong_kind() {
        let mut program = EffectKind::Kaleidoscope.program();
        program.declared_uniforms.push(UniformDecl::scalar("pointer", 0.0));

        let err = program.validate().unwrap_err();
        assert_eq!(
            err,
            KinesisError::ChannelKindMismatch {
                channel: "pointer".into(),
                expected: "vec2",
                actual: "scalar",
            }
        );
    }

    #[test]
    fn test_material_initial_values() {
        let material = EffectMaterial::for_effect(EffectKind::FlowField);
        let params = material.parameters();

        assert_eq!(params.vec2("pointer"), Some([0.5, 0.5]));
        assert_eq!(params.scalar("musicReactivity"), Some(0.9));
        assert_eq!(params.buffer("joints").map(<[f32]>::len), Some(66));
        assert_eq!(params.scalar("flowScale"), Some(1.0));
        assert_eq!(params.len(), Channel::all().len() + 3);
    }

    #[test]
    fn test_effect_kind_display() {
        assert_eq!(EffectKind::ParticleSwarm.to_string(), "particle-swarm");
        assert_eq!(EffectKind::default(), EffectKind::FlowField);
    }
}
