//! Uniform Bundle - the per-frame contract between pipeline and renderer
//!
//! Mutated in place once per tick by its owner, read by the stage adapter.

use kinesis_signal::{PointerState, PoseFeatures, JOINT_BUFFER_LEN};

use crate::{Channel, UniformUpdate, UniformValue};

/// Default music/motion sensitivity multiplier
pub const DEFAULT_REACTIVITY: f32 = 0.9;

/// Snapshot of every common channel
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBundle {
    /// Smoothed pointer position in `[0, 1]²`
    pub pointer: [f32; 2],
    /// Pointer velocity, normalized units per second
    pub pointer_velocity: [f32; 2],
    /// x0, y0, ..., x32, y32 in `[0, 1]²`
    pub joints: [f32; JOINT_BUFFER_LEN],
    pub body_speed: f32,
    pub expand: f32,
    pub accent: f32,
    pub music_reactivity: f32,
    pub motion_reactivity: f32,
    /// Seconds since session start
    pub time: f32,
    /// Seconds since previous frame
    pub delta: f32,
}

impl Default for UniformBundle {
    fn default() -> Self {
        Self {
            pointer: [0.5, 0.5],
            pointer_velocity: [0.0, 0.0],
            joints: [0.0; JOINT_BUFFER_LEN],
            body_speed: 0.0,
            expand: 0.0,
            accent: 0.0,
            music_reactivity: DEFAULT_REACTIVITY,
            motion_reactivity: DEFAULT_REACTIVITY,
            time: 0.0,
            delta: 0.0,
        }
    }
}

impl UniformBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_pointer(&mut self, pointer: &PointerState) {
        self.pointer = pointer.position.to_array();
        self.pointer_velocity = pointer.velocity.to_array();
    }

    pub fn merge_pose(&mut self, features: &PoseFeatures, joints: &[f32; JOINT_BUFFER_LEN]) {
        self.body_speed = features.body_speed();
        self.expand = features.expand();
        self.accent = features.accent();
        self.joints.copy_from_slice(joints);
    }

    pub fn merge_timing(&mut self, time: f32, delta: f32) {
        self.time = time;
        self.delta = delta;
    }

    pub fn set_reactivity(&mut self, music: f32, motion: f32) {
        self.music_reactivity = music;
        self.motion_reactivity = motion;
    }

    /// Current value of a channel
    pub fn value(&self, channel: Channel) -> UniformValue<'_> {
        match channel {
            Channel::Pointer => UniformValue::Vec2(self.pointer),
            Channel::PointerVelocity => UniformValue::Vec2(self.pointer_velocity),
            Channel::Joints => UniformValue::Buffer(&self.joints),
            Channel::BodySpeed => UniformValue::Scalar(self.body_speed),
            Channel::Expand => UniformValue::Scalar(self.expand),
            Channel::Accent => UniformValue::Scalar(self.accent),
            Channel::MusicReactivity => UniformValue::Scalar(self.music_reactivity),
            Channel::MotionReactivity => UniformValue::Scalar(self.motion_reactivity),
            Channel::Time => UniformValue::Scalar(self.time),
            Channel::Delta => UniformValue::Scalar(self.delta),
        }
    }

    /// Full update carrying every common channel
    pub fn to_update(&self) -> UniformUpdate<'_> {
        let mut update = UniformUpdate::with_capacity(Channel::all().len() + 1);
        for channel in Channel::all() {
            update.set_channel(*channel, self.value(*channel));
        }
        update
    }
}
