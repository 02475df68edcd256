//! Pose Features - kinematic and expressive signals from body landmarks
//!
//! Each update folds one landmark frame into the previous feature set.
//! The carry state (previous centroid, wrists, hand speed, adaptive speed
//! ceiling) travels inside the returned value, so the extractor itself
//! holds nothing between calls.
//!
//! # Features
//!
//! - `body_speed`: shoulder-centroid speed over an adaptive ceiling, EMA smoothed
//! - `expand`: hand span plus weighted ankle span over twice the shoulder width
//! - `accent`: attack-fast / decay-slow envelope on wrist acceleration
//! - joint angles: elbows and knees, in radians
//! - `sharpness`: how close the four joints are to fully extended

use std::f32::consts::PI;

use kinesis_core::{ema, ensure_positive, ensure_range, three_point_angle, KinesisResult, Vec2, EPSILON};
use serde::{Deserialize, Serialize};

use crate::{Joint, PoseFrame, JOINT_BUFFER_LEN};

/// Pose extractor configuration
///
/// The defaults are empirically tuned and must be kept as-is for parity
/// with existing effect presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Floor applied to `dt` (seconds)
    pub min_dt_secs: f32,
    /// Initial adaptive speed ceiling
    pub speed_ceiling_init: f32,
    /// EMA coefficient of the speed ceiling
    pub speed_ceiling_alpha: f32,
    /// Ceiling target as a multiple of instantaneous speed
    pub speed_ceiling_headroom: f32,
    /// EMA coefficient of `body_speed`
    pub body_speed_alpha: f32,
    /// EMA coefficient of `expand`
    pub expand_alpha: f32,
    /// Weight of the ankle span relative to the hand span
    pub ankle_span_weight: f32,
    /// Acceleration to accent gain
    pub accent_gain: f32,
    /// Per-update accent decay
    pub accent_decay: f32,
    /// Landmarks below this visibility are treated as absent
    pub min_visibility: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            min_dt_secs: 1.0 / 120.0,
            speed_ceiling_init: 600.0,
            speed_ceiling_alpha: 0.05,
            speed_ceiling_headroom: 1.25,
            body_speed_alpha: 0.25,
            expand_alpha: 0.25,
            ankle_span_weight: 0.6,
            accent_gain: 2.5,
            accent_decay: 0.85,
            min_visibility: 0.0,
        }
    }
}

impl PoseConfig {
    /// Faster-reacting variant for low-rate pose sources
    pub fn responsive() -> Self {
        Self {
            body_speed_alpha: 0.5,
            expand_alpha: 0.5,
            speed_ceiling_alpha: 0.1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> KinesisResult<()> {
        ensure_positive("pose.min_dt_secs", self.min_dt_secs)?;
        ensure_positive("pose.speed_ceiling_init", self.speed_ceiling_init)?;
        ensure_range("pose.speed_ceiling_alpha", self.speed_ceiling_alpha, 0.0, 1.0)?;
        ensure_positive("pose.speed_ceiling_headroom", self.speed_ceiling_headroom)?;
        ensure_range("pose.body_speed_alpha", self.body_speed_alpha, 0.0, 1.0)?;
        ensure_range("pose.expand_alpha", self.expand_alpha, 0.0, 1.0)?;
        ensure_range("pose.ankle_span_weight", self.ankle_span_weight, 0.0, 10.0)?;
        ensure_positive("pose.accent_gain", self.accent_gain)?;
        ensure_range("pose.accent_decay", self.accent_decay, 0.0, 1.0)?;
        ensure_range("pose.min_visibility", self.min_visibility, 0.0, 1.0)
    }

    fn floor_dt(&self, dt_secs: f32) -> f32 {
        // f32::max ignores NaN
        dt_secs.max(self.min_dt_secs).max(f32::EPSILON)
    }
}

/// Elbow and knee angles in radians, each in `[0, π]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointAngles {
    pub left_elbow: f32,
    pub right_elbow: f32,
    pub left_knee: f32,
    pub right_knee: f32,
}

impl JointAngles {
    pub fn as_array(&self) -> [f32; 4] {
        [self.left_elbow, self.right_elbow, self.left_knee, self.right_knee]
    }

    /// Mean closeness to fully extended: 1.0 straight, 0.0 folded
    pub fn sharpness(&self) -> f32 {
        let sum: f32 = self
            .as_array()
            .iter()
            .map(|a| 1.0 - (PI - a).abs() / PI)
            .sum();
        unit(sum / 4.0)
    }
}

/// Values carried from one update to the next
#[derive(Debug, Clone, Copy, PartialEq)]
struct PoseCarry {
    centroid: Option<Vec2>,
    left_wrist: Option<Vec2>,
    right_wrist: Option<Vec2>,
    hand_speed: f32,
    speed_hi: f32,
}

/// Smoothed pose features for one performer
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFeatures {
    body_speed: f32,
    expand: f32,
    accent: f32,
    angles: JointAngles,
    sharpness: f32,
    carry: PoseCarry,
}

impl Default for PoseFeatures {
    fn default() -> Self {
        Self::initial(&PoseConfig::default())
    }
}

impl PoseFeatures {
    /// Zeroed features with the configured initial speed ceiling
    pub fn initial(config: &PoseConfig) -> Self {
        Self {
            body_speed: 0.0,
            expand: 0.0,
            accent: 0.0,
            angles: JointAngles::default(),
            sharpness: 0.0,
            carry: PoseCarry {
                centroid: None,
                left_wrist: None,
                right_wrist: None,
                hand_speed: 0.0,
                speed_hi: config.speed_ceiling_init,
            },
        }
    }

    /// Fold one landmark frame with the default configuration
    pub fn update(prev: Option<&PoseFeatures>, frame: &PoseFrame, dt_secs: f32) -> PoseFeatures {
        Self::update_with(&PoseConfig::default(), prev, frame, dt_secs)
    }

    /// Fold one landmark frame.
    ///
    /// Without both shoulders the previous features are returned unchanged
    /// (or the zeroed initial set when there is no previous state).
    pub fn update_with(
        config: &PoseConfig,
        prev: Option<&PoseFeatures>,
        frame: &PoseFrame,
        dt_secs: f32,
    ) -> PoseFeatures {
        let base = prev.cloned().unwrap_or_else(|| Self::initial(config));

        let vis = config.min_visibility;
        let at = |joint: Joint| frame.position(joint, vis);

        let (Some(left_shoulder), Some(right_shoulder)) =
            (at(Joint::LeftShoulder), at(Joint::RightShoulder))
        else {
            return base;
        };

        let dt = config.floor_dt(dt_secs);
        let carry = base.carry;

        // Body speed: centroid velocity over a slowly adapting ceiling
        let centroid = left_shoulder.midpoint(right_shoulder);
        let speed = finite_or_zero(carry.centroid.map_or(0.0, |c| centroid.distance(c) / dt));
        let speed_hi = ema(
            carry.speed_hi,
            speed * config.speed_ceiling_headroom,
            config.speed_ceiling_alpha,
        );
        let normalized = (speed / speed_hi.max(EPSILON)).min(1.0);
        let body_speed = unit(ema(base.body_speed, normalized, config.body_speed_alpha));

        // Expansion, scaled by shoulder width
        let left_wrist = at(Joint::LeftWrist);
        let right_wrist = at(Joint::RightWrist);
        let hand_span = span(left_wrist, right_wrist);
        let ankle_span = span(at(Joint::LeftAnkle), at(Joint::RightAnkle));
        let shoulder_width = left_shoulder.distance(right_shoulder);
        let ratio = (hand_span + config.ankle_span_weight * ankle_span) / (2.0 * shoulder_width + EPSILON);
        let expand = unit(ema(base.expand, unit(ratio), config.expand_alpha));

        // Accent: raw wrist acceleration, attack fast, decay slow
        let hand_speed = finite_or_zero(
            wrist_speed(carry.left_wrist, left_wrist, dt).max(wrist_speed(carry.right_wrist, right_wrist, dt)),
        );
        let accel = (hand_speed - carry.hand_speed).max(0.0);
        let raw_accent = (accel * config.accent_gain).min(1.0);
        let accent = unit((base.accent * config.accent_decay).max(raw_accent));

        // Joint angles keep their previous value when a limb is incomplete
        let limb = |a: Joint, b: Joint, c: Joint, prev: f32| match (at(a), at(b), at(c)) {
            (Some(a), Some(b), Some(c)) => {
                let angle = three_point_angle(a, b, c);
                if angle.is_finite() {
                    angle.clamp(0.0, PI)
                } else {
                    prev
                }
            }
            _ => prev,
        };
        let angles = JointAngles {
            left_elbow: limb(Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist, base.angles.left_elbow),
            right_elbow: limb(Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist, base.angles.right_elbow),
            left_knee: limb(Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle, base.angles.left_knee),
            right_knee: limb(Joint::RightHip, Joint::RightKnee, Joint::RightAnkle, base.angles.right_knee),
        };

        PoseFeatures {
            body_speed,
            expand,
            accent,
            sharpness: angles.sharpness(),
            angles,
            carry: PoseCarry {
                centroid: Some(centroid).filter(|c| c.is_finite()),
                left_wrist,
                right_wrist,
                hand_speed,
                speed_hi: if speed_hi.is_finite() { speed_hi } else { carry.speed_hi },
            },
        }
    }

    /// Normalized centroid speed in `[0, 1]`
    pub fn body_speed(&self) -> f32 {
        self.body_speed
    }

    /// Openness of the pose in `[0, 1]`
    pub fn expand(&self) -> f32 {
        self.expand
    }

    /// Percussive hand accent in `[0, 1]`
    pub fn accent(&self) -> f32 {
        self.accent
    }

    pub fn angles(&self) -> JointAngles {
        self.angles
    }

    /// Aggregate joint extension in `[0, 1]`
    pub fn sharpness(&self) -> f32 {
        self.sharpness
    }
}

/// Stateful per-performer wrapper around `PoseFeatures::update_with`
#[derive(Debug, Clone)]
pub struct PoseTracker {
    config: PoseConfig,
    features: Option<PoseFeatures>,
    joints: [f32; JOINT_BUFFER_LEN],
    accepted: u64,
    rejected: u64,
}

impl PoseTracker {
    pub fn new(config: PoseConfig) -> Self {
        Self {
            config,
            features: None,
            joints: [0.0; JOINT_BUFFER_LEN],
            accepted: 0,
            rejected: 0,
        }
    }

    /// Fold a frame. Returns false when the frame lacked the shoulders
    /// and the previous features were retained.
    pub fn push(&mut self, frame: &PoseFrame, dt_secs: f32) -> bool {
        let vis = self.config.min_visibility;
        let usable = frame.position(Joint::LeftShoulder, vis).is_some()
            && frame.position(Joint::RightShoulder, vis).is_some();

        let next = PoseFeatures::update_with(&self.config, self.features.as_ref(), frame, dt_secs);
        self.features = Some(next);
        frame.write_joints(&mut self.joints, vis);

        if usable {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
        usable
    }

    /// Current features, or the zeroed initial set before any frame
    pub fn features(&self) -> PoseFeatures {
        self.features
            .clone()
            .unwrap_or_else(|| PoseFeatures::initial(&self.config))
    }

    pub fn features_ref(&self) -> Option<&PoseFeatures> {
        self.features.as_ref()
    }

    /// Flattened joint positions in `[0, 1]²`
    pub fn joints(&self) -> &[f32; JOINT_BUFFER_LEN] {
        &self.joints
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn reset(&mut self) {
        self.features = None;
        self.joints = [0.0; JOINT_BUFFER_LEN];
    }
}

#[inline]
fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn span(a: Option<Vec2>, b: Option<Vec2>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => finite_or_zero(a.distance(b)),
        _ => 0.0,
    }
}

fn wrist_speed(prev: Option<Vec2>, current: Option<Vec2>, dt: f32) -> f32 {
    match (prev, current) {
        (Some(p), Some(c)) => c.distance(p) / dt,
        _ => 0.0,
    }
}
