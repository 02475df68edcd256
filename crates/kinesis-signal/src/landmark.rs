//! Landmarks - body joint positions as produced by an external pose estimator
//!
//! The core only reads landmarks. Any slot may be absent on a given frame.

use kinesis_core::Vec2;
use serde::{Deserialize, Serialize};

/// Joint identifier in the standard 33-point body ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Joint {
    // Face
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,

    // Arms
    LeftShoulder = 11,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,

    // Hands
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,

    // Legs
    LeftHip = 23,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,

    // Feet
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

/// Number of joints per frame
pub const JOINT_COUNT: usize = 33;

/// Length of the flattened joints buffer (x0, y0, ..., x32, y32)
pub const JOINT_BUFFER_LEN: usize = JOINT_COUNT * 2;

impl Joint {
    /// All joints in order
    pub fn all() -> &'static [Joint; JOINT_COUNT] {
        use Joint::*;
        &[
            Nose,
            LeftEyeInner,
            LeftEye,
            LeftEyeOuter,
            RightEyeInner,
            RightEye,
            RightEyeOuter,
            LeftEar,
            RightEar,
            MouthLeft,
            MouthRight,
            LeftShoulder,
            RightShoulder,
            LeftElbow,
            RightElbow,
            LeftWrist,
            RightWrist,
            LeftPinky,
            RightPinky,
            LeftIndex,
            RightIndex,
            LeftThumb,
            RightThumb,
            LeftHip,
            RightHip,
            LeftKnee,
            RightKnee,
            LeftAnkle,
            RightAnkle,
            LeftHeel,
            RightHeel,
            LeftFootIndex,
            RightFootIndex,
        ]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Joint> {
        Joint::all().get(index).copied()
    }
}

/// A single landmark (normalized image coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Usable for feature extraction: finite coordinates and visible enough.
    /// A landmark without a visibility score is always visible.
    pub fn is_usable(&self, min_visibility: f32) -> bool {
        self.position().is_finite()
            && self
                .visibility
                .map_or(true, |v| v.is_finite() && v >= min_visibility)
    }
}

/// One frame of landmarks in joint order
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    landmarks: [Option<Landmark>; JOINT_COUNT],
}

impl Default for PoseFrame {
    fn default() -> Self {
        Self::empty()
    }
}

impl PoseFrame {
    /// A frame with every joint absent
    pub fn empty() -> Self {
        Self {
            landmarks: [None; JOINT_COUNT],
        }
    }

    /// Build from an ordered sequence; entries beyond the 33rd are ignored
    pub fn from_landmarks<I>(landmarks: I) -> Self
    where
        I: IntoIterator<Item = Option<Landmark>>,
    {
        let mut frame = Self::empty();
        for (slot, landmark) in frame.landmarks.iter_mut().zip(landmarks) {
            *slot = landmark;
        }
        frame
    }

    pub fn with(mut self, joint: Joint, landmark: Landmark) -> Self {
        self.set(joint, Some(landmark));
        self
    }

    pub fn set(&mut self, joint: Joint, landmark: Option<Landmark>) {
        self.landmarks[joint.index()] = landmark;
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks[joint.index()].as_ref()
    }

    /// Position of a joint if present and usable
    pub fn position(&self, joint: Joint, min_visibility: f32) -> Option<Vec2> {
        self.get(joint)
            .filter(|l| l.is_usable(min_visibility))
            .map(Landmark::position)
    }

    /// Number of present landmarks
    pub fn present(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, Option<&Landmark>)> {
        Joint::all()
            .iter()
            .zip(self.landmarks.iter())
            .map(|(j, l)| (*j, l.as_ref()))
    }

    /// Write usable joints into a flat `x0, y0, ..., x32, y32` buffer,
    /// clamped to the unit square. Absent joints keep their previous values.
    pub fn write_joints(&self, buffer: &mut [f32; JOINT_BUFFER_LEN], min_visibility: f32) {
        for (joint, _) in self.iter() {
            if let Some(p) = self.position(joint, min_visibility) {
                let p = p.clamp01();
                let i = joint.index() * 2;
                buffer[i] = p.x;
                buffer[i + 1] = p.y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_indices() {
        assert_eq!(Joint::all().len(), JOINT_COUNT);
        for (i, joint) in Joint::all().iter().enumerate() {
            assert_eq!(joint.index(), i);
        }
        assert_eq!(Joint::LeftShoulder.index(), 11);
        assert_eq!(Joint::RightAnkle.index(), 28);
        assert_eq!(Joint::from_index(32), Some(Joint::RightFootIndex));
        assert_eq!(Joint::from_index(33), None);
    }

    #[test]
    fn test_usable_filters() {
        assert!(Landmark::new(0.2, 0.3).is_usable(0.5));
        assert!(!Landmark::new(f32::NAN, 0.3).is_usable(0.0));
        assert!(!Landmark::new(0.2, 0.3).with_visibility(0.1).is_usable(0.5));
        assert!(Landmark::new(0.2, 0.3).with_visibility(0.0).is_usable(0.0));
    }

    #[test]
    fn test_from_landmarks_truncates() {
        let frame = PoseFrame::from_landmarks((0..40).map(|i| Some(Landmark::new(i as f32, 0.0))));
        assert_eq!(frame.present(), JOINT_COUNT);
        assert_eq!(frame.get(Joint::RightFootIndex).map(|l| l.x), Some(32.0));
    }

    #[test]
    fn test_write_joints_keeps_absent_and_clamps() {
        let mut buffer = [0.25; JOINT_BUFFER_LEN];
        let frame = PoseFrame::empty()
            .with(Joint::Nose, Landmark::new(1.5, -0.2))
            .with(Joint::LeftWrist, Landmark::new(0.4, 0.6));

        frame.write_joints(&mut buffer, 0.0);

        assert_eq!(&buffer[0..2], &[1.0, 0.0]);
        assert_eq!(&buffer[30..32], &[0.4, 0.6]);
        // Untouched joint keeps its previous value
        assert_eq!(&buffer[2..4], &[0.25, 0.25]);
    }
}
