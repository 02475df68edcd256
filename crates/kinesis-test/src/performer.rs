//! Synthetic performer - a seeded skeleton that sways, strikes and drops out

use std::f32::consts::TAU;

use kinesis_core::PerformerId;
use kinesis_signal::{Joint, Landmark, PoseFrame, JOINT_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standing rest pose in normalized image coordinates
const REST_POSE: [(f32, f32); JOINT_COUNT] = [
    (0.50, 0.20),
    (0.49, 0.19),
    (0.48, 0.19),
    (0.47, 0.19),
    (0.51, 0.19),
    (0.52, 0.19),
    (0.53, 0.19),
    (0.46, 0.20),
    (0.54, 0.20),
    (0.49, 0.22),
    (0.51, 0.22),
    (0.42, 0.30),
    (0.58, 0.30),
    (0.38, 0.42),
    (0.62, 0.42),
    (0.36, 0.54),
    (0.64, 0.54),
    (0.355, 0.56),
    (0.645, 0.56),
    (0.36, 0.565),
    (0.64, 0.565),
    (0.365, 0.55),
    (0.635, 0.55),
    (0.45, 0.58),
    (0.55, 0.58),
    (0.44, 0.72),
    (0.56, 0.72),
    (0.44, 0.86),
    (0.56, 0.86),
    (0.435, 0.88),
    (0.565, 0.88),
    (0.43, 0.89),
    (0.57, 0.89),
];

/// Movement and detector behaviour of a synthetic performer
#[derive(Clone, Debug)]
pub struct PerformerModel {
    /// Horizontal sway amplitude (normalized units)
    pub sway_amplitude: f32,
    /// Sway frequency (Hz)
    pub sway_hz: f32,
    /// Chance per frame of starting an arm strike
    pub strike_probability: f64,
    /// How far a strike throws the hand outward
    pub strike_reach: f32,
    /// Uniform landmark noise
    pub jitter: f32,
    /// Chance per frame that the detector reports nothing
    pub dropout_probability: f64,
    /// Chance per landmark of being missing from a reported frame
    pub occlusion_probability: f64,
}

impl Default for PerformerModel {
    fn default() -> Self {
        Self::dancer()
    }
}

impl PerformerModel {
    /// Standing still with clean detection
    pub fn still() -> Self {
        PerformerModel {
            sway_amplitude: 0.0,
            sway_hz: 0.0,
            strike_probability: 0.0,
            strike_reach: 0.0,
            jitter: 0.0,
            dropout_probability: 0.0,
            occlusion_probability: 0.0,
        }
    }

    /// Rhythmic sway with frequent strikes
    pub fn dancer() -> Self {
        PerformerModel {
            sway_amplitude: 0.06,
            sway_hz: 0.5,
            strike_probability: 0.05,
            strike_reach: 0.25,
            jitter: 0.003,
            dropout_probability: 0.01,
            occlusion_probability: 0.02,
        }
    }

    /// Poor lighting: noisy landmarks and unreliable detection
    pub fn noisy() -> Self {
        PerformerModel {
            jitter: 0.02,
            dropout_probability: 0.15,
            occlusion_probability: 0.25,
            ..Self::dancer()
        }
    }
}

/// Seeded landmark source
#[derive(Debug)]
pub struct SyntheticPerformer {
    id: PerformerId,
    model: PerformerModel,
    rng: StdRng,
    elapsed_secs: f32,
    left_strike: f32,
    right_strike: f32,
    frames: u64,
    dropouts: u64,
}

impl SyntheticPerformer {
    pub fn new(id: PerformerId, model: PerformerModel, seed: u64) -> Self {
        SyntheticPerformer {
            id,
            model,
            rng: StdRng::seed_from_u64(seed),
            elapsed_secs: 0.0,
            left_strike: 0.0,
            right_strike: 0.0,
            frames: 0,
            dropouts: 0,
        }
    }

    pub fn id(&self) -> PerformerId {
        self.id
    }

    pub fn model(&self) -> &PerformerModel {
        &self.model
    }

    /// Advance by `dt_secs` and emit the detector's frame, or `None` on dropout
    pub fn next_frame(&mut self, dt_secs: f32) -> Option<PoseFrame> {
        self.elapsed_secs += dt_secs.max(0.0);
        self.frames += 1;
        self.advance_strikes(dt_secs);

        if self.model.dropout_probability > 0.0 && self.rng.gen_bool(self.model.dropout_probability.min(1.0)) {
            self.dropouts += 1;
            return None;
        }

        let sway = self.model.sway_amplitude * (TAU * self.model.sway_hz * self.elapsed_secs).sin();
        let mut frame = PoseFrame::empty();

        for joint in Joint::all() {
            if self.model.occlusion_probability > 0.0
                && self.rng.gen_bool(self.model.occlusion_probability.min(1.0))
            {
                continue;
            }

            let (rx, ry) = REST_POSE[joint.index()];
            let (dx, dy) = self.arm_offset(*joint);
            let x = rx + sway + dx + self.noise();
            let y = ry + dy + self.noise();
            let visibility = self.rng.gen_range(0.6f32..=1.0);

            frame.set(*joint, Some(Landmark::new(x, y).with_visibility(visibility)));
        }

        Some(frame)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn dropouts(&self) -> u64 {
        self.dropouts
    }

    fn advance_strikes(&mut self, dt_secs: f32) {
        // Envelope halves roughly every 100 ms
        let decay = 0.5f32.powf(dt_secs.max(0.0) / 0.1);
        self.left_strike *= decay;
        self.right_strike *= decay;

        if self.model.strike_probability > 0.0 && self.rng.gen_bool(self.model.strike_probability.min(1.0)) {
            if self.rng.gen_bool(0.5) {
                self.left_strike = 1.0;
            } else {
                self.right_strike = 1.0;
            }
        }
    }

    /// Outward and upward throw of the striking arm
    fn arm_offset(&self, joint: Joint) -> (f32, f32) {
        let reach = self.model.strike_reach;
        match joint {
            Joint::LeftElbow => (-0.5 * reach * self.left_strike, -0.3 * reach * self.left_strike),
            Joint::RightElbow => (0.5 * reach * self.right_strike, -0.3 * reach * self.right_strike),
            Joint::LeftWrist | Joint::LeftPinky | Joint::LeftIndex | Joint::LeftThumb => {
                (-reach * self.left_strike, -0.6 * reach * self.left_strike)
            }
            Joint::RightWrist | Joint::RightPinky | Joint::RightIndex | Joint::RightThumb => {
                (reach * self.right_strike, -0.6 * reach * self.right_strike)
            }
            _ => (0.0, 0.0),
        }
    }

    fn noise(&mut self) -> f32 {
        if self.model.jitter > 0.0 {
            self.rng.gen_range(-self.model.jitter..=self.model.jitter)
        } else {
            0.0
        }
    }
}
