//! Frame clock for the render loop

use std::time::{Duration, Instant};

use kinesis_core::{ensure_positive, FrameTime, KinesisResult};
use serde::{Deserialize, Serialize};

/// Frame clock configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Largest delta fed to animation time, in milliseconds
    pub max_delta_ms: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig { max_delta_ms: 100.0 }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> KinesisResult<()> {
        ensure_positive("clock.max_delta_ms", self.max_delta_ms)
    }

    fn max_delta(&self) -> Duration {
        Duration::from_micros((self.max_delta_ms.max(0.0) * 1000.0) as u64)
    }
}

/// Frame clock - drives the `time` and `delta` channels
/// INVARIANT: time is monotonically increasing and never jumps more than `max_delta`
pub struct FrameClock {
    /// Accumulated animation time
    value: FrameTime,
    /// Last clamped delta
    delta: Duration,
    /// Last raw (unclamped) delta
    raw_delta: Duration,
    /// Last wall-clock instant, set by `tick`
    last_update: Option<Instant>,
    /// Frames advanced
    frames: u64,
    config: ClockConfig,
}

impl FrameClock {
    /// Create a new clock starting at zero
    pub fn new() -> Self {
        Self::with_config(ClockConfig::default())
    }

    pub fn with_config(config: ClockConfig) -> Self {
        FrameClock {
            value: FrameTime::ZERO,
            delta: Duration::ZERO,
            raw_delta: Duration::ZERO,
            last_update: None,
            frames: 0,
            config,
        }
    }

    /// Advance by elapsed wall-clock time since the previous `tick`.
    /// The first call advances by zero.
    /// Returns the raw delta so callers can feed frame-health monitoring.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = self
            .last_update
            .map(|last| now.duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_update = Some(now);
        self.advance(elapsed);
        elapsed
    }

    /// Advance by an explicit delta
    pub fn advance(&mut self, dt: Duration) -> FrameTime {
        // Clamp to prevent large jumps (e.g., after a backgrounded tab resumes)
        let clamped = dt.min(self.config.max_delta());

        self.raw_delta = dt;
        self.delta = clamped;
        self.value = self.value.saturating_add(clamped);
        self.frames += 1;
        self.value
    }

    /// Current animation time
    pub fn now(&self) -> FrameTime {
        self.value
    }

    /// Last clamped delta
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Last delta before clamping
    pub fn raw_delta(&self) -> Duration {
        self.raw_delta
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn time_secs(&self) -> f32 {
        self.value.as_secs_f64() as f32
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
