//! Frame-health monitor
//!
//! Observes the wall-clock delta of every rendered frame, accumulates a
//! decaying count of dropped frames and derives a discrete quality scale.
//! The monitor only computes the signal; consumers decide how to spend it
//! (lower resolution, fewer particles, cheaper effects).

use std::time::Duration;

use kinesis_core::{ensure_positive, ensure_range, millis_f32, KinesisResult};
use serde::{Deserialize, Serialize};

/// Full-quality render scale
pub const QUALITY_FULL: f32 = 1.0;

/// Performance monitor configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    /// A frame slower than this counts as dropped (28 ms ≈ 35 fps)
    pub drop_threshold_ms: f32,
    /// Per-frame decay of the drop accumulator
    pub drop_decay: f32,
    /// Accumulator level at which quality degrades
    pub degrade_at: f32,
    /// Quality scale used while degraded
    pub degraded_scale: f32,
}

impl Default for PerfConfig {
    fn default() -> Self {
        PerfConfig {
            drop_threshold_ms: 28.0,
            drop_decay: 0.8,
            degrade_at: 3.0,
            degraded_scale: 0.7,
        }
    }
}

impl PerfConfig {
    /// Configuration for weak hardware: tolerates ~25 fps before counting drops
    pub fn lenient() -> Self {
        PerfConfig {
            drop_threshold_ms: 40.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> KinesisResult<()> {
        ensure_positive("perf.drop_threshold_ms", self.drop_threshold_ms)?;
        ensure_range("perf.drop_decay", self.drop_decay, 0.0, 1.0)?;
        ensure_positive("perf.degrade_at", self.degrade_at)?;
        ensure_range("perf.degraded_scale", self.degraded_scale, 0.0, 1.0)
    }
}

/// Rolling frame-health record
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePerf {
    /// Last observed frame delta (milliseconds)
    pub last_delta_ms: f32,
    /// Exponentially decaying dropped-frame count
    pub drop_count: f32,
    /// Discrete render quality scale
    pub quality_scale: f32,
}

impl Default for FramePerf {
    fn default() -> Self {
        FramePerf {
            last_delta_ms: 0.0,
            drop_count: 0.0,
            quality_scale: QUALITY_FULL,
        }
    }
}

impl FramePerf {
    /// Fold one frame delta with the default configuration
    pub fn update(prev: Option<&FramePerf>, dt_ms: f32) -> FramePerf {
        Self::update_with(&PerfConfig::default(), prev, dt_ms)
    }

    /// Fold one frame delta.
    /// Total: a non-finite delta never counts as a drop.
    pub fn update_with(config: &PerfConfig, prev: Option<&FramePerf>, dt_ms: f32) -> FramePerf {
        let prev_count = prev.map(|p| p.drop_count).unwrap_or(0.0);
        let dropped = if dt_ms > config.drop_threshold_ms { 1.0 } else { 0.0 };
        let drop_count = (prev_count * config.drop_decay + dropped).max(0.0);

        let quality_scale = if drop_count >= config.degrade_at {
            config.degraded_scale
        } else {
            QUALITY_FULL
        };

        FramePerf {
            last_delta_ms: dt_ms,
            drop_count,
            quality_scale,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.quality_scale < QUALITY_FULL
    }
}

/// Stateful wrapper that feeds `FramePerf` once per render tick
#[derive(Debug, Default)]
pub struct PerfMonitor {
    config: PerfConfig,
    current: FramePerf,
    frames: u64,
    degraded_frames: u64,
    transitions: u64,
}

impl PerfMonitor {
    pub fn new(config: PerfConfig) -> Self {
        PerfMonitor {
            config,
            ..Self::default()
        }
    }

    /// Record one frame delta
    pub fn record(&mut self, dt: Duration) -> FramePerf {
        self.record_ms(millis_f32(dt))
    }

    pub fn record_ms(&mut self, dt_ms: f32) -> FramePerf {
        let next = FramePerf::update_with(&self.config, Some(&self.current), dt_ms);

        if next.quality_scale != self.current.quality_scale {
            self.transitions += 1;
            tracing::info!(
                quality_scale = next.quality_scale,
                drop_count = next.drop_count,
                last_delta_ms = dt_ms,
                "render quality changed"
            );
        }

        self.frames += 1;
        if next.is_degraded() {
            self.degraded_frames += 1;
        }
        self.current = next;
        next
    }

    pub fn current(&self) -> &FramePerf {
        &self.current
    }

    pub fn quality_scale(&self) -> f32 {
        self.current.quality_scale
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn degraded_frames(&self) -> u64 {
        self.degraded_frames
    }

    /// Number of quality-scale changes observed
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn config(&self) -> &PerfConfig {
        &self.config
    }
}
