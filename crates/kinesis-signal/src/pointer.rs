//! Pointer Tracker - pixel events to normalized, velocity-aware state
//!
//! The exponential low-pass applied here is the only positional smoothing
//! the pointer receives. Velocity is always derived from consecutive
//! smoothed positions, never from raw deltas, so sensor jitter is not
//! amplified into the velocity channel.

use kinesis_core::{ensure_positive, ensure_range, KinesisResult, Vec2};
use serde::{Deserialize, Serialize};

/// Default low-pass coefficient
pub const DEFAULT_POINTER_SMOOTHING: f32 = 0.25;

/// Floor applied to `dt` before differentiating, in seconds
pub const MIN_POINTER_DT: f32 = 1e-3;

/// Pointer tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Low-pass coefficient (1.0 = no smoothing)
    pub smoothing: f32,
    /// Floor applied to `dt` before computing velocity
    pub min_dt_secs: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_POINTER_SMOOTHING,
            min_dt_secs: MIN_POINTER_DT,
        }
    }
}

impl PointerConfig {
    pub fn validate(&self) -> KinesisResult<()> {
        ensure_range("pointer.smoothing", self.smoothing, 0.0, 1.0)?;
        ensure_positive("pointer.min_dt_secs", self.min_dt_secs)
    }
}

/// Viewport size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Map a pixel position into the unit square.
    /// A degenerate viewport maps everything to the centre.
    pub fn normalize(&self, pixel: Vec2) -> Vec2 {
        if !self.is_valid() {
            return Vec2::CENTER;
        }
        let p = Vec2::new(pixel.x / self.width, pixel.y / self.height);
        if p.is_finite() {
            p.clamp01()
        } else {
            Vec2::CENTER
        }
    }
}

/// A raw pointer event as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Position in pixels
    pub position: Vec2,
    pub viewport: Viewport,
    /// Time since the previous pointer sample
    pub dt_secs: f32,
}

impl PointerSample {
    pub fn new(x: f32, y: f32, viewport: Viewport, dt_secs: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            viewport,
            dt_secs,
        }
    }
}

/// Normalized pointer state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    /// Smoothed position in `[0, 1]²`
    pub position: Vec2,
    /// Normalized units per second
    pub velocity: Vec2,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            position: Vec2::CENTER,
            velocity: Vec2::ZERO,
        }
    }
}

impl PointerState {
    /// Fold one raw pixel position into the next state
    pub fn update(&self, raw_pixel: Vec2, viewport: Viewport, dt_secs: f32, smoothing: f32) -> PointerState {
        self.update_with_floor(raw_pixel, viewport, dt_secs, smoothing, MIN_POINTER_DT)
    }

    /// Fold a sample using a tracker configuration
    pub fn apply(&self, sample: &PointerSample, config: &PointerConfig) -> PointerState {
        self.update_with_floor(
            sample.position,
            sample.viewport,
            sample.dt_secs,
            config.smoothing,
            config.min_dt_secs,
        )
    }

    fn update_with_floor(
        &self,
        raw_pixel: Vec2,
        viewport: Viewport,
        dt_secs: f32,
        smoothing: f32,
        min_dt: f32,
    ) -> PointerState {
        let target = viewport.normalize(raw_pixel);
        let alpha = if smoothing.is_finite() {
            smoothing.clamp(0.0, 1.0)
        } else {
            DEFAULT_POINTER_SMOOTHING
        };

        // alpha == 1.0 must land exactly on the target
        let position = (self.position * (1.0 - alpha) + target * alpha).clamp01();
        let dt = dt_secs.max(min_dt.max(f32::EPSILON));
        let velocity = (position - self.position) * (1.0 / dt);

        PointerState { position, velocity }
    }
}
