//! Time primitives for the render loop
//!
//! Frame time is monotonic and local to one session; it only ever advances.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Frame time - microseconds since session start
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameTime(pub u64);

impl FrameTime {
    pub const ZERO: FrameTime = FrameTime(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        FrameTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        FrameTime(millis * 1000)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        FrameTime((secs.max(0.0) * 1_000_000.0) as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        FrameTime(self.0.saturating_add(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)))
    }
}

impl Add<Duration> for FrameTime {
    type Output = FrameTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<FrameTime> for FrameTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: FrameTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Debug for FrameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

/// Convert a duration to fractional seconds as the pipeline consumes them.
#[inline]
pub fn secs_f32(d: Duration) -> f32 {
    d.as_secs_f32()
}

/// Convert a duration to fractional milliseconds.
#[inline]
pub fn millis_f32(d: Duration) -> f32 {
    d.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_arithmetic() {
        let t = FrameTime::from_millis(10) + Duration::from_millis(5);
        assert_eq!(t.as_millis(), 15);
        assert_eq!(t - FrameTime::from_millis(5), Duration::from_millis(10));
        // Never negative
        assert_eq!(FrameTime::ZERO - t, Duration::ZERO);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let t = FrameTime::from_millis(10);
        assert_eq!(t.saturating_add(Duration::MAX), FrameTime(u64::MAX));
        assert_eq!(t + Duration::from_secs(u64::MAX), FrameTime(u64::MAX));
    }

    #[test]
    fn test_millis_f32() {
        assert!((millis_f32(Duration::from_micros(16_667)) - 16.667).abs() < 1e-3);
    }
}
