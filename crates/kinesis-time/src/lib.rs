//! Kinesis Time - Frame clock and frame-health monitoring
//!
//! This crate implements the timing side of the render loop:
//! - Frame clock: monotonic `time` and clamped `delta` for shader animation
//! - Performance monitor: dropped-frame accumulator and discrete quality scale

pub mod clock;
pub mod perf;

pub use clock::*;
pub use perf::*;
