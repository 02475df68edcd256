//! Kinesis Signal - Drive signals from body and pointer
//!
//! Raw input in, bounded smoothed signals out. This is NOT pose detection:
//! landmarks arrive already estimated, at their source's own cadence.
//!
//! # Stages
//!
//! - Landmarks: the 33-joint ordering and per-frame landmark sets
//! - Pointer: pixel events → normalized, low-passed position and velocity
//! - Pose: landmark sets → body speed, expansion, accent, joint angles, sharpness
//!
//! Every update is a pure function of the previous state and the new input.
//! Missing or degenerate input falls back to the previous state, never panics.

pub mod landmark;
pub mod pointer;
pub mod pose;

pub use landmark::*;
pub use pointer::*;
pub use pose::*;
