//! Kinesis Test Harness - Simulated performances for pipeline validation
//!
//! This crate provides:
//! - Synthetic performers emitting landmark frames with sway, strikes and dropouts
//! - Frame timing models with jitter and stalls
//! - A scenario runner that drives a stage session and checks channel bounds

pub mod frame_timing;
pub mod performer;
pub mod scenario;

pub use frame_timing::*;
pub use performer::*;
pub use scenario::*;
