//! Kinesis Runtime - Stage session orchestration and frame loop
//!
//! This crate implements the per-frame session loop:
//! 1. Advance frame clock
//! 2. Record frame health
//! 3. Fold queued pointer samples
//! 4. Fold queued pose frames per performer
//! 5. Evict stale performers
//! 6. Merge the uniform bundle
//! 7. Copy the bundle into the active material
//! 8. Publish the bundle snapshot

pub mod config;
pub mod error;
pub mod session;
pub mod tap;
pub mod telemetry;

pub use config::*;
pub use error::*;
pub use session::*;
pub use tap::*;
pub use telemetry::*;
