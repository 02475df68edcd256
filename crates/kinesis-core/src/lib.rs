//! Kinesis Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by the performance pipeline:
//! - Identifiers (PerformerId, SessionId)
//! - Time primitives (FrameTime)
//! - Planar math (Vec2)
//! - Error types

pub mod error;
pub mod id;
pub mod math;
pub mod time;

pub use error::*;
pub use id::*;
pub use math::*;
pub use time::*;
