//! Kinesis Stage - From drive signals to shader parameters
//!
//! This crate implements the rendering side of the contract:
//! - Channels: the named uniform set every effect may declare
//! - Bundle: the per-frame snapshot merged from pointer, pose and timing
//! - Parameters: a material's declared parameter storage
//! - Effects: the closed set of visual effects and their programs
//! - Adapter: type-aware copy of bundle channels into the active material

pub mod adapter;
pub mod bundle;
pub mod channel;
pub mod effect;
pub mod params;

pub use adapter::*;
pub use bundle::*;
pub use channel::*;
pub use effect::*;
pub use params::*;
