//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod ports;
pub mod progression;
pub mod step_source;
pub mod storage;
