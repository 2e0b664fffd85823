//! Core types, errors, configuration, event bus, and tracing for qgate.
//!
//! Everything here is shared by the evaluation engine and the command layer.
//! Nothing in this crate evaluates rules.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod traits;
pub mod types;
