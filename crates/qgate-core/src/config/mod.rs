//! Configuration system for qgate.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod gate_config;
pub mod qgate_config;
pub mod realtime_config;

pub use gate_config::QualityGateConfig;
pub use qgate_config::{CliOverrides, QgateConfig};
pub use realtime_config::RealtimeConfig;
