//! Error handling for qgate.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod error_code;
pub mod gate_error;
pub mod run_error;
pub mod store_error;

pub use config_error::ConfigError;
pub use error_code::QgateErrorCode;
pub use gate_error::GateError;
pub use run_error::RunError;
pub use store_error::StoreError;
