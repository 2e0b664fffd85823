//! Errors raised while resolving the layered qgate configuration.

use std::path::PathBuf;

use super::error_code::{self, QgateErrorCode};

/// A config layer that could not be read or holds an unusable value. Each
/// variant names the layer it came from so the message points at the fix.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {origin}: {message}")]
    Toml { origin: String, message: String },

    /// A scalar setting such as `realtime.batch_timeout_ms`.
    #[error("config field {field} {message}")]
    InvalidField { field: &'static str, message: String },

    /// Entry `index` of `[[quality_gate.rules]]`.
    #[error("quality_gate.rules[{index}]: {message}")]
    InvalidRuleset { index: usize, message: String },

    #[error("environment variable {key}={value:?} {message}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("flag --{flag} {message}")]
    InvalidFlag { flag: &'static str, message: String },
}

impl QgateErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
