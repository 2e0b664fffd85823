//! Run-level errors aggregating subsystem errors.

use super::error_code::{self, QgateErrorCode};
use super::{ConfigError, GateError, StoreError};
use crate::types::ValidationResult;

/// Errors that end a quality gate run before a final verdict.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No results directories found")]
    NoResults,

    /// Carries the failures of the batch that tripped the gate.
    #[error("Run aborted by a fast-fail quality gate ({} failed rule(s))", .results.len())]
    FastFailed { results: Vec<ValidationResult> },
}

impl QgateErrorCode for RunError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Gate(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::NoResults => error_code::NO_RESULTS,
            Self::FastFailed { .. } => error_code::FAST_FAILED,
        }
    }
}
