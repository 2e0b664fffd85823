//! Quality gate errors.
//!
//! These are configuration faults. A rule that legitimately fails is not an
//! error; it shows up as a `ValidationResult` instead.

use super::error_code::{self, QgateErrorCode};

/// Errors that abort a quality gate evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("Rule \"{rule}\" is not defined in the quality gate rule catalog")]
    UnknownRule { rule: String },

    #[error("Rule \"{rule}\" cannot use the configured value: {message}")]
    ExpectationMismatch { rule: String, message: String },

    #[error("Rule identity \"{identity}\" is bound by more than one ruleset; give the rulesets distinct ids")]
    SharedRuleState { identity: String },

    #[error("Quality gate is not configured")]
    NotConfigured,
}

impl QgateErrorCode for GateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownRule { .. } => error_code::UNKNOWN_RULE,
            Self::ExpectationMismatch { .. } => error_code::EXPECTATION_MISMATCH,
            Self::SharedRuleState { .. } => error_code::SHARED_RULE_STATE,
            Self::NotConfigured => error_code::GATE_NOT_CONFIGURED,
        }
    }
}
