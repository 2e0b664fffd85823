//! QgateErrorCode trait for stable, machine-readable error codes.

/// Every error enum implements this to expose a structured error code
/// string alongside its human-readable message.
pub trait QgateErrorCode {
    /// Returns the error code string (e.g., "UNKNOWN_RULE").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const UNKNOWN_RULE: &str = "UNKNOWN_RULE";
pub const EXPECTATION_MISMATCH: &str = "EXPECTATION_MISMATCH";
pub const SHARED_RULE_STATE: &str = "SHARED_RULE_STATE";
pub const GATE_NOT_CONFIGURED: &str = "GATE_NOT_CONFIGURED";
pub const STORE_ERROR: &str = "STORE_ERROR";
pub const NO_RESULTS: &str = "NO_RESULTS";
pub const FAST_FAILED: &str = "FAST_FAILED";
