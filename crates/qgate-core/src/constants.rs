//! Shared constants.

/// Default batch window for batched event subscriptions, in milliseconds.
pub const DEFAULT_BATCH_TIMEOUT_MS: u64 = 100;

/// Environment reported when neither the config nor the caller names one.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Reserved ruleset keys. They share the map with rule names but are never evaluated.
pub const CONTROL_KEY_ID: &str = "id";
pub const CONTROL_KEY_FILTER: &str = "filter";
pub const CONTROL_KEY_FAST_FAIL: &str = "fastFail";
pub const CONTROL_KEY_FAST_FAIL_ALIAS: &str = "fast_fail";

/// Suffix of test result files picked up from a results directory.
pub const RESULT_FILE_SUFFIX: &str = "-result.json";

/// Project config file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "qgate.toml";

/// Exit code for a clean pass.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when one or more rules failed or no results were found.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when no quality gate is configured at all.
pub const EXIT_NOT_CONFIGURED: i32 = -1;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
