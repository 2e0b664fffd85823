//! Top-level qgate configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{QualityGateConfig, RealtimeConfig};
use crate::constants::PROJECT_CONFIG_FILE;
use crate::errors::ConfigError;
use crate::types::Ruleset;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`QGATE_*`)
/// 3. Project config (`qgate.toml` in project root)
/// 4. User config (`~/.qgate/config.toml`)
/// 5. Compiled defaults
///
/// Threshold flags from layers 1 and 2 synthesize one implicit ruleset that
/// is evaluated ahead of the configured rulesets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QgateConfig {
    /// Path to a JSON known-issues file.
    pub known_issues: Option<String>,
    /// Environment reported in validation results.
    pub environment: Option<String>,
    pub quality_gate: QualityGateConfig,
    pub realtime: RealtimeConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub max_failures: Option<u64>,
    pub min_tests_count: Option<u64>,
    pub success_rate: Option<f64>,
    pub fast_fail: Option<bool>,
    pub known_issues: Option<String>,
    pub environment: Option<String>,
    pub batch_timeout_ms: Option<u64>,
}

/// Threshold flags gathered from env and CLI before they become a ruleset.
#[derive(Debug, Clone, Default, PartialEq)]
struct ImplicitThresholds {
    max_failures: Option<u64>,
    min_tests_count: Option<u64>,
    success_rate: Option<f64>,
    fast_fail: Option<bool>,
}

impl ImplicitThresholds {
    fn overlay(&mut self, cli: &CliOverrides) {
        if cli.max_failures.is_some() {
            self.max_failures = cli.max_failures;
        }
        if cli.min_tests_count.is_some() {
            self.min_tests_count = cli.min_tests_count;
        }
        if cli.success_rate.is_some() {
            self.success_rate = cli.success_rate;
        }
        if cli.fast_fail.is_some() {
            self.fast_fail = cli.fast_fail;
        }
    }

    fn has_rules(&self) -> bool {
        self.max_failures.is_some() || self.min_tests_count.is_some() || self.success_rate.is_some()
    }

    fn into_ruleset(self) -> Option<Ruleset> {
        if !self.has_rules() {
            return None;
        }
        let mut ruleset = Ruleset::new().fast_fail(self.fast_fail.unwrap_or(false));
        if let Some(n) = self.max_failures {
            ruleset = ruleset.max_failures(n);
        }
        if let Some(n) = self.min_tests_count {
            ruleset = ruleset.min_tests_count(n);
        }
        if let Some(rate) = self.success_rate {
            ruleset = ruleset.success_rate(rate);
        }
        Some(ruleset)
    }
}

impl QgateConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                Self::merge_toml_file(&mut config, &user_config_path)?;
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::finish(config, cli_overrides)
    }

    /// Load from an explicit config file instead of the project/user lookup.
    pub fn load_file(path: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        Self::merge_toml_file(&mut config, path)?;
        Self::finish(config, cli_overrides)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Toml {
            origin: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn finish(mut config: Self, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        // Layer 2: environment variables
        let mut thresholds = Self::apply_env_overrides(&mut config)?;

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::validate_cli(cli)?;
            Self::apply_cli_overrides(&mut config, cli);
            thresholds.overlay(cli);
        }

        if let Some(implicit) = thresholds.into_ruleset() {
            config.quality_gate.rules.insert(0, implicit);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &QgateConfig) -> Result<(), ConfigError> {
        if config.realtime.batch_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidField {
                field: "realtime.batch_timeout_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(env) = &config.environment {
            if env.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    field: "environment",
                    message: "must not be blank".to_string(),
                });
            }
        }
        for (index, ruleset) in config.quality_gate.rules.iter().enumerate() {
            if ruleset.id.as_deref().is_some_and(|id| id.is_empty()) {
                return Err(ConfigError::InvalidRuleset {
                    index,
                    message: "id must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_cli(cli: &CliOverrides) -> Result<(), ConfigError> {
        if let Some(rate) = cli.success_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidFlag {
                    flag: "success-rate",
                    message: format!("{rate} is not between 0 and 1"),
                });
            }
        }
        Ok(())
    }

    /// Returns the user config path: `~/.qgate/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    fn merge_toml_file(config: &mut QgateConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let file_config: QgateConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Toml {
                origin: path.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), rulesets = file_config.quality_gate.rules.len(), "merged config file");
        Self::merge(config, file_config);
        Ok(())
    }

    /// Merge `other` into `base`. Set values in `other` win; a non-empty rule
    /// list replaces the earlier one wholesale.
    fn merge(base: &mut QgateConfig, other: QgateConfig) {
        if other.known_issues.is_some() {
            base.known_issues = other.known_issues;
        }
        if other.environment.is_some() {
            base.environment = other.environment;
        }
        if other.quality_gate.is_configured() {
            base.quality_gate = other.quality_gate;
        }
        if other.realtime.enabled.is_some() {
            base.realtime.enabled = other.realtime.enabled;
        }
        if other.realtime.batch_timeout_ms.is_some() {
            base.realtime.batch_timeout_ms = other.realtime.batch_timeout_ms;
        }
    }

    /// Apply environment variable overrides and collect env thresholds.
    /// Pattern: `QGATE_MAX_FAILURES`, `QGATE_BATCH_TIMEOUT_MS`, etc.
    fn apply_env_overrides(config: &mut QgateConfig) -> Result<ImplicitThresholds, ConfigError> {
        let mut thresholds = ImplicitThresholds::default();

        if let Some(v) = env_parse::<u64>("QGATE_MAX_FAILURES")? {
            thresholds.max_failures = Some(v);
        }
        if let Some(v) = env_parse::<u64>("QGATE_MIN_TESTS_COUNT")? {
            thresholds.min_tests_count = Some(v);
        }
        if let Some(v) = env_parse::<f64>("QGATE_SUCCESS_RATE")? {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::InvalidEnv {
                    key: "QGATE_SUCCESS_RATE",
                    value: v.to_string(),
                    message: "is not between 0 and 1".to_string(),
                });
            }
            thresholds.success_rate = Some(v);
        }
        if let Some(v) = env_parse::<bool>("QGATE_FAST_FAIL")? {
            thresholds.fast_fail = Some(v);
        }
        if let Ok(val) = std::env::var("QGATE_ENVIRONMENT") {
            config.environment = Some(val);
        }
        if let Ok(val) = std::env::var("QGATE_KNOWN_ISSUES") {
            config.known_issues = Some(val);
        }
        if let Some(v) = env_parse::<u64>("QGATE_BATCH_TIMEOUT_MS")? {
            config.realtime.batch_timeout_ms = Some(v);
        }

        Ok(thresholds)
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut QgateConfig, cli: &CliOverrides) {
        if let Some(ref v) = cli.known_issues {
            config.known_issues = Some(v.clone());
        }
        if let Some(ref v) = cli.environment {
            config.environment = Some(v.clone());
        }
        if let Some(v) = cli.batch_timeout_ms {
            config.realtime.batch_timeout_ms = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Toml {
            origin: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

/// Parse an env var. Unset is `None`; set but unparsable is an error.
fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => match val.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidEnv {
                key,
                value: val,
                message: "cannot be parsed".to_string(),
            }),
        },
        Err(_) => Ok(None),
    }
}

/// Returns the user-level qgate config directory: `$QGATE_HOME` or `~/.qgate/`.
fn dirs_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("QGATE_HOME") {
        return Some(PathBuf::from(dir));
    }
    home_dir().map(|h| h.join(".qgate"))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
