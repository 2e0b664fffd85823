//! Tests for the qgate configuration system.

use std::sync::Mutex;
use std::time::Duration;

use qgate_core::config::{CliOverrides, QgateConfig};
use qgate_core::errors::ConfigError;
use qgate_core::types::{RuleExpectation, TestResult, TestStatus};

/// Global mutex to serialize tests that modify environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

/// Clear all QGATE_ env vars and point the user config at an empty directory.
fn isolate_env(user_home: &std::path::Path) {
    for key in [
        "QGATE_MAX_FAILURES",
        "QGATE_MIN_TESTS_COUNT",
        "QGATE_SUCCESS_RATE",
        "QGATE_FAST_FAIL",
        "QGATE_ENVIRONMENT",
        "QGATE_KNOWN_ISSUES",
        "QGATE_BATCH_TIMEOUT_MS",
    ] {
        std::env::remove_var(key);
    }
    std::env::set_var("QGATE_HOME", user_home);
}

const PROJECT_TOML: &str = r#"
environment = "linux"

[[quality_gate.rules]]
id = "smoke"
fastFail = true
maxFailures = 0
minTestsCount = 5

[quality_gate.rules.filter]
environments = ["linux"]

[[quality_gate.rules]]
successRate = 0.95
maxDuration = 60000

[realtime]
batch_timeout_ms = 250
"#;

#[test]
fn test_project_config_is_parsed_in_order() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    std::fs::write(dir.path().join("qgate.toml"), PROJECT_TOML).unwrap();

    let config = QgateConfig::load(dir.path(), None).unwrap();
    let rules = &config.quality_gate.rules;
    assert_eq!(rules.len(), 2);

    assert_eq!(rules[0].id.as_deref(), Some("smoke"));
    assert!(rules[0].fast_fail);
    let names: Vec<&str> = rules[0].entries.iter().map(|e| e.rule.as_str()).collect();
    assert_eq!(names, ["maxFailures", "minTestsCount"]);
    let filter = rules[0].filter.as_ref().unwrap();
    assert!(filter.matches(&TestResult::new("1", "t", TestStatus::Passed).with_environment("linux")));
    assert!(!filter.matches(&TestResult::new("2", "t", TestStatus::Passed).with_environment("mac")));

    assert_eq!(rules[1].entries[0].expected, RuleExpectation::SuccessRate(0.95));
    assert_eq!(rules[1].entries[1].expected, RuleExpectation::MaxDuration(60_000));
    assert_eq!(config.environment.as_deref(), Some("linux"));
    assert_eq!(config.realtime.effective_batch_timeout(), Duration::from_millis(250));
}

#[test]
fn test_cli_thresholds_form_an_implicit_leading_ruleset() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    std::fs::write(dir.path().join("qgate.toml"), PROJECT_TOML).unwrap();

    let cli = CliOverrides {
        max_failures: Some(3),
        success_rate: Some(0.5),
        fast_fail: Some(true),
        ..Default::default()
    };
    let config = QgateConfig::load(dir.path(), Some(&cli)).unwrap();
    let rules = &config.quality_gate.rules;

    assert_eq!(rules.len(), 3);
    let implicit = &rules[0];
    assert!(implicit.id.is_none());
    assert!(implicit.fast_fail);
    assert_eq!(implicit.entries[0].expected, RuleExpectation::MaxFailures(3));
    assert_eq!(implicit.entries[1].expected, RuleExpectation::SuccessRate(0.5));
    assert_eq!(rules[1].id.as_deref(), Some("smoke"));
}

#[test]
fn test_cli_overrides_env_and_env_overrides_project() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    std::fs::write(dir.path().join("qgate.toml"), PROJECT_TOML).unwrap();
    std::env::set_var("QGATE_ENVIRONMENT", "windows");
    std::env::set_var("QGATE_MAX_FAILURES", "10");
    std::env::set_var("QGATE_BATCH_TIMEOUT_MS", "500");

    let cli = CliOverrides {
        max_failures: Some(1),
        ..Default::default()
    };
    let config = QgateConfig::load(dir.path(), Some(&cli)).unwrap();

    assert_eq!(config.environment.as_deref(), Some("windows"));
    assert_eq!(config.realtime.batch_timeout_ms, Some(500));
    assert_eq!(
        config.quality_gate.rules[0].entries[0].expected,
        RuleExpectation::MaxFailures(1)
    );

    isolate_env(home.path());
}

#[test]
fn test_user_config_applies_when_project_config_is_missing() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());
    std::fs::write(
        home.path().join("config.toml"),
        "[[quality_gate.rules]]\nminTestsCount = 1\n",
    )
    .unwrap();

    let dir = tempdir();
    let config = QgateConfig::load(dir.path(), None).unwrap();
    assert!(config.quality_gate.is_configured());
    assert_eq!(
        config.quality_gate.referenced_rules().collect::<Vec<_>>(),
        ["minTestsCount"]
    );
}

#[test]
fn test_missing_files_fall_back_to_unconfigured_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let dir = tempdir();
    let config = QgateConfig::load(dir.path(), None).unwrap();
    assert!(!config.quality_gate.is_configured());
    assert!(config.realtime.effective_enabled());
    assert_eq!(config.realtime.effective_batch_timeout(), Duration::from_millis(100));
}

#[test]
fn test_invalid_values_are_rejected() {
    let err = QgateConfig::from_toml("[realtime]\nbatch_timeout_ms = 0\n").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField {
            field: "realtime.batch_timeout_ms",
            ..
        }
    ));

    let err = QgateConfig::from_toml("[[quality_gate.rules]]\nsuccessRate = 2.0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { .. }), "{err}");

    let err = QgateConfig::from_toml(
        "[[quality_gate.rules]]\nmaxFailures = 1\n\n[[quality_gate.rules]]\nid = \"\"\nmaxFailures = 2\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRuleset { index: 1, .. }), "{err}");
    assert!(err.to_string().starts_with("quality_gate.rules[1]"), "{err}");

    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());
    let dir = tempdir();
    let cli = CliOverrides {
        success_rate: Some(1.5),
        ..Default::default()
    };
    let err = QgateConfig::load(dir.path(), Some(&cli)).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidFlag {
            flag: "success-rate",
            ..
        }
    ));
}

#[test]
fn test_unparsable_env_var_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());
    std::env::set_var("QGATE_MIN_TESTS_COUNT", "many");

    let dir = tempdir();
    let err = QgateConfig::load(dir.path(), None).unwrap_err();
    assert!(
        matches!(
            &err,
            ConfigError::InvalidEnv { key: "QGATE_MIN_TESTS_COUNT", value, .. } if value == "many"
        ),
        "{err}"
    );
    assert!(err.to_string().contains("QGATE_MIN_TESTS_COUNT"), "{err}");

    isolate_env(home.path());
}

#[test]
fn test_round_trips_through_toml() {
    let config = QgateConfig::from_toml(PROJECT_TOML).unwrap();
    let rendered = config.to_toml().unwrap();
    let reparsed = QgateConfig::from_toml(&rendered).unwrap();

    assert_eq!(reparsed.quality_gate.rules.len(), 2);
    assert_eq!(reparsed.quality_gate.rules[0].id.as_deref(), Some("smoke"));
    assert!(reparsed.quality_gate.rules[0].filter.is_some());
    assert_eq!(
        reparsed.quality_gate.rules[1].entries,
        config.quality_gate.rules[1].entries
    );
}

#[test]
fn test_explicit_config_file_must_be_readable() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let home = tempdir();
    isolate_env(home.path());

    let missing = home.path().join("absent.toml");
    let err = QgateConfig::load_file(&missing, None).unwrap_err();
    match &err {
        ConfigError::Unreadable { path, .. } => assert_eq!(path, &missing),
        other => panic!("expected Unreadable, got {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());
}
