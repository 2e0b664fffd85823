//! Quality gate value types: expectations, actual values, accumulators, results.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Rule names of the built-in catalog.
pub mod rule_names {
    pub const MAX_FAILURES: &str = "maxFailures";
    pub const MIN_TESTS_COUNT: &str = "minTestsCount";
    pub const SUCCESS_RATE: &str = "successRate";
    pub const MAX_DURATION: &str = "maxDuration";
    pub const ALL_TESTS_CONTAIN_ENV: &str = "allTestsContainEnv";
    pub const ENVIRONMENTS_TESTED: &str = "environmentsTested";

    pub const BUILT_IN: &[&str] = &[
        MAX_FAILURES,
        MIN_TESTS_COUNT,
        SUCCESS_RATE,
        MAX_DURATION,
        ALL_TESTS_CONTAIN_ENV,
        ENVIRONMENTS_TESTED,
    ];
}

/// The configured "expected" value of one rule, typed by rule name.
///
/// Built-in rule names always parse into their own variant. Any other name
/// keeps its raw value as `Custom` for rules supplied through the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleExpectation {
    MaxFailures(u64),
    MinTestsCount(u64),
    SuccessRate(f64),
    MaxDuration(u64),
    AllTestsContainEnv(String),
    EnvironmentsTested(Vec<String>),
    Custom(Value),
}

impl RuleExpectation {
    /// Parse the raw config value for `rule`.
    pub fn from_value(rule: &str, value: Value) -> Result<Self, String> {
        use rule_names::*;

        match rule {
            MAX_FAILURES => non_negative_integer(&value).map(Self::MaxFailures),
            MIN_TESTS_COUNT => non_negative_integer(&value).map(Self::MinTestsCount),
            MAX_DURATION => non_negative_integer(&value).map(Self::MaxDuration),
            SUCCESS_RATE => match value.as_f64() {
                Some(rate) if (0.0..=1.0).contains(&rate) => Ok(Self::SuccessRate(rate)),
                _ => Err(format!("expected a number between 0 and 1, got {value}")),
            },
            ALL_TESTS_CONTAIN_ENV => match value {
                Value::String(env) => Ok(Self::AllTestsContainEnv(env)),
                other => Err(format!("expected an environment name, got {other}")),
            },
            ENVIRONMENTS_TESTED => match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(env) => Ok(env),
                        other => Err(format!("expected environment names, got {other}")),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::EnvironmentsTested),
                other => Err(format!("expected a list of environment names, got {other}")),
            },
            _ => Ok(Self::Custom(value)),
        }
    }

    /// Integer threshold carried by count-like variants.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::MaxFailures(n) | Self::MinTestsCount(n) | Self::MaxDuration(n) => Some(*n),
            Self::Custom(value) => value.as_u64(),
            _ => None,
        }
    }

    pub fn as_rate(&self) -> Option<f64> {
        match self {
            Self::SuccessRate(rate) => Some(*rate),
            Self::Custom(value) => value.as_f64(),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&str> {
        match self {
            Self::AllTestsContainEnv(env) => Some(env),
            Self::Custom(Value::String(env)) => Some(env),
            _ => None,
        }
    }

    pub fn as_environments(&self) -> Option<&[String]> {
        match self {
            Self::EnvironmentsTested(envs) => Some(envs),
            _ => None,
        }
    }

    /// JSON view of the value, as it appeared in config.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for RuleExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxFailures(n) | Self::MinTestsCount(n) => write!(f, "{n}"),
            Self::MaxDuration(ms) => write!(f, "{ms}ms"),
            Self::SuccessRate(rate) => write!(f, "{rate}"),
            Self::AllTestsContainEnv(env) => f.write_str(env),
            Self::EnvironmentsTested(envs) => f.write_str(&envs.join(", ")),
            Self::Custom(value) => write!(f, "{value}"),
        }
    }
}

fn non_negative_integer(value: &Value) -> Result<u64, String> {
    value
        .as_u64()
        .ok_or_else(|| format!("expected a non-negative integer, got {value}"))
}

/// The `actual` value a rule measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleValue {
    Count(u64),
    Rate(f64),
    /// Milliseconds.
    Duration(u64),
    Environments(Vec<String>),
    Custom(Value),
}

impl RuleValue {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) | Self::Duration(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_rate(&self) -> Option<f64> {
        match self {
            Self::Rate(rate) => Some(*rate),
            _ => None,
        }
    }

    pub fn as_environments(&self) -> Option<&[String]> {
        match self {
            Self::Environments(envs) => Some(envs),
            _ => None,
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Rate(rate) => write!(f, "{rate}"),
            Self::Duration(ms) => write!(f, "{ms}ms"),
            Self::Environments(envs) => f.write_str(&envs.join(", ")),
            Self::Custom(value) => write!(f, "{value}"),
        }
    }
}

/// A rule's running value between evaluation calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count(u64),
    Environments(BTreeSet<String>),
    Custom(Value),
}

impl Accumulator {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_environments(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Environments(envs) => Some(envs),
            _ => None,
        }
    }
}

/// One failed rule. Passing rules never produce a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Rule identity, `<ruleset id>/<rule>` when the ruleset has an id.
    pub rule: String,
    pub message: String,
    pub actual: RuleValue,
    pub expected: RuleExpectation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn built_in_names_parse_into_typed_variants() {
        assert_eq!(
            RuleExpectation::from_value("maxFailures", json!(3)).unwrap(),
            RuleExpectation::MaxFailures(3)
        );
        assert_eq!(
            RuleExpectation::from_value("environmentsTested", json!(["a", "b"])).unwrap(),
            RuleExpectation::EnvironmentsTested(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            RuleExpectation::from_value("teamOwner", json!("qa")).unwrap(),
            RuleExpectation::Custom(json!("qa"))
        );
    }

    #[test]
    fn wrong_shape_for_built_in_is_rejected() {
        assert!(RuleExpectation::from_value("maxFailures", json!(-1)).is_err());
        assert!(RuleExpectation::from_value("successRate", json!(1.5)).is_err());
        assert!(RuleExpectation::from_value("allTestsContainEnv", json!(3)).is_err());
        assert!(RuleExpectation::from_value("environmentsTested", json!([1])).is_err());
    }

    #[test]
    fn validation_result_renders_as_rule_and_message() {
        let result = ValidationResult {
            rule: "smoke/maxFailures".into(),
            message: "too many".into(),
            actual: RuleValue::Count(3),
            expected: RuleExpectation::MaxFailures(2),
            environment: None,
        };
        assert_eq!(result.to_string(), "smoke/maxFailures: too many");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["actual"], json!(3));
        assert_eq!(json["expected"], json!(2));
    }
}
