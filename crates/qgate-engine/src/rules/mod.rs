//! Rule catalog: six built-in rules plus caller-supplied extensions.

pub mod all_tests_contain_env;
pub mod environments_tested;
pub mod max_duration;
pub mod max_failures;
pub mod min_tests_count;
pub mod success_rate;

use std::fmt;
use std::sync::Arc;

use qgate_core::errors::GateError;
use qgate_core::types::{KnownTestFailure, RuleExpectation, RuleValue, TestResult};

use crate::state::StateSlot;

pub use all_tests_contain_env::AllTestsContainEnvRule;
pub use environments_tested::EnvironmentsTestedRule;
pub use max_duration::MaxDurationRule;
pub use max_failures::MaxFailuresRule;
pub use min_tests_count::MinTestsCountRule;
pub use success_rate::SuccessRateRule;

/// Everything a rule sees for one evaluation call.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// The batch after the ruleset's filter.
    pub results: &'a [&'a TestResult],
    pub expected: &'a RuleExpectation,
    pub known_issues: &'a [KnownTestFailure],
    pub environment: &'a str,
}

/// Verdict of one rule for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub success: bool,
    pub actual: RuleValue,
}

impl RuleOutcome {
    pub fn new(success: bool, actual: RuleValue) -> Self {
        Self { success, actual }
    }
}

/// A named validation capability.
///
/// Rules hold no state of their own; anything carried between calls goes
/// through the [`StateSlot`]. Returning `Ok` with `success: false` is the
/// normal failure path. `Err` is reserved for configuration faults.
pub trait QualityGateRule: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `actual` accumulates across calls sharing a state.
    fn cumulative(&self) -> bool;

    fn validate(
        &self,
        input: &RuleInput<'_>,
        state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError>;

    /// Human-readable failure text. Formatting only.
    fn message(&self, actual: &RuleValue, expected: &RuleExpectation) -> String;

    /// Check that `expected` has a shape this rule can use.
    fn check_expected(&self, _expected: &RuleExpectation) -> Result<(), GateError> {
        Ok(())
    }
}

/// Shape error for `rule`.
pub(crate) fn mismatch(rule: &str, wanted: &str, expected: &RuleExpectation) -> GateError {
    GateError::ExpectationMismatch {
        rule: rule.to_string(),
        message: format!("expected {wanted}, got {}", expected.to_json()),
    }
}

/// The active set of rules, looked up by exact name.
#[derive(Clone)]
pub struct RuleCatalog {
    rules: Vec<Arc<dyn QualityGateRule>>,
}

impl RuleCatalog {
    /// A catalog with no rules. Use it to replace the built-ins entirely.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The six built-in rules.
    pub fn built_in() -> Self {
        Self {
            rules: vec![
                Arc::new(MaxFailuresRule),
                Arc::new(MinTestsCountRule),
                Arc::new(SuccessRateRule),
                Arc::new(MaxDurationRule),
                Arc::new(AllTestsContainEnvRule),
                Arc::new(EnvironmentsTestedRule),
            ],
        }
    }

    /// Add a rule, replacing any rule with the same name in place.
    pub fn with_rule(mut self, rule: Arc<dyn QualityGateRule>) -> Self {
        match self.rules.iter_mut().find(|r| r.name() == rule.name()) {
            Some(slot) => *slot = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn QualityGateRule>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Look up `name`, failing with a configuration error when absent.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn QualityGateRule>, GateError> {
        self.get(name).ok_or_else(|| GateError::UnknownRule {
            rule: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    pub fn cumulative_rules(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter(|r| r.cumulative()).map(|r| r.name())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}

impl fmt::Debug for RuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
