//! allTestsContainEnv: every result must come from one environment.

use qgate_core::errors::GateError;
use qgate_core::types::{rule_names, RuleExpectation, RuleValue};

use super::{mismatch, QualityGateRule, RuleInput, RuleOutcome};
use crate::state::StateSlot;

/// Counts results whose environment differs from the expected one.
/// Results without an environment count as different.
pub struct AllTestsContainEnvRule;

impl AllTestsContainEnvRule {
    fn environment(expected: &RuleExpectation) -> Result<&str, GateError> {
        expected
            .as_environment()
            .ok_or_else(|| mismatch(rule_names::ALL_TESTS_CONTAIN_ENV, "an environment name", expected))
    }
}

impl QualityGateRule for AllTestsContainEnvRule {
    fn name(&self) -> &str {
        rule_names::ALL_TESTS_CONTAIN_ENV
    }

    fn cumulative(&self) -> bool {
        false
    }

    fn validate(
        &self,
        input: &RuleInput<'_>,
        _state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError> {
        let environment = Self::environment(input.expected)?;
        let actual = input
            .results
            .iter()
            .filter(|tr| tr.environment.as_deref() != Some(environment))
            .count() as u64;

        Ok(RuleOutcome::new(actual == 0, RuleValue::Count(actual)))
    }

    fn message(&self, actual: &RuleValue, expected: &RuleExpectation) -> String {
        format!("{actual} test(s) did not run in the expected environment \"{expected}\"")
    }

    fn check_expected(&self, expected: &RuleExpectation) -> Result<(), GateError> {
        Self::environment(expected).map(|_| ())
    }
}
