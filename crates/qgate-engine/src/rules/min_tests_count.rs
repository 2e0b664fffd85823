//! minTestsCount: running total of results must reach a minimum.

use qgate_core::errors::GateError;
use qgate_core::types::{rule_names, Accumulator, RuleExpectation, RuleValue};

use super::{mismatch, QualityGateRule, RuleInput, RuleOutcome};
use crate::state::StateSlot;

pub struct MinTestsCountRule;

impl MinTestsCountRule {
    fn minimum(expected: &RuleExpectation) -> Result<u64, GateError> {
        expected
            .as_count()
            .ok_or_else(|| mismatch(rule_names::MIN_TESTS_COUNT, "a test count", expected))
    }
}

impl QualityGateRule for MinTestsCountRule {
    fn name(&self) -> &str {
        rule_names::MIN_TESTS_COUNT
    }

    fn cumulative(&self) -> bool {
        true
    }

    fn validate(
        &self,
        input: &RuleInput<'_>,
        state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError> {
        let minimum = Self::minimum(input.expected)?;
        let actual = input.results.len() as u64 + state.count();
        state.set(Accumulator::Count(actual));

        Ok(RuleOutcome::new(actual >= minimum, RuleValue::Count(actual)))
    }

    fn message(&self, actual: &RuleValue, expected: &RuleExpectation) -> String {
        format!("The total number of tests {actual} is less than the expected threshold value {expected}")
    }

    fn check_expected(&self, expected: &RuleExpectation) -> Result<(), GateError> {
        Self::minimum(expected).map(|_| ())
    }
}
