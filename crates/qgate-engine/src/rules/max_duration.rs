//! maxDuration: the slowest result of a batch must stay within a limit.

use qgate_core::errors::GateError;
use qgate_core::types::{rule_names, RuleExpectation, RuleValue};

use super::{mismatch, QualityGateRule, RuleInput, RuleOutcome};
use crate::state::StateSlot;

/// Per-batch maximum duration in milliseconds. Not cumulative.
pub struct MaxDurationRule;

impl MaxDurationRule {
    fn limit(expected: &RuleExpectation) -> Result<u64, GateError> {
        expected
            .as_count()
            .ok_or_else(|| mismatch(rule_names::MAX_DURATION, "a duration in milliseconds", expected))
    }
}

impl QualityGateRule for MaxDurationRule {
    fn name(&self) -> &str {
        rule_names::MAX_DURATION
    }

    fn cumulative(&self) -> bool {
        false
    }

    fn validate(
        &self,
        input: &RuleInput<'_>,
        _state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError> {
        let limit = Self::limit(input.expected)?;
        let actual = input
            .results
            .iter()
            .map(|tr| tr.duration.unwrap_or(0))
            .max()
            .unwrap_or(0);

        Ok(RuleOutcome::new(actual <= limit, RuleValue::Duration(actual)))
    }

    fn message(&self, actual: &RuleValue, expected: &RuleExpectation) -> String {
        format!(
            "Maximum duration of some tests exceeds the defined limit; actual {actual}, expected {expected}"
        )
    }

    fn check_expected(&self, expected: &RuleExpectation) -> Result<(), GateError> {
        Self::limit(expected).map(|_| ())
    }
}
