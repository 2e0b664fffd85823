//! successRate: share of passed results among those not covered by known issues.

use qgate_core::errors::GateError;
use qgate_core::types::{rule_names, KnownIssueIndex, RuleExpectation, RuleValue};

use super::{mismatch, QualityGateRule, RuleInput, RuleOutcome};
use crate::state::StateSlot;

/// Per-batch pass rate. Not cumulative.
///
/// With no passed result among the unknown ones the rate is 0, including
/// for an empty batch.
pub struct SuccessRateRule;

impl SuccessRateRule {
    fn threshold(expected: &RuleExpectation) -> Result<f64, GateError> {
        expected
            .as_rate()
            .ok_or_else(|| mismatch(rule_names::SUCCESS_RATE, "a rate between 0 and 1", expected))
    }
}

impl QualityGateRule for SuccessRateRule {
    fn name(&self) -> &str {
        rule_names::SUCCESS_RATE
    }

    fn cumulative(&self) -> bool {
        false
    }

    fn validate(
        &self,
        input: &RuleInput<'_>,
        _state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError> {
        let threshold = Self::threshold(input.expected)?;
        let index = KnownIssueIndex::new(input.known_issues);
        let (unknown, passed) = input
            .results
            .iter()
            .filter(|tr| index.is_unknown(tr))
            .fold((0usize, 0usize), |(unknown, passed), tr| {
                (unknown + 1, passed + usize::from(tr.status.is_successful()))
            });

        let rate = if passed == 0 {
            0.0
        } else {
            passed as f64 / unknown as f64
        };

        Ok(RuleOutcome::new(rate >= threshold, RuleValue::Rate(rate)))
    }

    fn message(&self, actual: &RuleValue, expected: &RuleExpectation) -> String {
        format!("Success rate {actual} is less than the expected threshold value {expected}")
    }

    fn check_expected(&self, expected: &RuleExpectation) -> Result<(), GateError> {
        Self::threshold(expected).map(|_| ())
    }
}
