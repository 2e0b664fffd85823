//! maxFailures: running count of unknown failures must stay within a limit.

use qgate_core::errors::GateError;
use qgate_core::types::{rule_names, Accumulator, KnownIssueIndex, RuleExpectation, RuleValue};

use super::{mismatch, QualityGateRule, RuleInput, RuleOutcome};
use crate::state::StateSlot;

/// Counts failed and broken results not covered by a known issue, cumulatively.
pub struct MaxFailuresRule;

impl MaxFailuresRule {
    fn limit(expected: &RuleExpectation) -> Result<u64, GateError> {
        expected
            .as_count()
            .ok_or_else(|| mismatch(rule_names::MAX_FAILURES, "a failure count", expected))
    }
}

impl QualityGateRule for MaxFailuresRule {
    fn name(&self) -> &str {
        rule_names::MAX_FAILURES
    }

    fn cumulative(&self) -> bool {
        true
    }

    fn validate(
        &self,
        input: &RuleInput<'_>,
        state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError> {
        let limit = Self::limit(input.expected)?;
        let index = KnownIssueIndex::new(input.known_issues);
        let failed = input
            .results
            .iter()
            .filter(|tr| index.is_unknown(tr) && tr.status.is_unsuccessful())
            .count() as u64;

        let actual = failed + state.count();
        state.set(Accumulator::Count(actual));

        Ok(RuleOutcome::new(actual <= limit, RuleValue::Count(actual)))
    }

    fn message(&self, actual: &RuleValue, expected: &RuleExpectation) -> String {
        format!(
            "The number of failed tests {actual} exceeds the allowed threshold value {expected}"
        )
    }

    fn check_expected(&self, expected: &RuleExpectation) -> Result<(), GateError> {
        Self::limit(expected).map(|_| ())
    }
}
