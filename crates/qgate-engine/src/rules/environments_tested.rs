//! environmentsTested: every listed environment must appear at least once.

use std::collections::BTreeSet;

use qgate_core::errors::GateError;
use qgate_core::types::{rule_names, Accumulator, RuleExpectation, RuleValue};

use super::{mismatch, QualityGateRule, RuleInput, RuleOutcome};
use crate::state::StateSlot;

/// Accumulates the distinct non-empty environments seen so far and reports
/// the expected ones still missing, in configured order.
pub struct EnvironmentsTestedRule;

impl EnvironmentsTestedRule {
    fn required(expected: &RuleExpectation) -> Result<&[String], GateError> {
        expected.as_environments().ok_or_else(|| {
            mismatch(rule_names::ENVIRONMENTS_TESTED, "a list of environment names", expected)
        })
    }
}

impl QualityGateRule for EnvironmentsTestedRule {
    fn name(&self) -> &str {
        rule_names::ENVIRONMENTS_TESTED
    }

    fn cumulative(&self) -> bool {
        true
    }

    fn validate(
        &self,
        input: &RuleInput<'_>,
        state: &mut StateSlot<'_>,
    ) -> Result<RuleOutcome, GateError> {
        let required = Self::required(input.expected)?;

        let mut seen: BTreeSet<String> = state
            .get()
            .and_then(Accumulator::as_environments)
            .cloned()
            .unwrap_or_default();
        seen.extend(
            input
                .results
                .iter()
                .filter_map(|tr| tr.environment_name())
                .map(str::to_string),
        );

        let missing: Vec<String> = required
            .iter()
            .filter(|env| !seen.contains(env.as_str()))
            .cloned()
            .collect();
        state.set(Accumulator::Environments(seen));

        Ok(RuleOutcome::new(missing.is_empty(), RuleValue::Environments(missing)))
    }

    fn message(&self, actual: &RuleValue, _expected: &RuleExpectation) -> String {
        format!("The following environments were not tested: {actual}")
    }

    fn check_expected(&self, expected: &RuleExpectation) -> Result<(), GateError> {
        Self::required(expected).map(|_| ())
    }
}
