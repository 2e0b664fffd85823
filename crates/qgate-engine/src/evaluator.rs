//! Ordered ruleset evaluation with fast-fail short-circuiting.

use qgate_core::config::QualityGateConfig;
use qgate_core::constants::DEFAULT_ENVIRONMENT;
use qgate_core::errors::GateError;
use qgate_core::types::{KnownTestFailure, Ruleset, TestResult, ValidationResult};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::rules::{RuleCatalog, RuleInput};
use crate::state::{QualityGateState, StateSlot};

/// Inputs of one evaluation call.
#[derive(Debug)]
pub struct ValidateParams<'a> {
    pub results: &'a [TestResult],
    pub known_issues: &'a [KnownTestFailure],
    /// Shared accumulators for incremental passes. `None` makes the pass stateless.
    pub state: Option<&'a mut QualityGateState>,
    /// Environment reported in results. Defaults to `"default"`.
    pub environment: Option<&'a str>,
}

impl<'a> ValidateParams<'a> {
    pub fn new(results: &'a [TestResult]) -> Self {
        Self {
            results,
            known_issues: &[],
            state: None,
            environment: None,
        }
    }

    pub fn known_issues(mut self, known_issues: &'a [KnownTestFailure]) -> Self {
        self.known_issues = known_issues;
        self
    }

    pub fn state(mut self, state: &'a mut QualityGateState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn environment(mut self, environment: &'a str) -> Self {
        self.environment = Some(environment);
        self
    }
}

/// Result of one evaluation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityGateOutcome {
    pub fast_failed: bool,
    /// Failed rules only, in evaluation order.
    pub results: Vec<ValidationResult>,
}

impl QualityGateOutcome {
    pub fn passed(&self) -> bool {
        self.results.is_empty()
    }
}

/// Evaluate `rulesets` in order against one batch.
///
/// Unknown rule names and unusable expected values abort the call with a
/// [`GateError`]; no partial results are returned in that case.
pub fn evaluate(
    rulesets: &[Ruleset],
    catalog: &RuleCatalog,
    params: ValidateParams<'_>,
) -> Result<QualityGateOutcome, GateError> {
    let mut outcome = QualityGateOutcome::default();
    if rulesets.is_empty() {
        return Ok(outcome);
    }

    let ValidateParams {
        results,
        known_issues,
        mut state,
        environment,
    } = params;
    let environment = environment.unwrap_or(DEFAULT_ENVIRONMENT);

    for ruleset in rulesets {
        if outcome.fast_failed {
            break;
        }

        let batch: Vec<&TestResult> = match &ruleset.filter {
            Some(filter) => results.iter().filter(|tr| filter.matches(tr)).collect(),
            None => results.iter().collect(),
        };

        for entry in &ruleset.entries {
            let rule = catalog.resolve(&entry.rule)?;
            let rule_id = ruleset.rule_identity(&entry.rule);
            let mut slot = match state.as_deref_mut() {
                Some(state) => StateSlot::bound(state, &rule_id),
                None => StateSlot::detached(&rule_id),
            };

            let input = RuleInput {
                results: &batch,
                expected: &entry.expected,
                known_issues,
                environment,
            };
            let verdict = rule.validate(&input, &mut slot)?;
            debug!(
                rule = %rule_id,
                success = verdict.success,
                actual = %verdict.actual,
                batch = batch.len(),
                "rule evaluated"
            );
            if verdict.success {
                continue;
            }

            outcome.results.push(ValidationResult {
                message: rule.message(&verdict.actual, &entry.expected),
                rule: rule_id,
                actual: verdict.actual,
                expected: entry.expected.clone(),
                environment: Some(environment.to_string()),
            });

            if ruleset.fast_fail {
                warn!(rule = %ruleset.rule_identity(&entry.rule), "fast-fail rule tripped");
                outcome.fast_failed = true;
                break;
            }
        }
    }

    Ok(outcome)
}

/// A configured quality gate: rulesets checked against a rule catalog.
#[derive(Debug, Clone)]
pub struct QualityGate {
    rulesets: Vec<Ruleset>,
    catalog: RuleCatalog,
}

impl QualityGate {
    /// Build a gate, checking every referenced rule name and expected value
    /// against `catalog` up front.
    ///
    /// Two rulesets may not bind the same identity for a cumulative rule: they
    /// would share one accumulator and count each batch twice.
    pub fn new(config: QualityGateConfig, catalog: RuleCatalog) -> Result<Self, GateError> {
        let mut cumulative: FxHashSet<String> = FxHashSet::default();
        for ruleset in &config.rules {
            for entry in &ruleset.entries {
                let rule = catalog.resolve(&entry.rule)?;
                rule.check_expected(&entry.expected)?;
                if rule.cumulative() {
                    let identity = ruleset.rule_identity(&entry.rule);
                    if !cumulative.insert(identity.clone()) {
                        return Err(GateError::SharedRuleState { identity });
                    }
                }
            }
        }
        Ok(Self {
            rulesets: config.rules,
            catalog,
        })
    }

    /// Build a gate over the built-in catalog.
    pub fn with_built_in_rules(config: QualityGateConfig) -> Result<Self, GateError> {
        Self::new(config, RuleCatalog::built_in())
    }

    pub fn is_configured(&self) -> bool {
        !self.rulesets.is_empty()
    }

    pub fn rulesets(&self) -> &[Ruleset] {
        &self.rulesets
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn validate(&self, params: ValidateParams<'_>) -> Result<QualityGateOutcome, GateError> {
        evaluate(&self.rulesets, &self.catalog, params)
    }
}
