//! Tests for ordered ruleset evaluation.

use std::sync::Arc;

use proptest::prelude::*;
use qgate_core::config::QualityGateConfig;
use qgate_core::errors::GateError;
use qgate_core::types::{
    RuleExpectation, RuleValue, Ruleset, RulesetFilter, TestFilter, TestResult, TestStatus,
};
use qgate_engine::{evaluate, QualityGate, QualityGateState, RuleCatalog, ValidateParams};

fn result(id: usize, status: TestStatus) -> TestResult {
    TestResult::new(format!("r{id}"), format!("test {id}"), status)
}

fn failures(range: std::ops::Range<usize>) -> Vec<TestResult> {
    range.map(|i| result(i, TestStatus::Failed)).collect()
}

fn gate(rulesets: Vec<Ruleset>) -> QualityGate {
    QualityGate::with_built_in_rules(QualityGateConfig::new(rulesets)).unwrap()
}

#[test]
fn test_every_failing_rule_yields_one_result_in_order() {
    let gate = gate(vec![Ruleset::new()
        .max_failures(0)
        .min_tests_count(10)
        .success_rate(0.9)
        .max_duration(1000)]);
    let results = failures(0..2);

    let outcome = gate.validate(ValidateParams::new(&results)).unwrap();
    assert!(!outcome.fast_failed);
    let rules: Vec<&str> = outcome.results.iter().map(|r| r.rule.as_str()).collect();
    assert_eq!(rules, ["maxFailures", "minTestsCount", "successRate"]);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.environment.as_deref() == Some("default")));
}

#[test]
fn test_passing_gate_and_empty_config_yield_nothing() {
    let results = vec![result(0, TestStatus::Passed)];
    let outcome = gate(vec![Ruleset::new().max_failures(0)])
        .validate(ValidateParams::new(&results))
        .unwrap();
    assert!(outcome.passed());

    let outcome = evaluate(&[], &RuleCatalog::built_in(), ValidateParams::new(&results)).unwrap();
    assert!(outcome.passed());
    assert!(!outcome.fast_failed);
}

#[test]
fn test_unknown_rule_aborts_without_partial_results() {
    let rulesets = vec![Ruleset::new()
        .max_failures(0)
        .rule("noSuchRule", RuleExpectation::Custom(serde_json::json!(1)))];
    let results = failures(0..3);

    let err = evaluate(&rulesets, &RuleCatalog::built_in(), ValidateParams::new(&results))
        .unwrap_err();
    assert_eq!(
        err,
        GateError::UnknownRule {
            rule: "noSuchRule".into()
        }
    );

    let err = QualityGate::with_built_in_rules(QualityGateConfig::new(rulesets)).unwrap_err();
    assert!(matches!(err, GateError::UnknownRule { .. }));
}

#[test]
fn test_fast_fail_keeps_earlier_results_and_skips_later_rulesets() {
    let gate = gate(vec![
        Ruleset::new().with_id("a").min_tests_count(100),
        Ruleset::new()
            .with_id("b")
            .fast_fail(true)
            .max_failures(0)
            .success_rate(1.0),
        Ruleset::new().with_id("c").max_failures(0),
    ]);
    let results = failures(0..1);

    let outcome = gate.validate(ValidateParams::new(&results)).unwrap();
    assert!(outcome.fast_failed);
    let rules: Vec<&str> = outcome.results.iter().map(|r| r.rule.as_str()).collect();
    assert_eq!(rules, ["a/minTestsCount", "b/maxFailures"]);
}

#[test]
fn test_filter_narrows_the_batch_per_ruleset() {
    let linux_only = RulesetFilter::from_criteria(TestFilter {
        environments: vec!["linux".into()],
        ..Default::default()
    })
    .unwrap();
    let gate = gate(vec![
        Ruleset::new()
            .with_id("linux")
            .with_filter(linux_only)
            .max_failures(0),
        Ruleset::new()
            .with_id("smoke")
            .with_filter(RulesetFilter::predicate(|tr| tr.name.starts_with("smoke")))
            .min_tests_count(1),
    ]);
    let results = vec![
        result(0, TestStatus::Failed).with_environment("mac"),
        result(1, TestStatus::Passed).with_environment("linux"),
    ];

    let outcome = gate.validate(ValidateParams::new(&results)).unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].rule, "smoke/minTestsCount");
    assert_eq!(outcome.results[0].actual, RuleValue::Count(0));
}

#[test]
fn test_incremental_fast_fail_trips_on_the_second_batch() {
    let gate = gate(vec![Ruleset::new().fast_fail(true).max_failures(2)]);
    let mut state = QualityGateState::new();

    let first = failures(0..1);
    let outcome = gate
        .validate(ValidateParams::new(&first).state(&mut state))
        .unwrap();
    assert!(outcome.passed());

    let second = failures(1..3);
    let outcome = gate
        .validate(ValidateParams::new(&second).state(&mut state))
        .unwrap();
    assert!(outcome.fast_failed);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].actual, RuleValue::Count(3));
    assert_eq!(outcome.results[0].expected, RuleExpectation::MaxFailures(2));
}

#[test]
fn test_ruleset_ids_keep_accumulators_apart() {
    let gate = gate(vec![
        Ruleset::new().with_id("x").max_failures(10),
        Ruleset::new()
            .with_id("y")
            .with_filter(RulesetFilter::predicate(|tr| tr.id == "r0"))
            .max_failures(10),
    ]);
    let mut state = QualityGateState::new();
    let results = failures(0..3);
    gate.validate(ValidateParams::new(&results).state(&mut state))
        .unwrap();

    assert_eq!(state.get("x/maxFailures").and_then(|a| a.as_count()), Some(3));
    assert_eq!(state.get("y/maxFailures").and_then(|a| a.as_count()), Some(1));
}

#[test]
fn test_unnamed_rulesets_sharing_a_cumulative_rule_are_rejected() {
    let config = QualityGateConfig::new(vec![
        Ruleset::new().fast_fail(true).max_failures(3),
        Ruleset::new().max_failures(10),
    ]);
    let err = QualityGate::with_built_in_rules(config).unwrap_err();
    assert_eq!(
        err,
        GateError::SharedRuleState {
            identity: "maxFailures".into()
        }
    );
    assert!(err.to_string().contains("\"maxFailures\""), "{err}");

    // Non-cumulative rules keep no state, so repeating them is fine.
    gate(vec![
        Ruleset::new().success_rate(0.5),
        Ruleset::new().success_rate(0.9),
    ]);
}

#[test]
fn test_distinct_ids_keep_incremental_and_final_passes_in_agreement() {
    let gate = gate(vec![
        Ruleset::new().fast_fail(true).max_failures(3),
        Ruleset::new().with_id("wide").max_failures(10),
    ]);
    let mut state = QualityGateState::new();

    let first = failures(0..2);
    assert!(gate
        .validate(ValidateParams::new(&first).state(&mut state))
        .unwrap()
        .passed());
    let second = failures(2..3);
    let outcome = gate
        .validate(ValidateParams::new(&second).state(&mut state))
        .unwrap();
    assert!(!outcome.fast_failed);
    assert!(outcome.passed());
    assert_eq!(state.get("maxFailures").and_then(|a| a.as_count()), Some(3));
    assert_eq!(state.get("wide/maxFailures").and_then(|a| a.as_count()), Some(3));

    let all = failures(0..3);
    assert!(gate.validate(ValidateParams::new(&all)).unwrap().passed());
}

#[test]
fn test_cumulative_failures_exceed_the_limit_only_in_total() {
    let gate = gate(vec![Ruleset::new().max_failures(4)]);
    let mut state = QualityGateState::new();

    let a = failures(0..3);
    assert!(gate
        .validate(ValidateParams::new(&a).state(&mut state))
        .unwrap()
        .passed());

    let b = failures(3..5);
    let outcome = gate
        .validate(ValidateParams::new(&b).state(&mut state))
        .unwrap();
    assert_eq!(outcome.results[0].actual, RuleValue::Count(5));
}

#[test]
fn test_environment_is_reported_on_results() {
    let gate = gate(vec![Ruleset::new().max_failures(0)]);
    let results = failures(0..1);
    let outcome = gate
        .validate(ValidateParams::new(&results).environment("ci"))
        .unwrap();
    assert_eq!(outcome.results[0].environment.as_deref(), Some("ci"));
    assert_eq!(
        outcome.results[0].to_string(),
        "maxFailures: The number of failed tests 1 exceeds the allowed threshold value 0"
    );
}

#[test]
fn test_custom_rule_through_a_gate() {
    use qgate_engine::{QualityGateRule, RuleInput, RuleOutcome, StateSlot};

    struct NoSkipped;

    impl QualityGateRule for NoSkipped {
        fn name(&self) -> &str {
            "noSkipped"
        }

        fn cumulative(&self) -> bool {
            false
        }

        fn validate(
            &self,
            input: &RuleInput<'_>,
            _state: &mut StateSlot<'_>,
        ) -> Result<RuleOutcome, GateError> {
            let skipped = input
                .results
                .iter()
                .filter(|tr| tr.status == TestStatus::Skipped)
                .count() as u64;
            Ok(RuleOutcome::new(skipped == 0, RuleValue::Count(skipped)))
        }

        fn message(&self, actual: &RuleValue, _expected: &RuleExpectation) -> String {
            format!("{actual} skipped")
        }
    }

    let config = QualityGateConfig::new(vec![
        Ruleset::new().rule("noSkipped", RuleExpectation::Custom(serde_json::json!(true)))
    ]);
    let gate = QualityGate::new(config, RuleCatalog::built_in().with_rule(Arc::new(NoSkipped)))
        .unwrap();
    let results = vec![result(0, TestStatus::Skipped)];
    let outcome = gate.validate(ValidateParams::new(&results)).unwrap();
    assert_eq!(outcome.results[0].message, "1 skipped");
}

fn status_strategy() -> impl Strategy<Value = TestStatus> {
    prop_oneof![
        Just(TestStatus::Passed),
        Just(TestStatus::Failed),
        Just(TestStatus::Broken),
        Just(TestStatus::Skipped),
    ]
}

proptest! {
    /// Splitting a run into batches never changes the cumulative totals a
    /// single stateless pass over everything reports.
    #[test]
    fn prop_incremental_totals_match_a_full_pass(
        statuses in prop::collection::vec(status_strategy(), 0..40),
        cuts in prop::collection::vec(0usize..40, 0..5),
    ) {
        let results: Vec<TestResult> = statuses
            .into_iter()
            .enumerate()
            .map(|(i, status)| result(i, status))
            .collect();
        let rulesets = vec![Ruleset::new().max_failures(0).min_tests_count(u64::MAX)];
        let catalog = RuleCatalog::built_in();

        let mut bounds: Vec<usize> = cuts.into_iter().map(|c| c.min(results.len())).collect();
        bounds.push(0);
        bounds.push(results.len());
        bounds.sort_unstable();

        let mut state = QualityGateState::new();
        for window in bounds.windows(2) {
            let batch = &results[window[0]..window[1]];
            evaluate(&rulesets, &catalog, ValidateParams::new(batch).state(&mut state)).unwrap();
        }

        let full = evaluate(&rulesets, &catalog, ValidateParams::new(&results)).unwrap();
        let full_total = |rule: &str| {
            full.results
                .iter()
                .find(|r| r.rule == rule)
                .and_then(|r| r.actual.as_count())
                .unwrap_or(0)
        };

        prop_assert_eq!(
            state.get("minTestsCount").and_then(|a| a.as_count()).unwrap_or(0),
            full_total("minTestsCount")
        );
        prop_assert_eq!(
            state.get("maxFailures").and_then(|a| a.as_count()).unwrap_or(0),
            full_total("maxFailures")
        );
    }
}
