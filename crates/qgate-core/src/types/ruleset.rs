//! Rulesets: ordered rule → expected-value maps plus control keys.

use std::fmt;
use std::sync::Arc;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::quality_gate::{rule_names, RuleExpectation};
use super::test_result::{Label, TestResult, TestStatus};
use crate::constants::{
    CONTROL_KEY_FAST_FAIL, CONTROL_KEY_FAST_FAIL_ALIAS, CONTROL_KEY_FILTER, CONTROL_KEY_ID,
};

/// Declarative result filter, expressible in config files.
///
/// Every populated criterion must match. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestFilter {
    pub environments: Vec<String>,
    pub statuses: Vec<TestStatus>,
    pub labels: Vec<Label>,
    /// Glob over the full name (falls back to the short name).
    pub name: Option<String>,
}

/// Filter applied to a batch before a ruleset's rules see it.
#[derive(Clone)]
pub enum RulesetFilter {
    Fields {
        criteria: TestFilter,
        name_pattern: Option<glob::Pattern>,
    },
    Predicate(Arc<dyn Fn(&TestResult) -> bool + Send + Sync>),
}

impl RulesetFilter {
    /// Compile a declarative filter. Fails on an invalid name glob.
    pub fn from_criteria(criteria: TestFilter) -> Result<Self, String> {
        let name_pattern = criteria
            .name
            .as_deref()
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| format!("invalid name pattern: {e}"))?;
        Ok(Self::Fields { criteria, name_pattern })
    }

    pub fn predicate(f: impl Fn(&TestResult) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, tr: &TestResult) -> bool {
        match self {
            Self::Predicate(f) => f(tr),
            Self::Fields { criteria, name_pattern } => {
                if !criteria.environments.is_empty()
                    && !tr
                        .environment_name()
                        .is_some_and(|env| criteria.environments.iter().any(|e| e == env))
                {
                    return false;
                }
                if !criteria.statuses.is_empty() && !criteria.statuses.contains(&tr.status) {
                    return false;
                }
                if !criteria.labels.iter().all(|label| tr.labels.contains(label)) {
                    return false;
                }
                name_pattern
                    .as_ref()
                    .map_or(true, |pattern| pattern.matches(tr.display_name()))
            }
        }
    }
}

impl fmt::Debug for RulesetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields { criteria, .. } => f.debug_tuple("Fields").field(criteria).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// One rule key of a ruleset with its expected value.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub rule: String,
    pub expected: RuleExpectation,
}

/// An ordered group of rules evaluated together.
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    /// Namespaces state slots and result identities.
    pub id: Option<String>,
    /// A failing rule stops the whole evaluation.
    pub fast_fail: bool,
    pub filter: Option<RulesetFilter>,
    /// Rules in declaration order.
    pub entries: Vec<RuleEntry>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn fast_fail(mut self, fast_fail: bool) -> Self {
        self.fast_fail = fast_fail;
        self
    }

    pub fn with_filter(mut self, filter: RulesetFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add a rule under `name`. A repeated name replaces the earlier value in place.
    pub fn rule(mut self, name: impl Into<String>, expected: RuleExpectation) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.rule == name) {
            Some(entry) => entry.expected = expected,
            None => self.entries.push(RuleEntry {
                rule: name,
                expected,
            }),
        }
        self
    }

    pub fn max_failures(self, n: u64) -> Self {
        self.rule(rule_names::MAX_FAILURES, RuleExpectation::MaxFailures(n))
    }

    pub fn min_tests_count(self, n: u64) -> Self {
        self.rule(rule_names::MIN_TESTS_COUNT, RuleExpectation::MinTestsCount(n))
    }

    pub fn success_rate(self, rate: f64) -> Self {
        self.rule(rule_names::SUCCESS_RATE, RuleExpectation::SuccessRate(rate))
    }

    pub fn max_duration(self, ms: u64) -> Self {
        self.rule(rule_names::MAX_DURATION, RuleExpectation::MaxDuration(ms))
    }

    pub fn all_tests_contain_env(self, env: impl Into<String>) -> Self {
        self.rule(
            rule_names::ALL_TESTS_CONTAIN_ENV,
            RuleExpectation::AllTestsContainEnv(env.into()),
        )
    }

    pub fn environments_tested<I, S>(self, envs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(
            rule_names::ENVIRONMENTS_TESTED,
            RuleExpectation::EnvironmentsTested(envs.into_iter().map(Into::into).collect()),
        )
    }

    /// State and result identity of `rule` within this ruleset.
    pub fn rule_identity(&self, rule: &str) -> String {
        match &self.id {
            Some(id) => format!("{id}/{rule}"),
            None => rule.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for Ruleset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RulesetVisitor)
    }
}

struct RulesetVisitor;

impl<'de> Visitor<'de> for RulesetVisitor {
    type Value = Ruleset;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of rule names to expected values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Ruleset, A::Error> {
        let mut ruleset = Ruleset::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                CONTROL_KEY_ID => ruleset.id = Some(map.next_value()?),
                CONTROL_KEY_FAST_FAIL | CONTROL_KEY_FAST_FAIL_ALIAS => {
                    ruleset.fast_fail = map.next_value()?;
                }
                CONTROL_KEY_FILTER => {
                    let criteria: TestFilter = map.next_value()?;
                    let filter = RulesetFilter::from_criteria(criteria).map_err(de::Error::custom)?;
                    ruleset.filter = Some(filter);
                }
                _ => {
                    if ruleset.entries.iter().any(|e| e.rule == key) {
                        return Err(de::Error::custom(format!("duplicate rule `{key}`")));
                    }
                    let value: Value = map.next_value()?;
                    let expected = RuleExpectation::from_value(&key, value).map_err(|message| {
                        de::Error::custom(format!("invalid value for rule `{key}`: {message}"))
                    })?;
                    ruleset.entries.push(RuleEntry {
                        rule: key,
                        expected,
                    });
                }
            }
        }
        Ok(ruleset)
    }
}

impl Serialize for Ruleset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry(CONTROL_KEY_ID, id)?;
        }
        if self.fast_fail {
            map.serialize_entry(CONTROL_KEY_FAST_FAIL, &true)?;
        }
        for entry in &self.entries {
            map.serialize_entry(&entry.rule, &entry.expected)?;
        }
        // Predicates have no serialized form.
        if let Some(RulesetFilter::Fields { criteria, .. }) = &self.filter {
            map.serialize_entry(CONTROL_KEY_FILTER, criteria)?;
        }
        map.end()
    }
}
