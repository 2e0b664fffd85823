//! Known (quarantined) test failures.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::test_result::TestResult;

/// A test identity pre-approved as a known failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownTestFailure {
    pub history_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl KnownTestFailure {
    pub fn new(history_id: impl Into<String>) -> Self {
        Self {
            history_id: history_id.into(),
            issues: Vec::new(),
            comment: None,
        }
    }
}

/// History ids covered by the known-issue list, for membership checks.
#[derive(Debug, Default)]
pub struct KnownIssueIndex<'a> {
    history_ids: HashSet<&'a str>,
}

impl<'a> KnownIssueIndex<'a> {
    pub fn new(known_issues: &'a [KnownTestFailure]) -> Self {
        Self {
            history_ids: known_issues.iter().map(|k| k.history_id.as_str()).collect(),
        }
    }

    /// A result is unknown when it has no history id or its history id is not listed.
    pub fn is_unknown(&self, tr: &TestResult) -> bool {
        match tr.history_id.as_deref() {
            Some(id) => !self.history_ids.contains(id),
            None => true,
        }
    }
}
