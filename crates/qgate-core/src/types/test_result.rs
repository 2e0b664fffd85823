//! Test result records read from the result store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final status of a single test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Broken,
    Skipped,
    #[default]
    Unknown,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Broken => "broken",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }

    /// Passed is the only successful status.
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failed and broken count as failures. Skipped and unknown do not.
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, Self::Failed | Self::Broken)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name/value label attached to a test result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// One materialized test result. Owned by the store; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub full_name: Option<String>,
    pub status: TestStatus,
    /// Duration in milliseconds.
    pub duration: Option<u64>,
    pub environment: Option<String>,
    pub history_id: Option<String>,
    /// Hidden results are superseded retries.
    pub hidden: bool,
    pub labels: Vec<Label>,
}

impl TestResult {
    /// Create a visible result with the given id, name, and status.
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            ..Self::default()
        }
    }

    pub fn with_history_id(mut self, history_id: impl Into<String>) -> Self {
        self.history_id = Some(history_id.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(Label {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Full name when present, else the short name.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }

    /// Non-empty environment name, if any.
    pub fn environment_name(&self) -> Option<&str> {
        self.environment.as_deref().filter(|env| !env.is_empty())
    }
}
