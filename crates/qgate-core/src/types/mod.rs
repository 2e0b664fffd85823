//! Data model shared across the workspace.

pub mod known_issue;
pub mod quality_gate;
pub mod ruleset;
pub mod test_result;

pub use known_issue::{KnownIssueIndex, KnownTestFailure};
pub use quality_gate::{rule_names, Accumulator, RuleExpectation, RuleValue, ValidationResult};
pub use ruleset::{RuleEntry, Ruleset, RulesetFilter, TestFilter};
pub use test_result::{Label, TestResult, TestStatus};
