//! Result store collaborator: the engine's read-only view of test results.

pub mod files;
pub mod memory;

use qgate_core::errors::StoreError;
use qgate_core::types::{KnownTestFailure, TestResult};

pub use files::{load_known_issues, read_result_file, result_files};
pub use memory::InMemoryStore;

/// Read access to materialized test results and known issues.
///
/// The engine never mutates a store.
pub trait ResultStore: Send + Sync {
    fn test_result_by_id(&self, id: &str) -> Option<TestResult>;

    /// Like [`ResultStore::test_result_by_id`], but a missing id is an error.
    fn require_test_result(&self, id: &str) -> Result<TestResult, StoreError> {
        self.test_result_by_id(id)
            .ok_or_else(|| StoreError::UnknownResult { id: id.to_string() })
    }

    /// Results in insertion order. Hidden results (superseded retries) only on request.
    fn all_test_results(&self, include_hidden: bool) -> Vec<TestResult>;

    fn all_known_issues(&self) -> Vec<KnownTestFailure>;
}
