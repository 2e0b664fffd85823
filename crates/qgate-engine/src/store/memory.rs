//! In-memory result store.

use std::sync::{PoisonError, RwLock};

use qgate_core::types::{KnownTestFailure, TestResult};
use rustc_hash::FxHashMap;

use super::ResultStore;

#[derive(Debug, Default)]
struct Inner {
    results: Vec<TestResult>,
    by_id: FxHashMap<String, usize>,
    known_issues: Vec<KnownTestFailure>,
}

/// Thread-safe store filled by the ingestion side while the gate reads it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known_issues(known_issues: Vec<KnownTestFailure>) -> Self {
        let store = Self::new();
        store.set_known_issues(known_issues);
        store
    }

    /// Insert a result. A result with an existing id replaces it in place and
    /// the replaced one is returned.
    pub fn insert(&self, result: TestResult) -> Option<TestResult> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.by_id.get(&result.id).copied() {
            Some(index) => Some(std::mem::replace(&mut inner.results[index], result)),
            None => {
                let index = inner.results.len();
                inner.by_id.insert(result.id.clone(), index);
                inner.results.push(result);
                None
            }
        }
    }

    pub fn set_known_issues(&self, known_issues: Vec<KnownTestFailure>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .known_issues = known_issues;
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for InMemoryStore {
    fn test_result_by_id(&self, id: &str) -> Option<TestResult> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_id.get(id).map(|&index| inner.results[index].clone())
    }

    fn all_test_results(&self, include_hidden: bool) -> Vec<TestResult> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .iter()
            .filter(|tr| include_hidden || !tr.hidden)
            .cloned()
            .collect()
    }

    fn all_known_issues(&self) -> Vec<KnownTestFailure> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .known_issues
            .clone()
    }
}
