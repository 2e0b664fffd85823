//! Quality gate engine.
//!
//! Evaluates ordered rulesets against batches of test results, keeps
//! per-rule accumulators between incremental passes, and wires batched
//! test-result events to the evaluator so a run can fail fast.

pub mod evaluator;
pub mod realtime;
pub mod rules;
pub mod state;
pub mod store;

pub use evaluator::{evaluate, QualityGate, QualityGateOutcome, ValidateParams};
pub use realtime::{RealtimeOptions, RealtimeQualityGate};
pub use rules::{QualityGateRule, RuleCatalog, RuleInput, RuleOutcome};
pub use state::{QualityGateState, StateSlot};
pub use store::{InMemoryStore, ResultStore};
