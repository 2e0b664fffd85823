//! Realtime quality gate: evaluates batched test-result events as they arrive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use qgate_core::constants::EXIT_FAILURE;
use qgate_core::errors::{GateError, QgateErrorCode};
use qgate_core::events::{
    BatchOptions, BatchedSubscription, ErrorEvent, EventBus, ExitCodeEvent, ListenerError,
};
use qgate_core::traits::{Cancellable, CancellationToken};
use qgate_core::types::{KnownTestFailure, TestResult, ValidationResult};
use tracing::{debug, error, info, warn};

use crate::evaluator::{QualityGate, QualityGateOutcome, ValidateParams};
use crate::state::QualityGateState;
use crate::store::ResultStore;

/// Options for [`RealtimeQualityGate::attach`].
#[derive(Debug, Clone, Default)]
pub struct RealtimeOptions {
    pub batch: BatchOptions,
    /// Environment reported in results.
    pub environment: Option<String>,
}

#[derive(Debug, Default)]
struct Status {
    fast_fail_results: Vec<ValidationResult>,
    config_error: Option<GateError>,
    batches: usize,
}

/// Everything the batch listener needs, shared with the handle.
struct Shared {
    gate: Arc<QualityGate>,
    store: Arc<dyn ResultStore>,
    bus: Arc<EventBus>,
    known_issues: Vec<KnownTestFailure>,
    environment: Option<String>,
    state: Mutex<QualityGateState>,
    status: Mutex<Status>,
    abort: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Resolve, filter, and evaluate one batch of ids against the shared state.
    fn process(&self, ids: Vec<String>) -> Result<(), GateError> {
        if self.abort.is_cancelled() {
            debug!(size = ids.len(), "run already aborted; ignoring batch");
            return Ok(());
        }

        let results: Vec<TestResult> = ids
            .iter()
            .filter_map(|id| match self.store.require_test_result(id) {
                Ok(tr) => Some(tr),
                Err(err) => {
                    warn!(error = %err, "skipping announced test result");
                    None
                }
            })
            .filter(|tr| !tr.hidden)
            .collect();

        let outcome = {
            let mut state = lock(&self.state);
            let mut params = ValidateParams::new(&results)
                .known_issues(&self.known_issues)
                .state(&mut state);
            if let Some(env) = self.environment.as_deref() {
                params = params.environment(env);
            }
            self.gate.validate(params)
        };
        lock(&self.status).batches += 1;

        match outcome {
            Ok(outcome) if outcome.fast_failed => {
                warn!(failures = outcome.results.len(), "quality gate fast-failed; aborting run");
                lock(&self.status).fast_fail_results = outcome.results.clone();
                self.bus.send_quality_gate_results(outcome.results);
                self.bus.send_global_exit_code(ExitCodeEvent {
                    code: EXIT_FAILURE,
                    original: None,
                });
                self.abort.cancel();
                Ok(())
            }
            Ok(outcome) => {
                debug!(
                    batch = results.len(),
                    partial_failures = outcome.results.len(),
                    "batch evaluated"
                );
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "quality gate configuration error; aborting run");
                self.bus.send_global_error(ErrorEvent {
                    message: err.to_string(),
                    error_code: Some(err.error_code().to_string()),
                });
                lock(&self.status).config_error = Some(err.clone());
                self.abort.cancel();
                Err(err)
            }
        }
    }
}

/// Incremental quality gate bound to an event bus for the length of one run.
///
/// Each batch of announced result ids is resolved through the store, hidden
/// results are dropped, and the rest are evaluated against one shared
/// [`QualityGateState`]. A fast-fail trip publishes the failures, publishes
/// exit code 1, and cancels [`RealtimeQualityGate::abort_token`]. Partial
/// failures that do not fast-fail are only logged; [`final_validate`] is the
/// authoritative verdict.
///
/// [`final_validate`]: RealtimeQualityGate::final_validate
pub struct RealtimeQualityGate {
    shared: Arc<Shared>,
    subscription: Mutex<Option<BatchedSubscription<String>>>,
}

impl RealtimeQualityGate {
    /// Subscribe to test-result events on `bus`. Known issues are read from the
    /// store once, here.
    pub fn attach(
        bus: Arc<EventBus>,
        store: Arc<dyn ResultStore>,
        gate: Arc<QualityGate>,
        options: RealtimeOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            known_issues: store.all_known_issues(),
            gate,
            store,
            bus: Arc::clone(&bus),
            environment: options.environment,
            state: Mutex::new(QualityGateState::new()),
            status: Mutex::new(Status::default()),
            abort: CancellationToken::new(),
        });

        let listener_shared = Arc::clone(&shared);
        let subscription = bus.on_test_result_batched(
            move |ids| {
                let shared = Arc::clone(&listener_shared);
                async move { shared.process(ids).map_err(ListenerError::from) }
            },
            options.batch,
        );
        info!(
            rulesets = shared.gate.rulesets().len(),
            window_ms = options.batch.max_timeout.as_millis() as u64,
            "realtime quality gate attached"
        );

        Self {
            shared,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Cancelled when the gate fast-fails or hits a configuration error.
    pub fn abort_token(&self) -> CancellationToken {
        self.shared.abort.clone()
    }

    pub fn is_fast_failed(&self) -> bool {
        !lock(&self.shared.status).fast_fail_results.is_empty()
    }

    /// Failures of the batch that tripped fast-fail.
    pub fn fast_fail_results(&self) -> Vec<ValidationResult> {
        lock(&self.shared.status).fast_fail_results.clone()
    }

    pub fn config_error(&self) -> Option<GateError> {
        lock(&self.shared.status).config_error.clone()
    }

    /// Batches evaluated so far.
    pub fn batches_evaluated(&self) -> usize {
        lock(&self.shared.status).batches
    }

    /// Snapshot of the accumulated state.
    pub fn state(&self) -> QualityGateState {
        lock(&self.shared.state).clone()
    }

    /// Evaluate the open window now.
    pub async fn flush(&self) {
        let subscription = lock(&self.subscription).take();
        if let Some(subscription) = subscription {
            subscription.flush().await;
            *lock(&self.subscription) = Some(subscription);
        }
    }

    /// Stop listening. Ids still buffered in the open window are dropped.
    pub fn detach(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
            debug!("realtime quality gate detached");
        }
    }

    /// Authoritative pass over every visible result in the store, without the
    /// running state.
    pub fn final_validate(&self) -> Result<QualityGateOutcome, GateError> {
        let results = self.shared.store.all_test_results(false);
        let mut params = ValidateParams::new(&results).known_issues(&self.shared.known_issues);
        if let Some(env) = self.shared.environment.as_deref() {
            params = params.environment(env);
        }
        self.shared.gate.validate(params)
    }
}

impl Drop for RealtimeQualityGate {
    fn drop(&mut self) {
        self.detach();
    }
}
