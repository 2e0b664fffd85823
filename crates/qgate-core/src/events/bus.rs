//! EventBus: explicitly constructed, context-passed publish/subscribe hub.

use std::future::Future;

use super::channel::{BatchOptions, BatchedSubscription, Channel, ListenerError, Subscription};
use super::types::*;
use crate::types::ValidationResult;

/// Multi-channel event bus.
///
/// `send_*` fans out synchronously to every current listener of the channel;
/// each listener sees each emission at most once and the sender gets nothing
/// back. Item channels (test results, fixtures, attachments) also accept
/// batched subscriptions that receive arrays once per window.
///
/// Share it with `Arc<EventBus>`; there is no process-wide instance.
pub struct EventBus {
    test_result: Channel<String>,
    fixture_result: Channel<String>,
    attachment_file: Channel<String>,
    quality_gate_results: Channel<Vec<ValidationResult>>,
    global_error: Channel<ErrorEvent>,
    global_exit_code: Channel<ExitCodeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            test_result: Channel::new(BusChannel::TestResult.as_str()),
            fixture_result: Channel::new(BusChannel::FixtureResult.as_str()),
            attachment_file: Channel::new(BusChannel::AttachmentFile.as_str()),
            quality_gate_results: Channel::new(BusChannel::QualityGateResults.as_str()),
            global_error: Channel::new(BusChannel::GlobalError.as_str()),
            global_exit_code: Channel::new(BusChannel::GlobalExitCode.as_str()),
        }
    }

    // ---- Test results ----
    pub fn send_test_result(&self, id: impl Into<String>) {
        self.test_result.emit(id.into());
    }

    pub fn on_test_result(&self, listener: impl Fn(&String) + Send + Sync + 'static) -> Subscription {
        self.test_result.subscribe(listener)
    }

    pub fn on_test_result_batched<F, Fut>(
        &self,
        listener: F,
        options: BatchOptions,
    ) -> BatchedSubscription<String>
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        self.test_result.subscribe_batched(listener, options)
    }

    // ---- Fixture results ----
    pub fn send_fixture_result(&self, id: impl Into<String>) {
        self.fixture_result.emit(id.into());
    }

    pub fn on_fixture_result(
        &self,
        listener: impl Fn(&String) + Send + Sync + 'static,
    ) -> Subscription {
        self.fixture_result.subscribe(listener)
    }

    pub fn on_fixture_result_batched<F, Fut>(
        &self,
        listener: F,
        options: BatchOptions,
    ) -> BatchedSubscription<String>
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        self.fixture_result.subscribe_batched(listener, options)
    }

    // ---- Attachment files ----
    pub fn send_attachment_file(&self, id: impl Into<String>) {
        self.attachment_file.emit(id.into());
    }

    pub fn on_attachment_file(
        &self,
        listener: impl Fn(&String) + Send + Sync + 'static,
    ) -> Subscription {
        self.attachment_file.subscribe(listener)
    }

    pub fn on_attachment_file_batched<F, Fut>(
        &self,
        listener: F,
        options: BatchOptions,
    ) -> BatchedSubscription<String>
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        self.attachment_file.subscribe_batched(listener, options)
    }

    // ---- Quality gate ----
    pub fn send_quality_gate_results(&self, results: Vec<ValidationResult>) {
        self.quality_gate_results.emit(results);
    }

    pub fn on_quality_gate_results(
        &self,
        listener: impl Fn(&Vec<ValidationResult>) + Send + Sync + 'static,
    ) -> Subscription {
        self.quality_gate_results.subscribe(listener)
    }

    // ---- Run-global signals ----
    pub fn send_global_error(&self, event: ErrorEvent) {
        self.global_error.emit(event);
    }

    pub fn on_global_error(
        &self,
        listener: impl Fn(&ErrorEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.global_error.subscribe(listener)
    }

    pub fn send_global_exit_code(&self, event: ExitCodeEvent) {
        self.global_exit_code.emit(event);
    }

    pub fn on_global_exit_code(
        &self,
        listener: impl Fn(&ExitCodeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.global_exit_code.subscribe(listener)
    }

    // ---- Lifecycle ----

    /// Remove every listener on every channel and cancel all pending batch windows.
    pub fn dispose_all(&self) {
        self.test_result.clear();
        self.fixture_result.clear();
        self.attachment_file.clear();
        self.quality_gate_results.clear();
        self.global_error.clear();
        self.global_exit_code.clear();
    }

    /// Direct plus batched listeners registered on `channel`.
    pub fn listener_count(&self, channel: BusChannel) -> usize {
        match channel {
            BusChannel::TestResult => self.test_result.listener_count(),
            BusChannel::FixtureResult => self.fixture_result.listener_count(),
            BusChannel::AttachmentFile => self.attachment_file.listener_count(),
            BusChannel::QualityGateResults => self.quality_gate_results.listener_count(),
            BusChannel::GlobalError => self.global_error.listener_count(),
            BusChannel::GlobalExitCode => self.global_exit_code.listener_count(),
        }
    }

    /// Batched subscriptions with an open window, across all channels.
    pub fn pending_batches(&self) -> usize {
        self.test_result.pending_batches()
            + self.fixture_result.pending_batches()
            + self.attachment_file.pending_batches()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
