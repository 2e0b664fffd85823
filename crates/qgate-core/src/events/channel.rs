//! A single named channel: direct listeners plus windowed batching subscriptions.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::constants::DEFAULT_BATCH_TIMEOUT_MS;
use crate::traits::{Cancellable, CancellationToken};

/// Error type a batched listener may return. It is logged, never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a batched listener.
pub type BatchFuture = Pin<Box<dyn Future<Output = Result<(), ListenerError>> + Send>>;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type BatchListener<T> = Arc<dyn Fn(Vec<T>) -> BatchFuture + Send + Sync>;

/// Options for a batched subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Window length, measured from the first item of the window.
    pub max_timeout: Duration,
}

impl BatchOptions {
    pub fn with_max_timeout(max_timeout: Duration) -> Self {
        Self { max_timeout }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_timeout: Duration::from_millis(DEFAULT_BATCH_TIMEOUT_MS),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by a direct subscription.
///
/// Dropping the handle keeps the listener registered, matching the
/// fire-and-forget style of most producers. Call [`Subscription::unsubscribe`]
/// to remove exactly this listener.
#[must_use = "call unsubscribe() to remove the listener"]
pub struct Subscription {
    remove: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.remove)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}

#[derive(Debug)]
struct WindowState<T> {
    buffer: Vec<T>,
    /// Generation of the open window, if a timer is pending.
    pending: Option<u64>,
    generation: u64,
}

/// Per-subscription batching machinery.
///
/// A window opens on the first item and closes `max_timeout` later; later
/// arrivals join the open window without extending it. Deliveries of one
/// subscription never overlap and arrive in window order.
pub(crate) struct Batcher<T> {
    channel: &'static str,
    state: Mutex<WindowState<T>>,
    listener: BatchListener<T>,
    options: BatchOptions,
    token: CancellationToken,
    delivery: tokio::sync::Mutex<()>,
}

impl<T: Send + 'static> Batcher<T> {
    fn new(channel: &'static str, listener: BatchListener<T>, options: BatchOptions) -> Self {
        Self {
            channel,
            state: Mutex::new(WindowState {
                buffer: Vec::new(),
                pending: None,
                generation: 0,
            }),
            listener,
            options,
            token: CancellationToken::new(),
            delivery: tokio::sync::Mutex::new(()),
        }
    }

    fn push(self: &Arc<Self>, item: T) {
        if self.token.is_cancelled() {
            return;
        }
        let opened = {
            let mut state = lock(&self.state);
            state.buffer.push(item);
            if state.pending.is_some() {
                None
            } else {
                state.generation += 1;
                state.pending = Some(state.generation);
                Some(state.generation)
            }
        };
        if let Some(generation) = opened {
            self.start_window(generation);
        }
    }

    fn start_window(self: &Arc<Self>, generation: u64) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // Items stay buffered; the next push or an explicit flush retries.
                error!(channel = self.channel, "batched subscription needs a Tokio runtime");
                lock(&self.state).pending = None;
                return;
            }
        };
        let batcher = Arc::clone(self);
        handle.spawn(async move {
            tokio::select! {
                _ = batcher.token.cancelled() => {
                    trace!(channel = batcher.channel, generation, "batch window cancelled");
                }
                _ = tokio::time::sleep(batcher.options.max_timeout) => {
                    if let Some(batch) = batcher.take(Some(generation)) {
                        batcher.deliver(batch).await;
                    }
                }
            }
        });
    }

    /// Snapshot and clear the buffer. With a generation, only if that window is still open.
    fn take(&self, generation: Option<u64>) -> Option<Vec<T>> {
        let mut state = lock(&self.state);
        if generation.is_some() && state.pending != generation {
            return None;
        }
        state.pending = None;
        if state.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut state.buffer))
        }
    }

    async fn deliver(&self, batch: Vec<T>) {
        let _guard = self.delivery.lock().await;
        if self.token.is_cancelled() {
            return;
        }
        let size = batch.len();
        debug!(channel = self.channel, size, "delivering batch");
        // Own task, so a panicking listener surfaces as a JoinError here.
        let listener = Arc::clone(&self.listener);
        match tokio::spawn(async move { listener(batch).await }).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(channel = self.channel, size, %error, "batched listener failed");
            }
            Err(join) if join.is_panic() => {
                warn!(channel = self.channel, size, "batched listener panicked");
            }
            Err(join) => {
                warn!(channel = self.channel, size, error = %join, "batched listener was cancelled");
            }
        }
    }

    async fn flush(&self) {
        if let Some(batch) = self.take(None) {
            self.deliver(batch).await;
        }
    }

    /// Stop delivering. Buffered items are discarded.
    fn cancel(&self) {
        self.token.cancel();
        let mut state = lock(&self.state);
        let dropped = state.buffer.len();
        state.buffer.clear();
        state.pending = None;
        if dropped > 0 {
            debug!(channel = self.channel, dropped, "discarded buffered items on cancel");
        }
    }

    fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    fn buffered(&self) -> usize {
        lock(&self.state).buffer.len()
    }
}

/// Handle returned by a batched subscription.
#[must_use = "call unsubscribe() to remove the listener"]
pub struct BatchedSubscription<T> {
    subscription: Subscription,
    batcher: Arc<Batcher<T>>,
}

impl<T: Send + 'static> BatchedSubscription<T> {
    /// Deliver the open window now instead of waiting for its timer.
    pub async fn flush(&self) {
        self.batcher.flush().await;
    }

    /// Items buffered in the open window.
    pub fn buffered(&self) -> usize {
        self.batcher.buffered()
    }

    /// Remove the subscription and cancel its timer. Undelivered items are dropped;
    /// call [`BatchedSubscription::flush`] first to keep them.
    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}

impl<T> fmt::Debug for BatchedSubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchedSubscription")
            .field("channel", &self.batcher.channel)
            .finish()
    }
}

struct ChannelInner<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
    batchers: Vec<(u64, Arc<Batcher<T>>)>,
}

/// A named publish/subscribe channel carrying payloads of type `T`.
pub(crate) struct Channel<T> {
    name: &'static str,
    inner: Arc<Mutex<ChannelInner<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Channel<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(ChannelInner {
                next_id: 0,
                listeners: Vec::new(),
                batchers: Vec::new(),
            })),
        }
    }

    pub(crate) fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner.listeners.push((id, Arc::new(listener)));
            id
        };
        let inner = Arc::downgrade(&self.inner);
        Subscription {
            remove: Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    lock(&inner).listeners.retain(|(lid, _)| *lid != id);
                }
            }),
        }
    }

    pub(crate) fn subscribe_batched<F, Fut>(
        &self,
        listener: F,
        options: BatchOptions,
    ) -> BatchedSubscription<T>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let listener: BatchListener<T> =
            Arc::new(move |batch| -> BatchFuture { Box::pin(listener(batch)) });
        let batcher = Arc::new(Batcher::new(self.name, listener, options));
        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner.batchers.push((id, Arc::clone(&batcher)));
            id
        };
        let inner = Arc::downgrade(&self.inner);
        let owned = Arc::clone(&batcher);
        BatchedSubscription {
            subscription: Subscription {
                remove: Box::new(move || {
                    if let Some(inner) = inner.upgrade() {
                        lock(&inner).batchers.retain(|(bid, _)| *bid != id);
                    }
                    owned.cancel();
                }),
            },
            batcher,
        }
    }

    /// Fan out to every current listener. Listeners run outside the channel lock,
    /// so they may subscribe or unsubscribe reentrantly.
    pub(crate) fn emit(&self, payload: T) {
        let (listeners, batchers): (Vec<Listener<T>>, Vec<Arc<Batcher<T>>>) = {
            let inner = lock(&self.inner);
            (
                inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
                inner.batchers.iter().map(|(_, b)| Arc::clone(b)).collect(),
            )
        };

        for listener in &listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(&payload);
            }));
            if result.is_err() {
                warn!(channel = self.name, "listener panicked");
            }
        }
        for batcher in &batchers {
            batcher.push(payload.clone());
        }
    }

    /// Remove all listeners and cancel every batched subscription.
    pub(crate) fn clear(&self) {
        let batchers = {
            let mut inner = lock(&self.inner);
            inner.listeners.clear();
            std::mem::take(&mut inner.batchers)
        };
        for (_, batcher) in batchers {
            batcher.cancel();
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        let inner = lock(&self.inner);
        inner.listeners.len() + inner.batchers.len()
    }

    pub(crate) fn pending_batches(&self) -> usize {
        lock(&self.inner)
            .batchers
            .iter()
            .filter(|(_, b)| b.is_pending())
            .count()
    }
}
