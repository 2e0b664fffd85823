//! Event bus for qgate.
//! Named channels, synchronous fan-out, windowed batching for item channels.

pub mod bus;
pub mod channel;
pub mod types;

pub use bus::EventBus;
pub use channel::{BatchFuture, BatchOptions, BatchedSubscription, ListenerError, Subscription};
pub use types::{BusChannel, ErrorEvent, ExitCodeEvent};
