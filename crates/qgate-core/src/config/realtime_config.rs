//! Realtime (incremental) evaluation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_BATCH_TIMEOUT_MS;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Evaluate batches while results arrive. Default: true.
    pub enabled: Option<bool>,
    /// Batch window in milliseconds. Default: 100.
    pub batch_timeout_ms: Option<u64>,
}

impl RealtimeConfig {
    pub fn effective_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn effective_batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms.unwrap_or(DEFAULT_BATCH_TIMEOUT_MS))
    }
}
