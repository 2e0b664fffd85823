//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "QGATE_LOG";

/// Initialize qgate logging.
///
/// Reads `QGATE_LOG` for per-module log levels, e.g.
/// `QGATE_LOG=qgate_engine::realtime=debug,qgate_core::events=trace`.
/// Falls back to `qgate=info` when unset or invalid. Logs go to stderr so
/// they never mix with machine-readable stdout.
///
/// Idempotent: later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("qgate=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    });
}
