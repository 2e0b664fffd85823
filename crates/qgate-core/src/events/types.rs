//! Event payload types and channel names.

use std::fmt;

/// Channels carried by the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusChannel {
    TestResult,
    FixtureResult,
    AttachmentFile,
    QualityGateResults,
    GlobalError,
    GlobalExitCode,
}

impl BusChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TestResult => "test-result",
            Self::FixtureResult => "fixture-result",
            Self::AttachmentFile => "attachment-file",
            Self::QualityGateResults => "quality-gate-results",
            Self::GlobalError => "global-error",
            Self::GlobalExitCode => "global-exit-code",
        }
    }

    pub fn all() -> &'static [BusChannel] {
        &[
            Self::TestResult,
            Self::FixtureResult,
            Self::AttachmentFile,
            Self::QualityGateResults,
            Self::GlobalError,
            Self::GlobalExitCode,
        ]
    }
}

impl fmt::Display for BusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for `send_global_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
    pub error_code: Option<String>,
}

/// Payload for `send_global_exit_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodeEvent {
    /// Exit code the run should end with.
    pub code: i32,
    /// Exit code of the wrapped process, when one was overridden.
    pub original: Option<i32>,
}
