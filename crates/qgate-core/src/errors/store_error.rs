//! Result store errors.

use std::path::PathBuf;

use super::error_code::{self, QgateErrorCode};

/// Errors raised while loading results or known issues into a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unknown test result: {id}")]
    UnknownResult { id: String },
}

impl QgateErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        error_code::STORE_ERROR
    }
}
