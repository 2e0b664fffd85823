//! Loading result and known-issue JSON files from disk.

use std::path::{Path, PathBuf};

use qgate_core::constants::RESULT_FILE_SUFFIX;
use qgate_core::errors::StoreError;
use qgate_core::types::{KnownTestFailure, TestResult};

/// `*-result.json` files directly inside `dir`, sorted by file name.
pub fn result_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_result = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(RESULT_FILE_SUFFIX));
        if is_result && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn read_result_file(path: &Path) -> Result<TestResult, StoreError> {
    read_json(path)
}

/// Known issues are a JSON array of `{ "historyId": ... }` records.
pub fn load_known_issues(path: &Path) -> Result<Vec<KnownTestFailure>, StoreError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
