//! Tests for reading results and known issues from disk.

use qgate_core::errors::StoreError;
use qgate_core::types::TestStatus;
use qgate_engine::store::{load_known_issues, read_result_file, result_files};

#[test]
fn test_result_files_are_filtered_and_sorted() {
    let dir = tempfile::TempDir::new().unwrap();
    for name in ["b-result.json", "a-result.json", "c-container.json", "notes.txt"] {
        std::fs::write(dir.path().join(name), "{}").unwrap();
    }
    std::fs::create_dir(dir.path().join("d-result.json")).unwrap();

    let files = result_files(dir.path()).unwrap();
    let names: Vec<&str> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(names, ["a-result.json", "b-result.json"]);
}

#[test]
fn test_result_file_parses_camel_case_fields() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("x-result.json");
    std::fs::write(
        &path,
        r#"{
            "id": "x",
            "name": "login",
            "fullName": "auth.login",
            "status": "broken",
            "duration": 42,
            "historyId": "h1",
            "labels": [{ "name": "suite", "value": "auth" }]
        }"#,
    )
    .unwrap();

    let result = read_result_file(&path).unwrap();
    assert_eq!(result.id, "x");
    assert_eq!(result.status, TestStatus::Broken);
    assert_eq!(result.display_name(), "auth.login");
    assert_eq!(result.history_id.as_deref(), Some("h1"));
    assert!(!result.hidden);
}

#[test]
fn test_known_issues_and_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("known.json");
    std::fs::write(&path, r#"[{ "historyId": "h1", "issues": [] }]"#).unwrap();
    let known = load_known_issues(&path).unwrap();
    assert_eq!(known[0].history_id, "h1");

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(load_known_issues(&path), Err(StoreError::Parse { .. })));

    let missing = dir.path().join("missing");
    assert!(matches!(result_files(&missing), Err(StoreError::Io { .. })));
}
