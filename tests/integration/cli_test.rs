//! Binary smoke tests.
//!
//! Run the built `sqltutor` binary offline against a config path that does
//! not exist, so defaults apply.

use std::process::Command;

fn run(args: &[&str]) -> (i32, String, String) {
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("config.toml");

    let output = Command::new(env!("CARGO_BIN_EXE_sqltutor"))
        .arg("--config")
        .arg(&config_path)
        .arg("--offline")
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();

    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_classify_allows_select() {
    let (code, stdout, _) = run(&["classify", "SELECT * FROM users"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Allow");
}

#[test]
fn test_classify_rejects_drop() {
    let (code, stdout, _) = run(&["classify", "DROP TABLE users"]);
    assert_eq!(code, 2);
    assert!(stdout.contains("DROP"));
}

#[test]
fn test_evaluate_prints_json() {
    let (code, stdout, stderr) = run(&[
        "evaluate",
        "--sql",
        "SELECT name FROM users WHERE age > 30",
        "--prompt",
        "Names of users older than 30",
        "--expected-sql",
        "SELECT name FROM users WHERE age > 30",
    ]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["is_correct"], true);
    assert_eq!(json["score"], 100);
    assert_eq!(json["feedback"]["source"], "fallback");
    assert_eq!(json["execution"]["status"], "success");
    assert_eq!(json["preview"]["rows"].as_array().unwrap().len(), 3);
}

#[test]
fn test_evaluate_rejected_statement_exits_2() {
    let (code, stdout, stderr) = run(&[
        "evaluate",
        "--sql",
        "UPDATE users SET age = 1",
        "--prompt",
        "Anything",
    ]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Rejected statement"));
}
