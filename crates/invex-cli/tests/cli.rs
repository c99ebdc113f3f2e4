use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn invex(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invex").unwrap();
    cmd.current_dir(home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home)
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("MODEL_NAME")
        .env_remove("DATABASE_URL");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    invex(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_schema_is_strict_json_schema() {
    let home = TempDir::new().unwrap();
    let output = invex(home.path()).arg("schema").output().unwrap();
    assert!(output.status.success());

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["additionalProperties"], false);
    assert_eq!(schema["properties"]["items"]["type"], "array");
}

#[test]
fn test_config_init_get_set() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("invex.json");
    let config = config.to_str().unwrap();

    invex(home.path())
        .args(["-c", config, "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    invex(home.path())
        .args(["-c", config, "config", "get", "llm.model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-4o-mini"));

    invex(home.path())
        .args(["-c", config, "config", "set", "database.max_connections", "2"])
        .assert()
        .success();

    invex(home.path())
        .args(["-c", config, "config", "get", "database.max_connections"])
        .assert()
        .success()
        .stdout(predicate::str::diff("2\n"));

    invex(home.path())
        .args(["-c", config, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_rejects_unknown_and_invalid() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("invex.json");
    let config = config.to_str().unwrap();

    invex(home.path())
        .args(["-c", config, "config", "set", "llm.colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    invex(home.path())
        .args(["-c", config, "config", "set", "database.url", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("database.url must not be empty"));
}

#[test]
fn test_config_path_uses_user_config_dir() {
    let home = TempDir::new().unwrap();
    invex(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("invex"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn test_process_missing_file() {
    let home = TempDir::new().unwrap();
    invex(home.path())
        .args(["process", "missing.pdf"])
        .env("OPENAI_API_KEY", "sk-test")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_without_api_key() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("invoice.pdf"), b"%PDF-1.4").unwrap();

    invex(home.path())
        .args(["process", "invoice.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_process_unreadable_pdf_stops_before_storage() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("invoice.pdf"), b"this is not a pdf").unwrap();
    let db = home.path().join("invoices.db");

    invex(home.path())
        .args(["process", "invoice.pdf", "--format", "json"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", "http://127.0.0.1:9")
        .env("DATABASE_URL", format!("sqlite://{}?mode=rwc", db.display()))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("empty document"));

    assert!(!db.exists());
}

#[test]
fn test_process_rejects_empty_model_name() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("invoice.pdf"), b"%PDF-1.4").unwrap();

    invex(home.path())
        .args(["process", "invoice.pdf"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("MODEL_NAME", "")
        .assert()
        .failure()
        .stderr(predicate::str::contains("llm.model must not be empty"));
}

#[test]
fn test_process_failure_is_reported_once() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("invoice.pdf"), b"this is not a pdf").unwrap();

    let output = invex(home.path())
        .args(["process", "invoice.pdf"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("DATABASE_URL", "sqlite::memory:")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("empty document").count(), 1, "{}", stderr);
}
