//! End-to-end tests for the `kbchat` binary.

#![allow(clippy::panic)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kbchat(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kbchat").unwrap_or_else(|e| panic!("binary missing: {e}"));
    cmd.current_dir(dir.path())
        .env("KBCHAT_DB_PATH", dir.path().join("kb.db"))
        .env("KBCHAT_PROMPT_DIR", dir.path().join("prompts"))
        .env_remove("KBCHAT_BACKEND")
        .env_remove("USE_OPENAI")
        .env_remove("OPENAI_API_KEY")
        .env_remove("KBCHAT_API_KEY")
        .env_remove("VECTORSTORE_COLLECTION_NAME")
        .env_remove("PROJECT_NAME")
        .env_remove("RUST_LOG");
    cmd
}

fn temp() -> TempDir {
    TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"))
}

#[test]
fn help_lists_commands() {
    let dir = temp();
    kbchat(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("documents"));
}

#[test]
fn init_creates_database() {
    let dir = temp();
    kbchat(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized kbchat database"));
    assert!(dir.path().join("kb.db").exists());

    kbchat(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn activated_documents_are_listed() {
    let dir = temp();
    kbchat(&dir).arg("init").assert().success();
    kbchat(&dir)
        .args(["documents", "activate", "manual.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activated document: manual.pdf"));
    kbchat(&dir)
        .args(["documents", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("manual.pdf"))
        .stdout(predicate::str::contains("active"));
}

#[test]
fn models_lists_backend_defaults() {
    let dir = temp();
    kbchat(&dir)
        .args(["models", "--backend", "ollama"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemma3:27b"))
        .stdout(predicate::str::contains("mxbai-embed-large:latest"));
    kbchat(&dir)
        .args(["--format", "json", "models", "--backend", "openai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_chat\": \"gpt-4\""));
}

#[test]
fn ask_without_collection_is_a_configuration_error() {
    let dir = temp();
    kbchat(&dir).arg("init").assert().success();
    kbchat(&dir)
        .args(["ask", "what is the warranty period", "--backend", "ollama"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("collection"));
}

#[test]
fn ask_hosted_without_key_fails_cleanly() {
    let dir = temp();
    kbchat(&dir).arg("init").assert().success();
    kbchat(&dir)
        .args(["ask", "what is the warranty period", "--collection", "kb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn prompt_includes_project_text() {
    let dir = temp();
    kbchat(&dir)
        .args(["init-prompts", "--project", "acme"])
        .assert()
        .success();
    kbchat(&dir)
        .args(["prompt", "--project", "acme"])
        .env("KBCHAT_PERSONA", "warranty specialist")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("You are a warranty specialist,"));
}
