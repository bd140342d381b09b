use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn langchain() -> Command {
    let mut cmd = Command::cargo_bin("langchain").unwrap();
    cmd.env_remove("LANGCHAIN_EXAMPLES_DIR")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY");
    cmd
}

#[test]
fn test_help_lists_commands() {
    langchain()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("examples"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_examples_list_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("anthropic_tool_call_stream.rs"),
        "//! Streams tool calls from Claude.\nfn main() {}\n",
    )
    .unwrap();
    fs::write(dir.path().join("token_buffer_memory.rs"), "fn main() {}\n").unwrap();

    langchain()
        .current_dir(dir.path())
        .args(["examples", "list", "--dir", ".", "--format", "json", "--category", "llm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"anthropic_tool_call_stream\""))
        .stdout(predicate::str::contains("streaming"))
        .stdout(predicate::str::contains("token_buffer_memory").not());
}

#[test]
fn test_examples_list_table_reads_env_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in_memory_vectorstore.rs"), "fn main() {}\n").unwrap();

    langchain()
        .env("LANGCHAIN_EXAMPLES_DIR", dir.path())
        .args(["examples", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_memory_vectorstore"))
        .stdout(predicate::str::contains("vectorstore"));
}

#[test]
fn test_examples_run_unknown() {
    let dir = tempfile::tempdir().unwrap();
    langchain()
        .args(["examples", "run", "nope", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("example 'nope' not found"));
}

#[test]
fn test_init_creates_project() {
    let dir = tempfile::tempdir().unwrap();
    langchain()
        .current_dir(dir.path())
        .args(["init", "demo-app", "--template", "anthropic-llm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created:"))
        .stdout(predicate::str::contains("Next steps:"));

    let manifest = fs::read_to_string(dir.path().join("demo-app/Cargo.toml")).unwrap();
    assert!(manifest.contains("name = \"demo-app\""));

    langchain()
        .current_dir(dir.path())
        .args(["init", "demo-app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "directory 'demo-app' already exists. Use --force to overwrite",
        ));

    langchain()
        .current_dir(dir.path())
        .args(["init", "demo-app", "--force"])
        .assert()
        .success();
}

#[test]
fn test_init_unknown_template() {
    let dir = tempfile::tempdir().unwrap();
    langchain()
        .current_dir(dir.path())
        .args(["init", "x", "--template", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "template 'missing' not found. Available templates: basic-llm, chat-bot, rag-system, anthropic-llm",
        ));
}

#[test]
fn test_validate_quick_without_keys_fails() {
    let dir = tempfile::tempdir().unwrap();
    langchain()
        .current_dir(dir.path())
        .args(["validate", "--quick"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("OPENAI_API_KEY is not set"))
        .stdout(predicate::str::contains("Summary: 0 passed, 2 failed"));
}

#[test]
fn test_validate_quick_with_key() {
    let dir = tempfile::tempdir().unwrap();
    langchain()
        .current_dir(dir.path())
        .env("ANTHROPIC_API_KEY", "sk-ant-test")
        .args(["validate", "--provider", "anthropic", "--quick"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary: 2 passed, 0 failed"));
}
