//! CLI tests for the `ap` binary
//!
//! Only commands that need no API key are exercised here.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

use archpilot::domain::PromptKind;

/// `ap` isolated from the user's home, config and logs
fn ap(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("ap");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    ap(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("prompts"));
}

#[test]
fn test_prompts_prints_catalog() {
    let home = TempDir::new().unwrap();
    let mut assert = ap(&home).arg("prompts").assert().success();
    for kind in PromptKind::ALL {
        assert = assert
            .stdout(predicate::str::contains(format!("{}:\n", kind)))
            .stdout(predicate::str::contains(kind.text()));
    }
    assert.stdout(predicate::str::contains("confirm-solution:").and(predicate::str::contains("ConfirmSolution").not()));
}

#[test]
fn test_classify_with_rules() {
    let home = TempDir::new().unwrap();
    let cases = [
        ("yes", "proceed_to_next_phase"),
        ("looks wrong, redo", "revise_current_phase"),
        ("start over", "start_new_query"),
        ("end", "end_session"),
        ("blah", "clarify"),
        ("no problem, go ahead", "proceed_to_next_phase"),
        ("yes, but use a new database", "clarify"),
    ];
    for (reply, label) in cases {
        ap(&home)
            .args(["classify", "--strategy", "rules", reply])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{}\n", label)));
    }
}

#[test]
fn test_classify_llm_without_key_fails() {
    let home = TempDir::new().unwrap();
    ap(&home)
        .args(["classify", "--strategy", "llm", "yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}

#[test]
fn test_local_config_is_picked_up() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".archpilot.yml"), "resolver:\n  strategy: rules\n").unwrap();

    ap(&home)
        .args(["classify", "sure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("proceed_to_next_phase"));
}

#[test]
fn test_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("broken.yml");
    std::fs::write(&path, "pipeline: [not, a, map]\n").unwrap();

    ap(&home)
        .args(["--config", path.to_str().unwrap(), "prompts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
