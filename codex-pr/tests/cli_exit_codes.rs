//! CLI tests for the `codex-pr` binary.
//!
//! Spawns the binary with a scrubbed environment and checks that each failure
//! class maps to its exit code.

use std::process::{Command, Output};

use codex_pr::exit_codes;
use codex_pr::test_support::TestRepo;

fn codex_pr(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_codex-pr"));
    cmd.env_clear()
        .current_dir(dir)
        .env("PATH", std::env::var_os("PATH").unwrap_or_default())
        .env("RUST_LOG", "warn");
    cmd
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn missing_inputs_exit_with_configuration_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = codex_pr(temp.path())
        .env("INPUT_PROMPT", "Add a LICENSE file")
        .output()
        .expect("spawn codex-pr");

    assert_eq!(out.status.code(), Some(exit_codes::CONFIGURATION));
    let err = stderr(&out);
    assert!(err.contains("github_token"), "stderr: {err}");
    assert!(err.contains("provider_api_key"), "stderr: {err}");
}

#[test]
fn invalid_config_exits_with_configuration_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("codex-pr.toml");
    std::fs::write(&config, "timeout_secs = 0\n").expect("write config");

    let out = codex_pr(temp.path())
        .env("CODEX_PR_CONFIG", &config)
        .output()
        .expect("spawn codex-pr");

    assert_eq!(out.status.code(), Some(exit_codes::CONFIGURATION));
    assert!(stderr(&out).contains("timeout_secs"), "stderr: {}", stderr(&out));
}

#[test]
fn missing_working_directory_exits_with_configuration_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = codex_pr(temp.path())
        .env("INPUT_WORKING_DIRECTORY", temp.path().join("nope"))
        .output()
        .expect("spawn codex-pr");

    assert_eq!(out.status.code(), Some(exit_codes::CONFIGURATION));
}

#[test]
fn missing_codex_binary_exits_with_generation_code() {
    let repo = TestRepo::new().expect("repo");
    let config = repo.path().join("..").join("codex-pr.toml");
    std::fs::write(&config, "codex_bin = \"codex-pr-test-no-such-binary\"\n")
        .expect("write config");

    let out = codex_pr(repo.path())
        .env("INPUT_GITHUB_TOKEN", "ghs_test")
        .env("INPUT_PROVIDER_API_KEY", "sk-test")
        .env("INPUT_PROMPT", "Add a LICENSE file")
        .env("CODEX_PR_CONFIG", &config)
        .output()
        .expect("spawn codex-pr");

    assert_eq!(out.status.code(), Some(exit_codes::GENERATION));
    assert!(stderr(&out).contains("generation error"), "stderr: {}", stderr(&out));
    assert_eq!(repo.local_branches(), vec!["main".to_string()]);
}
