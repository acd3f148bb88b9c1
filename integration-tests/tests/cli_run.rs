use std::{fs, path::Path};

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const PROVIDER_KEYS: [&str; 4] = [
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
    "XAI_API_KEY",
];

fn contextsweep(home: &Path) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.arg("run")
        .arg("--quiet")
        .arg("-p")
        .arg("contextsweep")
        .arg("--bin")
        .arg("contextsweep")
        .arg("--")
        .env("CONTEXTSWEEP_HOME", home)
        .env("NO_COLOR", "1");
    cmd
}

fn write_inputs(dir: &Path, questions: &str) {
    fs::write(dir.join("questions.jsonl"), questions).unwrap();
    fs::write(
        dir.join("contexts.jsonl"),
        "{\"context\":\"Answer briefly.\",\"category\":\"brief\"}\n",
    )
    .unwrap();
}

fn run_args(cmd: &mut Command, dir: &Path) {
    cmd.arg("run")
        .arg("--questions")
        .arg(dir.join("questions.jsonl"))
        .arg("--contexts")
        .arg(dir.join("contexts.jsonl"))
        .arg("--output")
        .arg(dir.join("out.jsonl"));
}

#[test]
fn missing_questions_file_aborts_without_output() -> Result<()> {
    let temp = tempdir()?;
    let mut cmd = contextsweep(temp.path());
    run_args(&mut cmd, temp.path());

    cmd.arg("--api-key")
        .arg("sk-dummy")
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed to read file"));

    assert!(!temp.path().join("out.jsonl").exists());
    Ok(())
}

#[test]
fn malformed_question_line_aborts_without_output() -> Result<()> {
    let temp = tempdir()?;
    write_inputs(
        temp.path(),
        "{\"question\":\"Q1\",\"category\":\"C1\"}\n{\"question\": oops}\n",
    );
    let mut cmd = contextsweep(temp.path());
    run_args(&mut cmd, temp.path());

    cmd.arg("--api-key")
        .arg("sk-dummy")
        .assert()
        .failure()
        .stdout(predicate::str::contains("line 2"));

    assert!(!temp.path().join("out.jsonl").exists());
    Ok(())
}

#[test]
fn missing_api_key_names_the_variable() -> Result<()> {
    let temp = tempdir()?;
    write_inputs(temp.path(), "{\"question\":\"Q1\",\"category\":\"C1\"}\n");
    let mut cmd = contextsweep(temp.path());
    for key in PROVIDER_KEYS {
        cmd.env_remove(key);
    }
    run_args(&mut cmd, temp.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("ANTHROPIC_API_KEY"));

    Ok(())
}

#[test]
fn api_key_is_read_from_home_env_file() -> Result<()> {
    let temp = tempdir()?;
    fs::write(temp.path().join(".env"), "export OPENAI_API_KEY='sk-from-file'\n")?;
    let mut cmd = contextsweep(temp.path());
    for key in PROVIDER_KEYS {
        cmd.env_remove(key);
    }
    run_args(&mut cmd, temp.path());

    // The key resolves, so the run gets as far as loading the (absent) inputs.
    cmd.arg("--llm-provider")
        .arg("openai")
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed to read file"))
        .stdout(predicate::str::contains("Missing API key").not());

    Ok(())
}

#[test]
fn disabling_every_pass_is_rejected() -> Result<()> {
    let temp = tempdir()?;
    let mut cmd = contextsweep(temp.path());
    run_args(&mut cmd, temp.path());

    cmd.arg("--skip-context-pass")
        .arg("--api-key")
        .arg("sk-dummy")
        .assert()
        .failure()
        .stdout(predicate::str::contains("at least one"));

    Ok(())
}

#[test]
fn invalid_config_file_is_reported() -> Result<()> {
    let temp = tempdir()?;
    let config_path = temp.path().join("sweep.yaml");
    fs::write(&config_path, "max_tokens: 0\n")?;
    let mut cmd = contextsweep(temp.path());
    run_args(&mut cmd, temp.path());

    cmd.arg("--config")
        .arg(&config_path)
        .arg("--api-key")
        .arg("sk-dummy")
        .assert()
        .failure()
        .stdout(predicate::str::contains("max_tokens must be > 0"));

    Ok(())
}

#[test]
fn oversized_retry_delay_is_rejected() -> Result<()> {
    let temp = tempdir()?;
    let mut cmd = contextsweep(temp.path());
    run_args(&mut cmd, temp.path());

    cmd.arg("--max-delay-secs")
        .arg("1e20")
        .arg("--api-key")
        .arg("sk-dummy")
        .assert()
        .failure()
        .stdout(predicate::str::contains("max_delay_secs"));

    assert!(!temp.path().join("out.jsonl").exists());
    Ok(())
}

#[test]
fn each_context_is_reported_at_the_default_level() -> Result<()> {
    let temp = tempdir()?;
    write_inputs(temp.path(), "{\"question\":\"Q1\",\"category\":\"C1\"}\n");
    let mut cmd = contextsweep(temp.path());
    run_args(&mut cmd, temp.path());

    // The dummy key is refused (or the host is unreachable), so the single
    // attempt fails after the pair has been announced.
    cmd.arg("--api-key")
        .arg("sk-dummy")
        .arg("--max-attempts")
        .arg("1")
        .env_remove("RUST_LOG")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Processing context"))
        .stdout(predicate::str::contains("brief"));

    assert!(!temp.path().join("out.jsonl").exists());
    Ok(())
}
