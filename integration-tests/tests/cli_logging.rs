use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

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

fn failing_run(cmd: &mut Command, dir: &Path) {
    cmd.arg("run")
        .arg("--questions")
        .arg(dir.join("missing-questions.jsonl"))
        .arg("--contexts")
        .arg(dir.join("missing-contexts.jsonl"))
        .arg("--output")
        .arg(dir.join("out.jsonl"))
        .arg("--api-key")
        .arg("sk-dummy");
}

#[test]
fn default_logging_is_human_readable() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = contextsweep(temp.path());
    failing_run(&mut cmd, temp.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("ERROR"))
        .stdout(predicate::str::contains("Command failed"))
        .stdout(predicate::str::contains("\"level\":").not());
}

#[test]
fn json_logging_flag_emits_json() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = contextsweep(temp.path());
    cmd.arg("--log-json");
    failing_run(&mut cmd, temp.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("\"level\":"));
}

#[test]
fn pretty_logging_is_formatted() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = contextsweep(temp.path());
    cmd.arg("--log-json").arg("--pretty");
    failing_run(&mut cmd, temp.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("{\n"))
        .stdout(predicate::str::contains("\"message\": \"Command failed:"));
}

#[test]
fn verbose_logging_shows_the_sweep_start() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = contextsweep(temp.path());
    cmd.arg("-v");
    failing_run(&mut cmd, temp.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Starting sweep"))
        .stdout(predicate::str::contains(" INFO "));
}

#[test]
fn run_writes_a_json_log_file_beside_the_output() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = contextsweep(temp.path());
    failing_run(&mut cmd, temp.path());
    cmd.assert().failure();

    assert!(!temp.path().join(".contextsweep").exists());
    let logs_dir = temp.path().join("out.logs");
    assert!(
        logs_dir.exists(),
        "Logs directory should be created at {logs_dir:?}"
    );

    let mut found_log = false;
    for entry in std::fs::read_dir(logs_dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|s| s.to_str()) == Some("log") {
            found_log = true;
            let content = std::fs::read_to_string(&path).unwrap();
            assert!(
                content.contains("\"level\":"),
                "Log file should be in JSON format"
            );
            assert!(
                content.contains("Command failed"),
                "Log file should capture the error event"
            );
            assert!(
                content.contains("\"run_id\""),
                "Sweep events should carry the run id"
            );
        }
    }
    assert!(found_log, "Should have found a run log file");
}
