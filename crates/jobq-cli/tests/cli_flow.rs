//! End-to-end tests driving the `jobq` binary as a subprocess, each against
//! its own temporary `JOBQ_HOME` so runs never interfere with each other.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command as AssertCommand;
use predicates::str::contains;
use tempfile::TempDir;

fn jobq(home: &TempDir) -> AssertCommand {
    let mut cmd = AssertCommand::cargo_bin("jobq").expect("jobq binary should be built for tests");
    cmd.env("JOBQ_HOME", home.path());
    cmd
}

fn jobq_binary_path() -> std::path::PathBuf {
    AssertCommand::cargo_bin("jobq")
        .expect("jobq binary should be built for tests")
        .get_program()
        .into()
}

#[test]
fn enqueue_then_status_shows_pending() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["enqueue", r#"{"command":"true"}"#])
        .assert()
        .success()
        .stdout(contains("Job enqueued with ID:"));

    jobq(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Pending: 1"))
        .stdout(contains("Stopped"));
}

#[test]
fn enqueue_rejects_malformed_json() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["enqueue", "not json"])
        .assert()
        .failure();
}

#[test]
fn enqueue_rejects_missing_command_field() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["enqueue", r#"{"id":"no-command"}"#])
        .assert()
        .failure()
        .stderr(contains("'command' field is required"));
}

#[test]
fn enqueue_rejects_duplicate_id() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["enqueue", r#"{"command":"true","id":"dup-1"}"#])
        .assert()
        .success();

    jobq(&home)
        .args(["enqueue", r#"{"command":"true","id":"dup-1"}"#])
        .assert()
        .failure();
}

#[test]
fn config_set_then_show_round_trips() {
    let home = TempDir::new().unwrap();

    // spec.md §6 mandates the literal underscored token `max_retries`, not
    // clap's kebab-case default — exercise the documented contract exactly.
    jobq(&home)
        .args(["config", "set", "max_retries", "7"])
        .assert()
        .success()
        .stdout(contains("Set max_retries = 7"));

    jobq(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("\"max_retries\": 7"));
}

#[test]
fn dlq_list_reports_empty_by_default() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["dlq", "list"])
        .assert()
        .success()
        .stdout(contains("DLQ is empty."));
}

#[test]
fn dlq_retry_on_unknown_id_is_a_user_error() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["dlq", "retry", "no-such-job"])
        .assert()
        .failure()
        .stderr(contains("not found in DLQ"));
}

#[test]
fn worker_stop_without_a_running_supervisor_is_idempotent() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["worker", "stop"])
        .assert()
        .success()
        .stdout(contains("Workers not running"));
}

/// Scenario 1 from the testable-properties list: enqueue a trivially
/// successful job, start one worker in the background, wait for it to
/// settle, then stop the supervisor from a separate invocation.
#[test]
fn worker_start_drains_queue_and_stops_on_signal() {
    let home = TempDir::new().unwrap();

    jobq(&home)
        .args(["enqueue", r#"{"command":"true"}"#])
        .assert()
        .success();

    let home_path = home.path().to_path_buf();
    let mut supervisor = Command::new(jobq_binary_path())
        .args(["worker", "start", "--count", "1"])
        .env("JOBQ_HOME", &home_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn worker supervisor");

    // Poll status until the job settles, bounded well above the 1s idle
    // wait plus execution time so this isn't flaky under load.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let output = jobq(&home).arg("status").output().unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("Completed: 1") {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "job never completed; last status:\n{stdout}"
        );
        std::thread::sleep(Duration::from_millis(100));
    }

    jobq(&home).args(["worker", "stop"]).assert().success();

    let exit = supervisor
        .wait()
        .expect("failed to wait on worker supervisor");
    assert!(exit.success());

    assert!(!home_path.join("worker.pid").exists());
}
