//! Runs one job's shell command with a wall-clock timeout and reports a
//! three-valued outcome. The distinction between `Failed` and `TimedOut` is
//! preserved only for logging — both feed the retry policy identically.

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed(String),
    TimedOut,
}

/// Launches a single job's `command` under `/bin/sh -c`, enforcing a hard
/// wall-clock timeout.
pub struct Executor {
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Executor {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Executor { timeout }
    }

    /// Runs `command`, killing the whole process group on timeout.
    pub async fn run(&self, command: &str) -> Outcome {
        let mut builder = Command::new("sh");
        builder
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Run the shell in its own process group so a timeout can kill the
        // whole subtree, not just the immediate `sh`.
        unsafe {
            builder.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = match builder.spawn() {
            Ok(child) => child,
            Err(e) => return Outcome::Failed(format!("failed to spawn command: {e}")),
        };

        let pgid = child.id().map(|pid| pid as libc::pid_t);

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                if status.success() {
                    Outcome::Ok
                } else if let Some(signal) = status.signal() {
                    Outcome::Failed(format!("killed by signal {signal}"))
                } else {
                    Outcome::Failed(format!(
                        "exited with status {}",
                        status.code().unwrap_or(-1)
                    ))
                }
            }
            Ok(Err(e)) => Outcome::Failed(format!("failed to wait on child: {e}")),
            Err(_) => {
                if let Some(pgid) = pgid {
                    // SAFETY: best-effort signal to the process group we
                    // created above via setsid(); failure is not fatal.
                    unsafe {
                        libc::kill(-pgid, libc::SIGKILL);
                    }
                }
                let _ = child.wait().await;
                Outcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_ok() {
        let executor = Executor::default();
        assert_eq!(executor.run("true").await, Outcome::Ok);
    }

    #[tokio::test]
    async fn nonzero_exit_reports_failed() {
        let executor = Executor::default();
        match executor.run("false").await {
            Outcome::Failed(_) => {}
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let executor = Executor::new(Duration::from_millis(50));
        assert_eq!(executor.run("sleep 5").await, Outcome::TimedOut);
    }
}
