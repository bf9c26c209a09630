use anyhow::{bail, Result};
use jobq_core::lockfile;
use jobq_core::{LockFile, Paths};

pub async fn start(paths: &Paths, count: usize) -> Result<()> {
    if count < 1 {
        bail!("must start at least 1 worker");
    }

    let api = super::control_api(paths).await?;
    println!(
        "Starting {count} worker(s) (supervisor pid: {})...",
        std::process::id()
    );
    println!("Press Ctrl-C to stop.");

    if let Err(e) = api.worker_start(count).await {
        bail!("{e}");
    }

    println!("All workers have stopped.");
    Ok(())
}

/// Idempotent: signaling a stopped or never-started supervisor exits
/// cleanly rather than erroring.
pub fn stop(paths: &Paths) -> Result<()> {
    let lock = LockFile::new(paths.pid_path());
    match lock.read_pid() {
        None => println!("Workers not running (no PID file)."),
        Some(pid) if lockfile::is_process_alive(pid) => {
            lockfile::terminate(pid);
            println!("Sent SIGTERM to worker supervisor (pid: {pid}).");
        }
        Some(_) => {
            println!("Worker supervisor not running; removing stale PID file.");
            lock.remove();
        }
    }
    Ok(())
}
