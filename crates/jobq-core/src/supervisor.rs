//! Spawns N worker loops, owns the stop signal, writes/removes the lock
//! file, and joins children on shutdown. Does not touch the Store directly.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::executor::Executor;
use crate::lockfile::LockFile;
use crate::store::JobStore;
use crate::worker::WorkerLoop;

/// How stale a `processing` row must be before the Supervisor reclaims it at
/// startup. See the flagged visibility-timeout gap in the design notes.
fn visibility_timeout() -> ChronoDuration {
    ChronoDuration::seconds(300)
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("another worker supervisor is already running (pid {0})")]
    AlreadyRunning(libc::pid_t),
    #[error("failed to write lock file: {0}")]
    LockFile(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] crate::error::StoreError),
}

pub struct Supervisor {
    store: Arc<dyn JobStore>,
    config: Config,
    lock: LockFile,
}

impl Supervisor {
    pub fn new(store: Arc<dyn JobStore>, config: Config, lock: LockFile) -> Self {
        Supervisor {
            store,
            config,
            lock,
        }
    }

    /// Starts `count` worker loops and blocks until a termination signal
    /// arrives and every in-flight job has settled.
    pub async fn start(&self, count: usize) -> Result<(), SupervisorError> {
        if self.lock.holder_is_live() {
            let pid = self.lock.read_pid().expect("holder_is_live implies a pid");
            return Err(SupervisorError::AlreadyRunning(pid));
        }
        self.lock.write_current_pid()?;

        let reclaimed = self
            .store
            .reclaim_stale(Utc::now() - visibility_timeout())
            .await?;
        if reclaimed > 0 {
            warn!(count = reclaimed, "reclaimed stale processing jobs at startup");
        }

        info!(workers = count, pid = std::process::id(), "supervisor starting");

        let stop = CancellationToken::new();
        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let worker = WorkerLoop::new(id, self.store.clone(), self.config, Executor::default());
            let token = stop.clone();
            handles.push(tokio::spawn(worker.run(token)));
        }

        wait_for_shutdown_signal().await;
        info!("shutdown signal received, waiting for in-flight jobs to settle");
        stop.cancel();

        for handle in handles {
            let _ = handle.await;
        }

        self.lock.remove();
        info!("supervisor stopped");
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
