//! The thin surface the CLI binary talks to. One method per CLI subcommand;
//! everything below this is the Store, the Supervisor, or the filesystem.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::config::{Config, RawConfig};
use crate::error::StoreError;
use crate::job::{Counts, DeadJob, Job, JobSpec, JobState};
use crate::lockfile::{self, LockFile};
use crate::store::JobStore;
use crate::supervisor::{Supervisor, SupervisorError};

/// Where a `ControlApi` keeps its state, rooted at the per-user directory
/// (`~/.jobq` by default, overridable via `JOBQ_HOME`).
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
}

impl Paths {
    pub fn resolve(home_override: Option<PathBuf>) -> Self {
        let home = home_override
            .or_else(|| std::env::var_os("JOBQ_HOME").map(PathBuf::from))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".jobq")
            });
        Paths { home }
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.json")
    }

    pub fn db_path(&self) -> PathBuf {
        self.home.join("queue.db")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.home.join("worker.pid")
    }
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("command must not be empty")]
    EmptyCommand,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("failed to persist configuration: {0}")]
    Config(#[from] std::io::Error),
}

/// Liveness + job-queue summary returned by `status`.
#[derive(Debug, Clone)]
pub struct Status {
    pub worker_pid: Option<libc::pid_t>,
    pub counts: Counts,
}

pub struct ControlApi {
    store: Arc<dyn JobStore>,
    paths: Paths,
    raw_config: RawConfig,
}

impl ControlApi {
    pub fn new(store: Arc<dyn JobStore>, paths: Paths) -> Self {
        let raw_config = RawConfig::load(&paths.config_path());
        ControlApi {
            store,
            paths,
            raw_config,
        }
    }

    pub fn config(&self) -> Config {
        self.raw_config.typed()
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Resolves the JOB_JSON contract (id generation, max_retries fallback)
    /// and forwards the resolved fields to the Store.
    pub async fn enqueue(&self, spec: JobSpec) -> Result<String, ControlError> {
        if spec.command.trim().is_empty() {
            return Err(ControlError::EmptyCommand);
        }
        let id = spec.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let max_retries = spec.max_retries.unwrap_or(self.config().max_retries);
        let id = self.store.enqueue(id, spec.command, max_retries).await?;
        Ok(id)
    }

    pub async fn status(&self) -> Result<Status, ControlError> {
        let lock = LockFile::new(self.paths.pid_path());
        let worker_pid = lock.read_pid().filter(|pid| lockfile::is_process_alive(*pid));
        let counts = self.store.counts().await?;
        Ok(Status { worker_pid, counts })
    }

    pub async fn list(&self, state: JobState) -> Result<Vec<Job>, ControlError> {
        Ok(self.store.list(state).await?)
    }

    pub async fn dlq_list(&self) -> Result<Vec<DeadJob>, ControlError> {
        Ok(self.store.list_dlq().await?)
    }

    pub async fn dlq_retry(&self, id: &str) -> Result<bool, ControlError> {
        Ok(self.store.retry_dlq(id, self.config().max_retries).await?)
    }

    /// Blocking: starts the supervisor and `count` workers in this process.
    pub async fn worker_start(&self, count: usize) -> Result<(), ControlError> {
        let lock = LockFile::new(self.paths.pid_path());
        let supervisor = Supervisor::new(self.store.clone(), self.config(), lock);
        supervisor.start(count).await?;
        Ok(())
    }

    /// Signals a running supervisor via the lock file. Idempotent: a
    /// stopped or never-started supervisor is a no-op.
    pub fn worker_stop(&self) -> bool {
        let lock = LockFile::new(self.paths.pid_path());
        match lock.read_pid() {
            Some(pid) if lockfile::is_process_alive(pid) => lockfile::terminate(pid),
            _ => true,
        }
    }

    pub fn config_get(&self) -> serde_json::Value {
        self.raw_config.as_value()
    }

    pub fn config_set(&mut self, key: &str, value: i64) -> Result<(), ControlError> {
        self.raw_config.set_int(key, value);
        self.raw_config.save(&self.paths.config_path())?;
        Ok(())
    }
}
