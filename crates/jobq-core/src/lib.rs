//! # jobq-core
//!
//! The durable job model, retry policy, executor, worker loop, and
//! supervisor for a local, single-host background job queue.
//!
//! The `JobStore` trait is the one seam between this crate and a concrete
//! backend; `jobq-sqlite` supplies the SQLite-backed implementation this
//! workspace ships.

pub mod config;
pub mod control;
pub mod error;
pub mod executor;
pub mod job;
pub mod lockfile;
pub mod retry;
pub mod store;
pub mod supervisor;
pub mod worker;

pub use config::{Config, RawConfig};
pub use control::{ControlApi, ControlError, Paths, Status};
pub use error::StoreError;
pub use executor::{Executor, Outcome as ExecutorOutcome};
pub use job::{Counts, DeadJob, Job, JobSpec, JobState};
pub use lockfile::LockFile;
pub use retry::Outcome as RetryOutcome;
pub use store::JobStore;
pub use supervisor::{Supervisor, SupervisorError};
pub use worker::WorkerLoop;

pub use async_trait::async_trait;
