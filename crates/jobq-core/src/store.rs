//! The `JobStore` trait: the one seam between the worker loop / Control API
//! and a durable backend. Generalizes the teacher's Postgres-specific job
//! store into a backend-agnostic contract; `jobq-sqlite` supplies the one
//! body this workspace ships.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::job::{Counts, DeadJob, Job, JobState};

/// Durable, transactional job and DLQ persistence.
///
/// `claim` is the single correctness fulcrum of the whole system: it must be
/// linearizable with respect to every other write to `jobs`, so that no two
/// callers ever observe the same id as claimed.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job with `state = pending`, `attempts = 0`,
    /// `run_at = now`. Fails with `StoreError::DuplicateId` if `id` already
    /// exists in either `jobs` or `dlq`.
    ///
    /// `id` and `max_retries` must already be resolved by the caller — id
    /// generation (when the caller omits one) and the `spec.max_retries ??
    /// config.max_retries` fallback are Control API responsibilities, not
    /// the Store's (see the JOB_JSON contract).
    async fn enqueue(&self, id: String, command: String, max_retries: u32) -> Result<String, StoreError>;

    /// Atomically claims the oldest eligible job (`created_at` ascending,
    /// ties broken by `id`) whose `state` is `pending` or `failed` and whose
    /// `run_at` has elapsed, setting its state to `processing`. Returns
    /// `None` if no such job exists, or if the write lock could not be
    /// acquired within a bounded wait — backend contention is never
    /// propagated as an error.
    async fn claim(&self) -> Result<Option<Job>, StoreError>;

    /// Marks a job completed. A no-op if the row was already removed.
    async fn complete(&self, id: &str) -> Result<(), StoreError>;

    /// Marks a job failed and schedules its next claimable attempt.
    async fn schedule_retry(
        &self,
        id: &str,
        new_attempts: u32,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically moves a job snapshot into the dead-letter relation and
    /// deletes the corresponding `jobs` row.
    async fn move_to_dlq(&self, job: &Job) -> Result<(), StoreError>;

    /// Atomically reintroduces a dead-lettered job as a fresh pending job,
    /// preserving its original `created_at`. Returns `false` if `id` is not
    /// in the DLQ.
    async fn retry_dlq(&self, id: &str, max_retries: u32) -> Result<bool, StoreError>;

    /// Lists all jobs in a given state, oldest first.
    async fn list(&self, state: JobState) -> Result<Vec<Job>, StoreError>;

    /// Lists all dead-lettered jobs, oldest-quarantined first.
    async fn list_dlq(&self) -> Result<Vec<DeadJob>, StoreError>;

    /// Point-in-time counts across all job states plus the DLQ.
    async fn counts(&self) -> Result<Counts, StoreError>;

    /// Reclaims jobs stuck in `processing` whose `updated_at` predates
    /// `older_than`, returning them to `pending`. Not part of the original
    /// claim/settle contract; run once by the Supervisor at startup to bound
    /// how long a crashed worker can strand a job (see design notes on the
    /// flagged visibility-timeout gap). Returns the number of jobs reclaimed.
    async fn reclaim_stale(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;
}
