//! SQLite implementation of the jobq job queue.
//!
//! This crate provides the single production `JobStore` implementation this
//! workspace ships, backed by a single-file SQLite database in WAL mode —
//! durable commits, tolerant of concurrent readers while one writer holds
//! the commit lock.
//!
//! # Features
//!
//! - A short `BEGIN IMMEDIATE` transaction for `claim()`, since SQLite has
//!   no row-level locks or `SELECT … FOR UPDATE SKIP LOCKED`.
//! - Exponential backoff retry logic (delegated to `jobq_core::retry`).
//! - Dead-letter queue for permanently failed jobs.
//! - A startup reclaim pass for jobs stranded in `processing`.
//! - `tracing::debug!` spans around the `claim`/`move_to_dlq`/`retry_dlq`
//!   transactions.
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE jobs (
//!     id TEXT PRIMARY KEY,
//!     command TEXT NOT NULL,
//!     state TEXT NOT NULL DEFAULT 'pending',
//!     attempts INTEGER NOT NULL DEFAULT 0,
//!     max_retries INTEGER NOT NULL DEFAULT 3,
//!     run_at TEXT NOT NULL,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE dlq (
//!     id TEXT PRIMARY KEY,
//!     command TEXT NOT NULL,
//!     state TEXT NOT NULL DEFAULT 'dead',
//!     attempts INTEGER NOT NULL,
//!     max_retries INTEGER NOT NULL,
//!     created_at TEXT NOT NULL,
//!     failed_at TEXT NOT NULL
//! );
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobq_sqlite::SqliteJobStore;
//!
//! let store = SqliteJobStore::connect("/home/me/.jobq/queue.db").await?;
//! ```

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobq_core::{Counts, DeadJob, Job, JobState, JobStore, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// SQLite-backed job store.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

fn backend_err(e: impl Into<anyhow::Error>) -> StoreError {
    StoreError::Backend(e.into())
}

fn is_busy(e: &sqlx::Error) -> bool {
    matches!(
        e.as_database_error().and_then(|d| d.code()).as_deref(),
        Some("5") | Some("6") // SQLITE_BUSY, SQLITE_LOCKED
    )
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false)
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .context("invalid timestamp in store")?
        .with_timezone(&Utc))
}

impl SqliteJobStore {
    /// Opens (creating if absent) the database at `path`, enables WAL mode,
    /// and ensures the schema exists.
    pub async fn connect(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_millis(50));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .context("failed to open queue database")?;

        let store = SqliteJobStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wraps an already-open pool (used by tests against a temp-file DB).
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let store = SqliteJobStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                command TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                run_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dlq (
                id TEXT PRIMARY KEY,
                command TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'dead',
                attempts INTEGER NOT NULL,
                max_retries INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                failed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_claimable ON jobs (run_at) \
             WHERE state IN ('pending', 'failed')",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Job> {
        let state_raw: String = row.try_get("state")?;
        Ok(Job {
            id: row.try_get("id")?,
            command: row.try_get("command")?,
            state: JobState::from_str(&state_raw).map_err(anyhow::Error::msg)?,
            attempts: row.try_get::<i64, _>("attempts")? as u32,
            max_retries: row.try_get::<i64, _>("max_retries")? as u32,
            run_at: parse_ts(&row.try_get::<String, _>("run_at")?)?,
            created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_ts(&row.try_get::<String, _>("updated_at")?)?,
        })
    }

    fn row_to_dead_job(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<DeadJob> {
        Ok(DeadJob {
            id: row.try_get("id")?,
            command: row.try_get("command")?,
            attempts: row.try_get::<i64, _>("attempts")? as u32,
            max_retries: row.try_get::<i64, _>("max_retries")? as u32,
            created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
            failed_at: parse_ts(&row.try_get::<String, _>("failed_at")?)?,
        })
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn enqueue(&self, id: String, command: String, max_retries: u32) -> Result<String, StoreError> {
        let now = fmt_ts(Utc::now());

        let exists_in_dlq: Option<(String,)> =
            sqlx::query_as("SELECT id FROM dlq WHERE id = ?1")
                .bind(&id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend_err)?;
        if exists_in_dlq.is_some() {
            return Err(StoreError::DuplicateId(id));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, command, state, attempts, max_retries, run_at, created_at, updated_at)
            VALUES (?1, ?2, 'pending', 0, ?3, ?4, ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(&command)
        .bind(max_retries)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(id),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateId(id)),
            Err(e) => Err(backend_err(e)),
        }
    }

    async fn claim(&self) -> Result<Option<Job>, StoreError> {
        debug!("claim: opening BEGIN IMMEDIATE transaction");
        let mut conn = self.pool.acquire().await.map_err(backend_err)?;

        if let Err(e) = sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await {
            if is_busy(&e) {
                debug!("claim: write lock unavailable, treating as no job this tick");
                return Ok(None);
            }
            return Err(backend_err(e));
        }

        let now = fmt_ts(Utc::now());
        let selected = sqlx::query(
            r#"
            SELECT id, command, state, attempts, max_retries, run_at, created_at, updated_at
            FROM jobs
            WHERE state IN ('pending', 'failed') AND run_at <= ?1
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(&now)
        .fetch_optional(&mut *conn)
        .await;

        let row = match selected {
            Ok(row) => row,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                if is_busy(&e) {
                    return Ok(None);
                }
                return Err(backend_err(e));
            }
        };

        let Some(row) = row else {
            sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map_err(backend_err)?;
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(backend_err)?;

        let update = sqlx::query("UPDATE jobs SET state = 'processing', updated_at = ?1 WHERE id = ?2")
            .bind(&now)
            .bind(&id)
            .execute(&mut *conn)
            .await;

        if let Err(e) = update {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(backend_err(e));
        }

        sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map_err(backend_err)?;

        let mut job = Self::row_to_job(&row).map_err(backend_err)?;
        job.state = JobState::Processing;
        job.updated_at = parse_ts(&now).map_err(backend_err)?;
        debug!(job_id = %job.id, "claim: transaction committed");
        Ok(Some(job))
    }

    async fn complete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE jobs SET state = 'completed', updated_at = ?1 WHERE id = ?2")
            .bind(fmt_ts(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn schedule_retry(
        &self,
        id: &str,
        new_attempts: u32,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE jobs SET state = 'failed', attempts = ?1, run_at = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(new_attempts)
        .bind(fmt_ts(next_run_at))
        .bind(fmt_ts(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn move_to_dlq(&self, job: &Job) -> Result<(), StoreError> {
        debug!(job_id = %job.id, attempts = job.attempts, "move_to_dlq: opening transaction");
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        sqlx::query(
            r#"
            INSERT INTO dlq (id, command, state, attempts, max_retries, created_at, failed_at)
            VALUES (?1, ?2, 'dead', ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&job.id)
        .bind(&job.command)
        .bind(job.attempts)
        .bind(job.max_retries)
        .bind(fmt_ts(job.created_at))
        .bind(fmt_ts(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;

        sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(&job.id)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;

        tx.commit().await.map_err(backend_err)?;
        debug!(job_id = %job.id, "move_to_dlq: transaction committed");
        Ok(())
    }

    async fn retry_dlq(&self, id: &str, max_retries: u32) -> Result<bool, StoreError> {
        debug!(job_id = %id, "retry_dlq: opening transaction");
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        let row = sqlx::query("SELECT created_at, command FROM dlq WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend_err)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(backend_err)?;
            debug!(job_id = %id, "retry_dlq: no such id in dlq");
            return Ok(false);
        };

        let created_at: String = row.try_get("created_at").map_err(backend_err)?;
        let command: String = row.try_get("command").map_err(backend_err)?;
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO jobs (id, command, state, attempts, max_retries, run_at, created_at, updated_at)
            VALUES (?1, ?2, 'pending', 0, ?3, ?4, ?5, ?4)
            "#,
        )
        .bind(id)
        .bind(&command)
        .bind(max_retries)
        .bind(&now)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;

        sqlx::query("DELETE FROM dlq WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend_err)?;

        tx.commit().await.map_err(backend_err)?;
        debug!(job_id = %id, "retry_dlq: transaction committed");
        Ok(true)
    }

    async fn list(&self, state: JobState) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, command, state, attempts, max_retries, run_at, created_at, updated_at \
             FROM jobs WHERE state = ?1 ORDER BY created_at ASC",
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        rows.iter()
            .map(Self::row_to_job)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(backend_err)
    }

    async fn list_dlq(&self) -> Result<Vec<DeadJob>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, command, attempts, max_retries, created_at, failed_at \
             FROM dlq ORDER BY failed_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        rows.iter()
            .map(Self::row_to_dead_job)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(backend_err)
    }

    async fn counts(&self) -> Result<Counts, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE state = 'pending') as pending,
                COUNT(*) FILTER (WHERE state = 'processing') as processing,
                COUNT(*) FILTER (WHERE state = 'failed') as failed,
                COUNT(*) FILTER (WHERE state = 'completed') as completed
            FROM jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(backend_err)?;

        let dlq_row = sqlx::query("SELECT COUNT(*) as dlq FROM dlq")
            .fetch_one(&self.pool)
            .await
            .map_err(backend_err)?;

        Ok(Counts {
            pending: row.try_get("pending").map_err(backend_err)?,
            processing: row.try_get("processing").map_err(backend_err)?,
            failed: row.try_get("failed").map_err(backend_err)?,
            completed: row.try_get("completed").map_err(backend_err)?,
            dlq: dlq_row.try_get("dlq").map_err(backend_err)?,
        })
    }

    async fn reclaim_stale(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'pending', run_at = ?1, updated_at = ?1
            WHERE state = 'processing' AND updated_at < ?2
            "#,
        )
        .bind(fmt_ts(Utc::now()))
        .bind(fmt_ts(older_than))
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn open_temp_store() -> (tempfile::TempDir, SqliteJobStore) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("queue.db");
        let store = SqliteJobStore::connect(&db_path).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn enqueue_then_claim_round_trips() {
        let (_dir, store) = open_temp_store().await;
        store
            .enqueue("job-1".into(), "true".into(), 3)
            .await
            .unwrap();

        let job = store.claim().await.unwrap().expect("a job should be claimable");
        assert_eq!(job.id, "job-1");
        assert_eq!(job.state, JobState::Processing);
        assert_eq!(job.attempts, 0);

        assert!(store.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let (_dir, store) = open_temp_store().await;
        store.enqueue("dup".into(), "true".into(), 3).await.unwrap();
        let err = store.enqueue("dup".into(), "true".into(), 3).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn failed_job_is_reclaimable_only_after_run_at() {
        let (_dir, store) = open_temp_store().await;
        store.enqueue("job-2".into(), "false".into(), 3).await.unwrap();
        let job = store.claim().await.unwrap().unwrap();

        let future = Utc::now() + chrono::Duration::seconds(60);
        store.schedule_retry(&job.id, 1, future).await.unwrap();
        assert!(store.claim().await.unwrap().is_none());

        let past = Utc::now() - chrono::Duration::seconds(1);
        store.schedule_retry(&job.id, 1, past).await.unwrap();
        let reclaimed = store.claim().await.unwrap().unwrap();
        assert_eq!(reclaimed.attempts, 1);
    }

    #[tokio::test]
    async fn dlq_round_trip_preserves_created_at() {
        let (_dir, store) = open_temp_store().await;
        store.enqueue("job-3".into(), "false".into(), 1).await.unwrap();
        let job = store.claim().await.unwrap().unwrap();
        let created_at = job.created_at;

        let mut dead = job.clone();
        dead.attempts = 1;
        store.move_to_dlq(&dead).await.unwrap();

        let dlq = store.list_dlq().await.unwrap();
        assert_eq!(dlq.len(), 1);
        assert_eq!(dlq[0].created_at, created_at);

        assert!(store.retry_dlq(&job.id, 3).await.unwrap());
        let reclaimed = store.claim().await.unwrap().unwrap();
        assert_eq!(reclaimed.attempts, 0);
        assert_eq!(reclaimed.created_at, created_at);
        assert!(!store.retry_dlq("nonexistent", 3).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_claims_never_double_claim() {
        let (_dir, store) = open_temp_store().await;
        for i in 0..50 {
            store
                .enqueue(format!("job-{i}"), "true".into(), 3)
                .await
                .unwrap();
        }

        let store = Arc::new(store);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                loop {
                    match store.claim().await.unwrap() {
                        Some(job) => claimed.push(job.id),
                        None => break,
                    }
                }
                claimed
            }));
        }

        let mut all_claimed = Vec::new();
        for handle in handles {
            all_claimed.extend(handle.await.unwrap());
        }

        all_claimed.sort();
        all_claimed.dedup();
        assert_eq!(all_claimed.len(), 50);

        let counts: Counts = store.counts().await.unwrap();
        assert_eq!(counts.processing, 50);
    }
}
