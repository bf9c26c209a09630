//! Job and dead-letter data model.
//!
//! `Job` is the authoritative shape of a row in the `jobs` relation; `DeadJob`
//! mirrors a quarantined snapshot in `dlq`. Both are plain data — the Store
//! owns every mutation, per the ownership rule in the top-level design.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job's position in its lifecycle. `Failed` is re-entrant into the
/// claimable set once `run_at` elapses; `Completed` and dead-letter
/// quarantine are the only terminal sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Failed,
    Completed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Failed => "failed",
            JobState::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "failed" => Ok(JobState::Failed),
            "completed" => Ok(JobState::Completed),
            other => Err(format!("unknown job state '{other}'")),
        }
    }
}

/// A durable row in the `jobs` relation, or an in-memory snapshot of one
/// returned by `claim()`. Authoritative only until the next Store write for
/// this id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub attempts: u32,
    pub max_retries: u32,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quarantined job in the dead-letter relation. Never claimed by workers;
/// only reintroduced into `jobs` by an explicit `retry_dlq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadJob {
    pub id: String,
    pub command: String,
    pub attempts: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
}

/// The caller-facing request to enqueue a job, as decoded from `JOB_JSON`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    pub command: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Point-in-time counts used by `status` and `list`-adjacent reporting.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Counts {
    pub pending: i64,
    pub processing: i64,
    pub failed: i64,
    pub completed: i64,
    pub dlq: i64,
}
