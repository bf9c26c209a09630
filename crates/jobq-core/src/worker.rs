//! The per-worker cycle: claim → execute → settle. Cooperatively stoppable
//! at exactly the suspension points the design calls out — the claim
//! transaction, the subprocess wait (inside the Executor), and the 1-second
//! idle wait here.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::executor::{Executor, Outcome as ExecOutcome};
use crate::retry::{self, Outcome as RetryOutcome};
use crate::store::JobStore;

const IDLE_WAIT: Duration = Duration::from_secs(1);

/// One worker's main loop. Runs until `stop` is cancelled; a job already in
/// flight always runs to completion or timeout first.
pub struct WorkerLoop {
    pub id: usize,
    store: Arc<dyn JobStore>,
    config: Config,
    executor: Executor,
}

impl WorkerLoop {
    pub fn new(id: usize, store: Arc<dyn JobStore>, config: Config, executor: Executor) -> Self {
        WorkerLoop {
            id,
            store,
            config,
            executor,
        }
    }

    pub async fn run(self, stop: CancellationToken) {
        info!(worker_id = self.id, "worker started");

        loop {
            if stop.is_cancelled() {
                break;
            }

            match self.store.claim().await {
                Ok(Some(job)) => {
                    info!(worker_id = self.id, job_id = %job.id, "claimed job");
                    let outcome = self.executor.run(&job.command).await;
                    self.settle(&job, outcome).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(IDLE_WAIT) => {}
                        _ = stop.cancelled() => break,
                    }
                }
                Err(e) => {
                    error!(worker_id = self.id, error = %e, "claim failed");
                    tokio::select! {
                        _ = tokio::time::sleep(IDLE_WAIT) => {}
                        _ = stop.cancelled() => break,
                    }
                }
            }
        }

        info!(worker_id = self.id, "worker stopped");
    }

    async fn settle(&self, job: &crate::job::Job, outcome: ExecOutcome) {
        match outcome {
            ExecOutcome::Ok => {
                if let Err(e) = self.store.complete(&job.id).await {
                    error!(worker_id = self.id, job_id = %job.id, error = %e, "failed to record completion");
                }
            }
            ExecOutcome::Failed(reason) => self.handle_failure(job, &reason).await,
            ExecOutcome::TimedOut => self.handle_failure(job, "timed out").await,
        }
    }

    async fn handle_failure(&self, job: &crate::job::Job, reason: &str) {
        let new_attempts = job.attempts + 1;
        warn!(
            worker_id = self.id,
            job_id = %job.id,
            attempts = new_attempts,
            reason,
            "job attempt failed"
        );

        match retry::decide(new_attempts, job.max_retries, self.config.backoff_base) {
            RetryOutcome::Retry { delay } => {
                let next_run_at = Utc::now()
                    + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
                if let Err(e) = self
                    .store
                    .schedule_retry(&job.id, new_attempts, next_run_at)
                    .await
                {
                    error!(worker_id = self.id, job_id = %job.id, error = %e, "failed to schedule retry");
                }
            }
            RetryOutcome::GiveUp => {
                let mut dead = job.clone();
                dead.attempts = new_attempts;
                if let Err(e) = self.store.move_to_dlq(&dead).await {
                    error!(worker_id = self.id, job_id = %job.id, error = %e, "failed to move job to dead-letter queue");
                }
            }
        }
    }
}
