use anyhow::{bail, Result};
use jobq_core::Paths;

pub async fn list(paths: &Paths) -> Result<()> {
    let api = super::control_api(paths).await?;
    let jobs = api.dlq_list().await?;

    if jobs.is_empty() {
        println!("DLQ is empty.");
        return Ok(());
    }

    println!("--- DLQ Jobs ({}) ---", jobs.len());
    for job in jobs {
        println!("ID: {} (Failed at: {})", job.id, job.failed_at.to_rfc3339());
        println!("  Cmd: {}", job.command);
        println!("  Attempts: {}", job.attempts);
        println!("{}", "-".repeat(20));
    }

    Ok(())
}

pub async fn retry(paths: &Paths, job_id: &str) -> Result<()> {
    let api = super::control_api(paths).await?;
    if api.dlq_retry(job_id).await? {
        println!("Job {job_id} moved back to queue as 'pending'.");
        Ok(())
    } else {
        bail!("job {job_id} not found in DLQ");
    }
}
