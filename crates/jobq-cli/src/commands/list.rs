use anyhow::Result;
use jobq_core::{JobState, Paths};

pub async fn run(paths: &Paths, state: JobState) -> Result<()> {
    let api = super::control_api(paths).await?;
    let jobs = api.list(state).await?;

    if jobs.is_empty() {
        println!("No jobs found with state: {state}");
        return Ok(());
    }

    for job in jobs {
        println!("ID: {} (Attempts: {})", job.id, job.attempts);
        println!("  Cmd: {}", job.command);
        println!("  Updated: {}", job.updated_at.to_rfc3339());
        println!("{}", "-".repeat(20));
    }

    Ok(())
}
