use anyhow::Result;
use jobq_core::Paths;

pub async fn run(paths: &Paths) -> Result<()> {
    let api = super::control_api(paths).await?;
    let status = api.status().await?;

    println!("--- Worker Status ---");
    match status.worker_pid {
        Some(pid) => println!("  Active (pid: {pid})"),
        None => println!("  Stopped"),
    }

    println!("\n--- Job Queue ---");
    let c = status.counts;
    let total = c.pending + c.processing + c.failed + c.completed;
    println!("  Pending: {}", c.pending);
    println!("  Processing: {}", c.processing);
    println!("  Failed: {}", c.failed);
    println!("  Completed: {}", c.completed);
    println!("  Total: {total}");

    println!("\n--- Dead Letter Queue ---");
    println!("  Dead: {}", c.dlq);

    Ok(())
}
