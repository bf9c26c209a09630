use anyhow::{bail, Context, Result};
use jobq_core::{JobSpec, Paths};
use serde_json::Value;

pub async fn run(paths: &Paths, job_json: &str) -> Result<()> {
    let value: Value = serde_json::from_str(job_json).context("invalid JSON string")?;

    if !value
        .get("command")
        .map(Value::is_string)
        .unwrap_or(false)
    {
        bail!("'command' field is required and must be a string");
    }

    let spec: JobSpec = serde_json::from_value(value).context("invalid job JSON")?;

    let api = super::control_api(paths).await?;
    let id = api.enqueue(spec).await?;
    println!("Job enqueued with ID: {id}");
    Ok(())
}
