pub mod config;
pub mod dlq;
pub mod enqueue;
pub mod list;
pub mod status;
pub mod worker;

use std::sync::Arc;

use jobq_core::{ControlApi, JobStore, Paths};

/// Opens the Store at `paths` and wraps it in a `ControlApi`. Shared by every
/// subcommand except the pure `config` ones, which never touch the Store.
pub async fn control_api(paths: &Paths) -> anyhow::Result<ControlApi> {
    let store = jobq_sqlite::SqliteJobStore::connect(paths.db_path()).await?;
    let store: Arc<dyn JobStore> = Arc::new(store);
    Ok(ControlApi::new(store, paths.clone()))
}
