use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use jobq_core::JobState;

use crate::commands;

#[derive(Parser)]
#[command(name = "jobq", version, about = "A local durable background job queue", long_about = None)]
pub struct Cli {
    /// Override the per-user state directory (defaults to $JOBQ_HOME or ~/.jobq)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new job to the queue
    Enqueue {
        /// JSON object: {"command": "...", "id"?: "...", "max_retries"?: N}
        job_json: String,
    },

    /// Manage worker processes
    Worker {
        #[command(subcommand)]
        cmd: WorkerCommand,
    },

    /// Show a summary of job states and worker liveness
    Status,

    /// List jobs in a given state
    List {
        #[arg(long)]
        state: JobStateArg,
    },

    /// Manage the dead-letter queue
    Dlq {
        #[command(subcommand)]
        cmd: DlqCommand,
    },

    /// View or set configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Start worker loops (blocking; Ctrl-C for graceful shutdown)
    Start {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Signal a running supervisor to stop
    Stop,
}

#[derive(Subcommand)]
pub enum DlqCommand {
    /// List all dead-lettered jobs
    List,
    /// Move a dead-lettered job back onto the queue as pending
    Retry { job_id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: i64,
    },
    /// Show the current configuration
    Show,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ConfigKey {
    MaxRetries,
    BackoffBase,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::MaxRetries => "max_retries",
            ConfigKey::BackoffBase => "backoff_base",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum JobStateArg {
    Pending,
    Processing,
    Failed,
    Completed,
}

impl From<JobStateArg> for JobState {
    fn from(arg: JobStateArg) -> Self {
        match arg {
            JobStateArg::Pending => JobState::Pending,
            JobStateArg::Processing => JobState::Processing,
            JobStateArg::Failed => JobState::Failed,
            JobStateArg::Completed => JobState::Completed,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let paths = jobq_core::Paths::resolve(self.home);

        match self.command {
            Commands::Enqueue { job_json } => commands::enqueue::run(&paths, &job_json).await,
            Commands::Worker { cmd } => match cmd {
                WorkerCommand::Start { count } => commands::worker::start(&paths, count).await,
                WorkerCommand::Stop => commands::worker::stop(&paths),
            },
            Commands::Status => commands::status::run(&paths).await,
            Commands::List { state } => commands::list::run(&paths, state.into()).await,
            Commands::Dlq { cmd } => match cmd {
                DlqCommand::List => commands::dlq::list(&paths).await,
                DlqCommand::Retry { job_id } => commands::dlq::retry(&paths, &job_id).await,
            },
            Commands::Config { cmd } => match cmd {
                ConfigCommand::Set { key, value } => {
                    commands::config::set(&paths, key.as_str(), value)
                }
                ConfigCommand::Show => commands::config::show(&paths),
            },
        }
    }
}
