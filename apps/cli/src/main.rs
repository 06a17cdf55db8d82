//! Tarmac CLI - drive training pipelines on the batch Job Platform.
//!
//! Provides a `tarmac` command for running full pipeline plans and for
//! direct workspace/job lifecycle operations.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use tarmac_pipeline::{run_pipeline, PipelinePlan};
use tarmac_platform::{JobSpec, PlatformClient, PlatformConfig, PollPolicy};

/// Tarmac - batch training pipeline orchestration
#[derive(Parser, Debug)]
#[command(
    name = "tarmac",
    author,
    version,
    about = "Run multi-stage training pipelines on a batch job platform"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Platform configuration file (TOML); falls back to TARMAC_* env vars
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a pipeline plan start to finish
    Run {
        /// Pipeline plan file (TOML)
        #[arg(long)]
        plan: PathBuf,
    },

    /// Workspace operations
    #[command(subcommand)]
    Workspace(WorkspaceCommand),

    /// Direct job lifecycle operations
    #[command(subcommand)]
    Job(JobCommand),
}

#[derive(Subcommand, Debug)]
enum WorkspaceCommand {
    /// Look up a workspace by name, creating it if missing
    Ensure { name: String },

    /// List files in a workspace (flat, capped at --page-size entries)
    Files {
        id: String,
        #[arg(long, default_value_t = 800)]
        page_size: u32,
    },
}

#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Submit a job from a spec file (TOML) and print its ID
    Submit {
        #[arg(long)]
        spec: PathBuf,
    },

    /// Print a job's current status
    Status { id: String },

    /// Block until a job reaches a terminal state
    Wait {
        id: String,
        /// Seconds between status queries
        #[arg(long, default_value_t = 15)]
        interval: u64,
        /// Give up after this many status queries (default: wait forever)
        #[arg(long)]
        max_attempts: Option<u64>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PlatformConfig> {
    match path {
        Some(path) => PlatformConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => PlatformConfig::from_env()
            .context("no --config given and TARMAC_* environment variables are incomplete"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = Level::from_str(&args.log_level)
        .with_context(|| format!("invalid log level '{}'", args.log_level))?;
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(args.config.as_ref())?;
    let client = PlatformClient::new(config);

    match args.command {
        Command::Run { plan } => {
            let contents = std::fs::read_to_string(&plan)
                .with_context(|| format!("failed to read plan {}", plan.display()))?;
            let plan: PipelinePlan =
                toml::from_str(&contents).context("failed to parse pipeline plan")?;
            let ctx = run_pipeline(&client, &plan).await?;
            for stage in plan.stage_sequence() {
                let outcome: tarmac_pipeline::StageOutcome = ctx.get(stage.task_id())?;
                if outcome.skipped {
                    println!("{stage}: skipped (output already present)");
                } else {
                    println!(
                        "{stage}: {} (job {})",
                        outcome.status.map_or_else(|| "unknown".to_string(), |s| s.to_string()),
                        outcome.job_id.as_deref().unwrap_or("-"),
                    );
                }
            }
        }

        Command::Workspace(WorkspaceCommand::Ensure { name }) => {
            let workspace = client.ensure_workspace(&name).await?;
            println!("{} {}", workspace.id, workspace.name);
        }

        Command::Workspace(WorkspaceCommand::Files { id, page_size }) => {
            let entries = client.list_files(&id, page_size).await?;
            for entry in &entries {
                println!("{}", entry.name);
            }
            if entries.len() as u32 == page_size {
                eprintln!("note: listing capped at {page_size} entries; more may exist");
            }
        }

        Command::Job(JobCommand::Submit { spec }) => {
            let contents = std::fs::read_to_string(&spec)
                .with_context(|| format!("failed to read spec {}", spec.display()))?;
            let spec: JobSpec = toml::from_str(&contents).context("failed to parse job spec")?;
            let job = client.submit_job(&spec).await?;
            println!("{}", job.id);
        }

        Command::Job(JobCommand::Status { id }) => {
            let status = client.job_status(&id).await?;
            println!("{status}");
        }

        Command::Job(JobCommand::Wait { id, interval, max_attempts }) => {
            let policy = PollPolicy { interval: Duration::from_secs(interval), max_attempts };
            let status = client.wait_for_job(&id, &policy).await?;
            println!("{status}");
            if !matches!(status, tarmac_platform::JobStatus::FinishedSuccess) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
