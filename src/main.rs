use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use job_log_monitor::models::{LogLevel, RunStatus};
use job_log_monitor::viewer::{spawn_poller, PollerPhase, RunLogViewer, ViewerInit};
use job_log_monitor::{Config, HttpJobsApi, JobsApi};

#[derive(Parser)]
#[command(name = "job-log-monitor")]
#[command(about = "Follow and manage scheduled job runs", long_about = None)]
struct Cli {
    /// Base URL of the jobs API; overrides configuration
    #[arg(short, long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show job metadata and default run arguments
    Job {
        #[arg(value_name = "JOB_ID")]
        job_id: Uuid,
    },

    /// Follow the logs of an existing run until it finishes
    Follow {
        #[arg(short, long)]
        job_id: Uuid,

        #[arg(short, long)]
        run_id: Uuid,
    },

    /// Trigger a new manual run and follow its logs
    Trigger {
        #[arg(value_name = "JOB_ID")]
        job_id: Uuid,
    },

    /// Request cancellation of a running execution
    Stop {
        #[arg(short, long)]
        job_id: Uuid,

        #[arg(short, long)]
        run_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "job_log_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config {
            api: Default::default(),
            poller: Default::default(),
        }
    });
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    let api = Arc::new(HttpJobsApi::new(&config.api)?);

    match cli.command {
        Commands::Job { job_id } => show_job(api.as_ref(), job_id).await,
        Commands::Follow { job_id, run_id } => follow_run(api, &config, job_id, run_id).await,
        Commands::Trigger { job_id } => {
            let run = api
                .create_run(job_id)
                .await
                .context("Failed to trigger run")?;
            println!("Triggered run {} of job {}", run.id, job_id);
            follow_run(api, &config, job_id, run.id).await
        }
        Commands::Stop { job_id, run_id } => stop_run(api.as_ref(), job_id, run_id).await,
    }
}

async fn show_job(api: &HttpJobsApi, job_id: Uuid) -> anyhow::Result<()> {
    let job = api.get_job(job_id).await.context("Failed to fetch job")?;

    println!("{}", job.title);
    if let Some(description) = &job.description {
        println!("{}", description);
    }
    if !job.default_args.is_empty() {
        println!("\nDefault arguments:");
        println!("{}", serde_json::to_string_pretty(&job.default_args)?);
    }

    Ok(())
}

async fn stop_run(api: &HttpJobsApi, job_id: Uuid, run_id: Uuid) -> anyhow::Result<()> {
    let run = api
        .get_run(job_id, run_id)
        .await
        .context("Failed to fetch run")?;

    let Some(stop_url) = run.stop_url() else {
        bail!("Run {} does not expose a stop link", run_id);
    };

    api.stop_run(stop_url)
        .await
        .context("Failed to request cancellation")?;
    println!("Requested cancellation of run {}", run_id);

    Ok(())
}

async fn follow_run(
    api: Arc<HttpJobsApi>,
    config: &Config,
    job_id: Uuid,
    run_id: Uuid,
) -> anyhow::Result<()> {
    let run = api
        .get_run(job_id, run_id)
        .await
        .context("Failed to fetch run")?;
    println!("Following run: {} [{}]", run.title, run.status);

    let viewer = Arc::new(
        RunLogViewer::new(
            api,
            ViewerInit {
                run,
                logs: Vec::new(),
                cursor: Vec::new(),
                warnings: Vec::new(),
            },
        )
        .with_poll_interval(Duration::from_millis(config.poller.interval_ms)),
    );

    let poller = spawn_poller(viewer.clone());
    let mut printed = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted; tearing down");
                viewer.shutdown();
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                printed = print_new_lines(&viewer, printed);
                if viewer.phase() == PollerPhase::Stopped {
                    break;
                }
            }
        }
    }

    print_new_lines(&viewer, printed);
    let _ = poller.await;
    print_summary(&viewer);

    Ok(())
}

/// Print log lines accumulated since the last call; returns the new
/// high-water mark
fn print_new_lines(viewer: &RunLogViewer, printed: usize) -> usize {
    let logs = viewer.logs();
    for record in &logs[printed..] {
        println!(
            "[{}] {} {}",
            record.formatted_timestamp, record.level, record.message
        );
    }
    logs.len()
}

fn print_summary(viewer: &RunLogViewer) {
    let run = viewer.run();
    let stats = viewer.stats();

    for warning in viewer.warnings() {
        println!("warning: {}", warning.message);
    }
    if let Some(error) = viewer.last_error() {
        println!("error: {}", error);
    }

    println!();
    match viewer.formatted_started_at() {
        Some(started) => println!(
            "{} [{}] started {} ({} mins)",
            run.title,
            run.status,
            started,
            viewer.run_duration_minutes()
        ),
        None => println!("{} [{}] Not yet started", run.title, run.status),
    }
    if let Some(message) = &run.message {
        if run.status != RunStatus::Failed && run.status != RunStatus::PartialSuccess {
            println!("{}", message);
        } else {
            println!("failure detail: {}", message);
        }
    }
    if stats.error_log_count > 0 {
        println!("{} error(s) found in logs", stats.error_log_count);
    }

    // Grouped view of what each task logged
    let tree = viewer.log_tree();
    if tree.len() > 1 || tree.iter().any(|root| root.children.len() > 1) {
        println!("\nTask breakdown:");
        for root in tree.iter() {
            println!("{} ({})", root.task_name, root.root_task_id);
            for task in &root.children {
                let indent = if task.parent_task_id.is_some() { "    " } else { "  " };
                let errors = task
                    .logs
                    .iter()
                    .filter(|record| record.level == LogLevel::Error)
                    .count();
                println!(
                    "{}{}: {} line(s), {} error(s)",
                    indent, task.task_name, task.logs.len(), errors
                );
            }
        }
    }
}
