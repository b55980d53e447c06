//! Spindle CLI - in-memory demo of the job queue.
//!
//! `spindle demo` defers a batch of demo jobs and runs a worker group (plus
//! the reaper and GC loops) until SIGINT or SIGTERM, or until the queue is
//! idle with `--until-idle`.

mod signals;
mod tasks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spindle_core::app::{GcConfig, GcLoop, ReaperConfig, ReaperLoop};
use spindle_core::domain::JobStatus;
use spindle_core::ports::SystemClock;
use spindle_core::{AppBuilder, InMemoryJobStore, Job, QueueFilter, WorkerConfig};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::signals::ShutdownSignal;
use crate::tasks::{Sleep, Sum};

#[derive(Parser)]
#[command(name = "spindle")]
#[command(about = "Durable multi-worker job queue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo producer and workers against the in-memory store
    Demo {
        /// Number of workers
        #[arg(long, default_value = "2")]
        workers: usize,
        /// Queue to listen on (repeatable); all queues when omitted
        #[arg(long = "queue")]
        queues: Vec<String>,
        /// Idle wait bound in seconds
        #[arg(long)]
        wait_timeout: Option<u64>,
        /// Jobs of each kind to defer
        #[arg(long, default_value = "5")]
        jobs: i64,
        /// Exit once no job is left to run
        #[arg(long)]
        until_idle: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle_core=info,spindle_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            workers,
            queues,
            wait_timeout,
            jobs,
            until_idle,
        } => {
            let mut config = WorkerConfig::from_env().context("invalid worker configuration")?;
            if !queues.is_empty() {
                config.queues = QueueFilter::named(queues);
            }
            if let Some(secs) = wait_timeout {
                config.wait_timeout = Duration::from_secs(secs);
            }
            config.validate()?;
            demo(workers, config, jobs, until_idle).await?;
        }
    }

    Ok(())
}

async fn demo(workers: usize, config: WorkerConfig, jobs: i64, until_idle: bool) -> Result<()> {
    let mut signals = ShutdownSignal::install().context("failed to install signal handlers")?;
    let store = Arc::new(InMemoryJobStore::new());
    let app = tasks::register(AppBuilder::new())?
        .expect_tasks(&["sum", "sum_plus_one", "sleep", "random_fail"])
        .store(store.clone())
        .clock(Arc::new(SystemClock))
        .build()?;

    for i in 0..jobs {
        app.defer_task(&Sum { a: i, b: i * 2 }).await?;
        app.defer(Job::new("sum_plus_one").with_arg("a", i).with_arg("b", 1))
            .await?;
        app.defer_task(&Sleep {
            key: format!("k{}", i % 2),
            millis: 50,
        })
        .await?;
        app.defer(Job::new("random_fail")).await?;
    }
    // nobody handles this one
    app.defer(Job::new("does_not_exist")).await?;

    let group = app.spawn_workers(workers, config).await?;
    info!(workers = group.len(), "Workers started");

    let (maintenance_tx, maintenance_rx) = watch::channel(false);
    let reaper = tokio::spawn(
        ReaperLoop::new(store.clone(), ReaperConfig::default()).run(maintenance_rx.clone()),
    );
    let gc = tokio::spawn(GcLoop::new(store.clone(), GcConfig::default()).run(maintenance_rx));

    let stop = group.shutdown_handle();
    if until_idle {
        tokio::select! {
            _ = wait_idle(&store) => info!("Queue is idle"),
            signal = signals.recv() => info!(signal, "Shutdown signal, stopping workers"),
        }
    } else {
        let signal = signals.recv().await;
        info!(signal, "Shutdown signal, stopping workers");
    }
    stop.stop();

    let joined = group.join().await;
    let _ = maintenance_tx.send(true);
    for (name, handle) in [("reaper", reaper), ("gc", gc)] {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(loop_name = name, error = %err, "Maintenance loop failed"),
            Err(err) => warn!(loop_name = name, error = %err, "Maintenance loop panicked"),
        }
    }
    joined?;

    print_counts(&store).await;
    Ok(())
}

/// Polls until no job is `todo` or `doing`.
async fn wait_idle(store: &InMemoryJobStore) {
    loop {
        let counts = store.counts_by_status().await;
        let busy = [JobStatus::Todo, JobStatus::Doing]
            .iter()
            .map(|s| counts.get(s).copied().unwrap_or(0))
            .sum::<usize>();
        if busy == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn print_counts(store: &InMemoryJobStore) {
    let counts = store.counts_by_status().await;
    println!("Jobs by status:");
    for status in [
        JobStatus::Todo,
        JobStatus::Doing,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ] {
        println!("  {:<10} {}", status.as_str(), counts.get(&status).copied().unwrap_or(0));
    }
}
