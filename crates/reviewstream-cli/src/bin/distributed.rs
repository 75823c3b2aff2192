//! ReviewStream, distributed
//!
//! Rank 0 holds the feed connection and batches reviews; ranks `1..=n` are
//! worker processes launched from this same executable that classify one
//! review per round.

use anyhow::{bail, Result};
use clap::Parser;
use reviewstream_cli::app;
use reviewstream_cli::cli::DISTRIBUTED_USAGE_HINT;
use reviewstream_cli::{normalize_args, AppConfig, DistributedCli};
use reviewstream_core::extract_topics;
use reviewstream_engine::distributed::{WorkerCommand, WorkerGroup};
use reviewstream_engine::{DistributedStrategy, Mode, ShutdownHandle};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DistributedCli::parse_from(normalize_args(std::env::args_os()));

    if let Some(rank) = cli.worker_rank {
        return app::run_worker_process(rank, &cli.overrides).await;
    }

    let Some(topics) = cli.topics else {
        println!("{}", DISTRIBUTED_USAGE_HINT);
        return Ok(());
    };

    app::init_tracing(cli.overrides.verbose, false);
    info!("Starting ReviewStream coordinator");

    let config = AppConfig::resolve(&cli.overrides)?;
    let topics = extract_topics(&topics);
    if topics.is_empty() {
        bail!("No topics given");
    }
    app::init_metrics(config.metrics_addr)?;

    let mut command = WorkerCommand::current_exe()?
        .arg("--frame-capacity")
        .arg(config.frame_capacity.to_string());
    if cli.overrides.verbose {
        command = command.arg("--verbose");
    }
    let workers =
        WorkerGroup::spawn_processes(&command, config.worker_count(), config.frame_capacity)?;

    let shutdown = ShutdownHandle::new();
    let core = app::build_core(&config, Mode::Distributed)?;
    let strategy = DistributedStrategy::new(workers, core, config.frame_capacity, shutdown.token())?
        .with_grace(config.shutdown_grace());

    let report = app::run(Arc::new(strategy), topics, &config, &shutdown).await?;
    info!(
        "Stopped after {} messages ({} reviews)",
        report.received, report.extracted
    );
    Ok(())
}
