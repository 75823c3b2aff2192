//! ReviewStream
//!
//! Streams product reviews from a WebSocket feed, classifies their
//! sentiment sequentially or on a thread pool, and records how many reviews
//! are analyzed per second.

use anyhow::{bail, Result};
use clap::Parser;
use reviewstream_classifiers::default_classifier;
use reviewstream_cli::app;
use reviewstream_cli::cli::USAGE_HINT;
use reviewstream_cli::report;
use reviewstream_cli::{normalize_args, AppConfig, Cli, Commands, RunArgs};
use reviewstream_core::extract_topics;
use reviewstream_engine::{
    Mode, ParallelStrategy, PoolConfig, SequentialStrategy, ShutdownHandle, Strategy,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    if let Some(Commands::Report { files, json }) = cli.command {
        let reports = report::summarize(&files)?;
        if json {
            println!("{}", report::render_json(&reports)?);
        } else {
            print!("{}", report::render_text(&reports));
        }
        return Ok(());
    }

    let RunArgs {
        mode,
        topics,
        overrides,
    } = cli.run;
    let (Some(mode), Some(topics)) = (mode, topics) else {
        println!("{}", USAGE_HINT);
        return Ok(());
    };

    app::init_tracing(overrides.verbose, false);
    info!("Starting ReviewStream");

    let config = AppConfig::resolve(&overrides)?;
    let topics = extract_topics(&topics);
    if topics.is_empty() {
        bail!("No topics given");
    }
    app::init_metrics(config.metrics_addr)?;

    let classifier = default_classifier()?;
    let core = app::build_core(&config, mode)?;
    let strategy: Arc<dyn Strategy> = match mode {
        Mode::Sequential => Arc::new(SequentialStrategy::new(classifier, core)),
        Mode::Parallel => Arc::new(ParallelStrategy::new(
            classifier,
            core,
            PoolConfig::from_available(),
        )),
        Mode::Distributed => bail!("Distributed mode runs as reviewstream-distributed"),
    };

    let shutdown = ShutdownHandle::new();
    let report = app::run(strategy, topics, &config, &shutdown).await?;
    info!(
        "Stopped after {} messages ({} reviews)",
        report.received, report.extracted
    );
    Ok(())
}
