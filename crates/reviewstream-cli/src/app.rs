//! Process setup shared by both binaries

use crate::cli::ConfigOverrides;
use crate::config::AppConfig;
use anyhow::Context;
use reviewstream_classifiers::default_classifier;
use reviewstream_core::Error;
use reviewstream_engine::distributed::{run_worker, DEFAULT_FRAME_CAPACITY};
use reviewstream_engine::{
    Mode, Pipeline, PipelineReport, ShutdownHandle, Strategy, StrategyCore, WebSocketSource,
};
use reviewstream_telemetry::{instruments, FileSink, ThroughputCounter};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Initialize tracing/logging. Workers log to stderr because their stdout
/// carries frames.
pub fn init_tracing(verbose: bool, to_stderr: bool) {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("reviewstream=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reviewstream=info"))
    };

    let writer = if to_stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer))
        .init();
}

/// Describe the pipeline metrics and, when `addr` is set, serve them for
/// Prometheus
pub fn init_metrics(addr: Option<SocketAddr>) -> anyhow::Result<()> {
    if let Some(addr) = addr {
        use metrics_exporter_prometheus::PrometheusBuilder;

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;
        info!("Metrics exporter listening on http://{}", addr);
    }
    instruments::describe();
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Trigger `shutdown` on the first signal
pub fn spawn_signal_listener(shutdown: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.token().cancelled() => {}
            _ = shutdown_signal() => {
                warn!("Shutdown signal received, stopping...");
                shutdown.trigger("signal");
            }
        }
    })
}

/// Strategy state writing samples to the throughput file for `mode`
pub fn build_core(config: &AppConfig, mode: Mode) -> anyhow::Result<StrategyCore> {
    std::fs::create_dir_all(&config.output.dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.dir.display()
        )
    })?;
    let path = config.output_path(mode);
    info!("Writing throughput samples to {}", path.display());

    let counter = ThroughputCounter::new(Arc::new(FileSink::new(path)));
    Ok(StrategyCore::new(counter, config.tick_interval()))
}

/// Connect to the feed and run the pipeline until the feed closes, the
/// timeout expires, or a signal arrives
pub async fn run(
    strategy: Arc<dyn Strategy>,
    topics: Vec<String>,
    config: &AppConfig,
    shutdown: &ShutdownHandle,
) -> anyhow::Result<PipelineReport> {
    let timer = shutdown.arm_timeout(config.timeout());
    let signals = spawn_signal_listener(shutdown.clone());

    let outcome = async {
        let connected = tokio::select! {
            _ = shutdown.token().cancelled() => Err(Error::Cancelled),
            source = WebSocketSource::connect(&config.url) => source,
        };
        let mut source = match connected {
            Ok(source) => source,
            Err(e) => {
                // Workers may already be running
                strategy.shutdown().await?;
                return Err(e);
            }
        };
        Pipeline::new(strategy, topics, shutdown)
            .run(&mut source)
            .await
    }
    .await;

    timer.abort();
    signals.abort();
    Ok(outcome?)
}

/// Worker role of the distributed binary: serve frames on stdin/stdout
pub async fn run_worker_process(rank: usize, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    init_tracing(overrides.verbose, true);
    let capacity = overrides.frame_capacity.unwrap_or(DEFAULT_FRAME_CAPACITY);
    let classifier = default_classifier()?;

    // Terminal interrupts reach the whole process group; workers stop on
    // the coordinator's signal only
    let interrupts = tokio::spawn(async move {
        while signal::ctrl_c().await.is_ok() {
            debug!(rank, "Ignoring interrupt, waiting for coordinator");
        }
    });

    let summary = run_worker(
        rank,
        tokio::io::stdin(),
        tokio::io::stdout(),
        classifier,
        capacity,
    )
    .await?;
    interrupts.abort();

    debug!(
        rank,
        processed = summary.processed,
        empty = summary.empty,
        "Worker finished"
    );
    Ok(())
}
