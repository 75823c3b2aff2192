//! Ingestion loop and shutdown orchestration

use crate::source::{IngestionSource, CLOSE_REASON};
use crate::strategy::Strategy;
use reviewstream_core::{extract_review_text, Result, ReviewItem};
use reviewstream_telemetry::instruments;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why ingestion stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The feed closed the connection
    FeedClosed,
    /// Timeout or signal
    Cancelled,
    /// The feed failed; logged and treated as the end of input
    Transport(String),
}

/// Counters for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub received: u64,
    pub extracted: u64,
    /// Messages without review text
    pub skipped: u64,
    pub stop: StopReason,
}

/// Cancellation shared by the pipeline, the strategy and the timers
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    cancel: CancellationToken,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn trigger(&self, reason: &str) {
        if !self.cancel.is_cancelled() {
            info!(reason, "Shutdown requested");
            self.cancel.cancel();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel after `after` unless something else cancels first
    pub fn arm_timeout(&self, after: Duration) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    info!("Operation timed out. Terminating...");
                    cancel.cancel();
                }
            }
        })
    }
}

/// Drives one source through one strategy
pub struct Pipeline {
    strategy: Arc<dyn Strategy>,
    topics: Vec<String>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(strategy: Arc<dyn Strategy>, topics: Vec<String>, shutdown: &ShutdownHandle) -> Self {
        Self {
            strategy,
            topics,
            cancel: shutdown.token().clone(),
        }
    }

    pub fn strategy(&self) -> &Arc<dyn Strategy> {
        &self.strategy
    }

    /// Subscribe, feed reviews to the strategy until the feed ends or the
    /// run is cancelled, then shut the strategy down and close the source.
    /// Shutdown and close happen even when ingestion fails.
    pub async fn run(&self, source: &mut dyn IngestionSource) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            received: 0,
            extracted: 0,
            skipped: 0,
            stop: StopReason::FeedClosed,
        };
        let outcome = self.ingest(source, &mut report).await;

        if let Err(e) = self.strategy.shutdown().await {
            warn!(error = %e, "Strategy shutdown failed");
        }
        if let Err(e) = source.close(CLOSE_REASON).await {
            warn!(error = %e, "Failed to close ingestion source");
        }

        report.stop = outcome?;
        info!(
            mode = %self.strategy.mode(),
            received = report.received,
            extracted = report.extracted,
            skipped = report.skipped,
            stop = ?report.stop,
            "Pipeline finished"
        );
        Ok(report)
    }

    async fn ingest(
        &self,
        source: &mut dyn IngestionSource,
        report: &mut PipelineReport,
    ) -> Result<StopReason> {
        self.strategy.subscribe(source, &self.topics).await?;
        let mut next_id = 0u64;

        loop {
            let message = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(StopReason::Cancelled),
                message = source.next_message() => message,
            };

            let message = match message {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("Feed closed");
                    return Ok(StopReason::FeedClosed);
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    return Ok(StopReason::Transport(e.to_string()));
                }
            };
            report.received += 1;

            let Some(text) = extract_review_text(&message) else {
                info!("Review text not found in the message.");
                report.skipped += 1;
                instruments::record_skipped("no_text");
                continue;
            };
            report.extracted += 1;

            let review = ReviewItem::new(next_id, text);
            next_id += 1;
            match self.strategy.handle_review(review).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    debug!("Review handling interrupted by shutdown");
                    return Ok(StopReason::Cancelled);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
