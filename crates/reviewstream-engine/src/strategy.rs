//! Execution strategy abstraction
//!
//! A strategy owns the classification stage of the pipeline. All three
//! variants present the same surface to the ingestion loop: subscribe,
//! hand over one review at a time, shut down once.

use crate::source::IngestionSource;
use async_trait::async_trait;
use reviewstream_core::{Error, Result, ReviewItem, SentimentLabel};
use reviewstream_telemetry::ThroughputCounter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

const RESULT_PREFIX: &str = "Review: ";
const RESULT_SEPARATOR: &str = " | Sentiment: ";

/// Format the per-review result line
pub fn format_result(text: &str, label: SentimentLabel) -> String {
    format!("{}{}{}{}", RESULT_PREFIX, text, RESULT_SEPARATOR, label)
}

/// Bytes a result line adds on top of the review text, worst case
pub fn max_result_overhead() -> usize {
    RESULT_PREFIX.len() + RESULT_SEPARATOR.len() + SentimentLabel::max_label_len()
}

/// Which execution strategy services the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sequential,
    Parallel,
    Distributed,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Distributed => "distributed",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            "distributed" => Ok(Self::Distributed),
            other => Err(Error::config(format!(
                "Invalid mode '{other}'. Please use 'sequential', 'parallel' or 'distributed'."
            ))),
        }
    }
}

/// Classification stage of the pipeline
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Which variant this is
    fn mode(&self) -> Mode;

    /// Subscribe the source to `topics` and start throughput accounting
    async fn subscribe(&self, source: &mut dyn IngestionSource, topics: &[String]) -> Result<()>;

    /// Process one extracted review
    async fn handle_review(&self, review: ReviewItem) -> Result<()>;

    /// Stop accounting and release execution resources. Calling it again is
    /// a no-op.
    async fn shutdown(&self) -> Result<()>;
}

/// State every strategy carries: the throughput counter, the optional
/// result channel, and the shutdown latch.
pub struct StrategyCore {
    counter: ThroughputCounter,
    tick_interval: Duration,
    results: Option<mpsc::UnboundedSender<String>>,
    shut_down: AtomicBool,
}

impl StrategyCore {
    pub fn new(counter: ThroughputCounter, tick_interval: Duration) -> Self {
        Self {
            counter,
            tick_interval,
            results: None,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Also forward every result line to `results`
    pub fn with_results(mut self, results: mpsc::UnboundedSender<String>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn counter(&self) -> &ThroughputCounter {
        &self.counter
    }

    /// Start the counter, then send one directive per topic
    pub async fn subscribe(
        &self,
        mode: Mode,
        source: &mut dyn IngestionSource,
        topics: &[String],
    ) -> Result<()> {
        self.counter.start(self.tick_interval);
        info!(mode = %mode, topics = ?topics, "Subscribing to topics");
        source.subscribe(topics).await
    }

    /// Log a result line, forward it, and count it
    pub fn complete(&self, line: String) {
        info!("{}", line);
        self.deliver(line);
    }

    /// Forward and count a result line the caller has already logged
    pub fn deliver(&self, line: String) {
        if let Some(results) = &self.results {
            // Receiver may be gone, results are best-effort
            let _ = results.send(line);
        }
        self.counter.increment();
    }

    /// Flip the shutdown latch. Returns `true` only for the first caller.
    pub fn begin_shutdown(&self) -> bool {
        let first = !self.shut_down.swap(true, Ordering::SeqCst);
        if first {
            self.counter.stop();
        } else {
            debug!("Shutdown already performed");
        }
        first
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
