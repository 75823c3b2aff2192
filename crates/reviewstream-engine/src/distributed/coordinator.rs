//! Coordinator side of the distributed strategy

use super::frame::{Frame, SHUTDOWN_SENTINEL};
use super::link::WorkerGroup;
use super::round::Round;
use crate::source::IngestionSource;
use crate::strategy::{max_result_overhead, Mode, Strategy, StrategyCore};
use async_trait::async_trait;
use reviewstream_core::{Error, Result, ReviewItem};
use reviewstream_telemetry::instruments::{self, ROUNDS, ROUND_LATENCY_US};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Time workers get to exit after the shutdown signal
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct CoordinatorState {
    workers: WorkerGroup,
    batch: Vec<ReviewItem>,
}

/// Batches reviews and runs one lock-step round per full batch
pub struct DistributedStrategy {
    state: Mutex<CoordinatorState>,
    core: StrategyCore,
    worker_count: usize,
    capacity: usize,
    grace: Duration,
    rounds: AtomicU64,
    cancel: CancellationToken,
}

impl DistributedStrategy {
    /// `cancel` interrupts an in-flight round; shutdown also fires it.
    pub fn new(
        workers: WorkerGroup,
        core: StrategyCore,
        capacity: usize,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let worker_count = workers.worker_count();
        if worker_count == 0 {
            return Err(Error::config("Distributed mode needs at least one worker"));
        }
        info!("Running Distributed Mode with {} workers", worker_count);

        Ok(Self {
            state: Mutex::new(CoordinatorState {
                workers,
                batch: Vec::with_capacity(worker_count),
            }),
            core,
            worker_count,
            capacity,
            grace: DEFAULT_SHUTDOWN_GRACE,
            rounds: AtomicU64::new(0),
            cancel: cancel.child_token(),
        })
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn core(&self) -> &StrategyCore {
        &self.core
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Rounds completed so far
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    /// Whether a review may enter a batch
    fn admit(&self, review: &ReviewItem) -> bool {
        let text = review.text.trim();
        if text == SHUTDOWN_SENTINEL {
            warn!(id = review.id, "Skipping review equal to the shutdown sentinel");
            instruments::record_skipped("sentinel");
            return false;
        }
        if review.text.len() + max_result_overhead() > self.capacity {
            warn!(
                id = review.id,
                len = review.text.len(),
                capacity = self.capacity,
                "Skipping review too long for a worker frame"
            );
            instruments::record_skipped("oversized");
            return false;
        }
        true
    }

    async fn run_round(&self, state: &mut CoordinatorState) -> Result<()> {
        let batch = std::mem::take(&mut state.batch);
        info!("Distributing {} reviews.", batch.len());

        let started = Instant::now();
        let results = Round::new(batch).run(&mut state.workers, &self.cancel).await?;

        for slot in results {
            match slot.result {
                Some(line) => {
                    info!("Review and Sentiment (Worker {}): {}", slot.rank, line);
                    self.core.deliver(line);
                }
                None => warn!("No result received from worker {}", slot.rank),
            }
        }

        self.rounds.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(ROUNDS).increment(1);
        ::metrics::histogram!(ROUND_LATENCY_US).record(started.elapsed().as_micros() as f64);
        Ok(())
    }
}

#[async_trait]
impl Strategy for DistributedStrategy {
    fn mode(&self) -> Mode {
        Mode::Distributed
    }

    async fn subscribe(&self, source: &mut dyn IngestionSource, topics: &[String]) -> Result<()> {
        self.core.subscribe(self.mode(), source, topics).await
    }

    async fn handle_review(&self, review: ReviewItem) -> Result<()> {
        if self.core.is_shut_down() {
            debug!(id = review.id, "Dropping review after shutdown");
            return Ok(());
        }
        if !self.admit(&review) {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        state.batch.push(review);
        if state.batch.len() < self.worker_count {
            return Ok(());
        }

        self.run_round(&mut state).await.map_err(|e| {
            if !e.is_cancelled() {
                error!(error = %e, "Distribution round failed");
            }
            e
        })
    }

    async fn shutdown(&self) -> Result<()> {
        if !self.core.begin_shutdown() {
            return Ok(());
        }
        self.cancel.cancel();

        let mut state = self.state.lock().await;
        if !state.batch.is_empty() {
            info!(dropped = state.batch.len(), "Dropping reviews of incomplete batch");
            state.batch.clear();
        }

        info!("Sending shutdown signal to {} workers", self.worker_count);
        for rank in 1..=state.workers.worker_count() {
            let link = state.workers.link_mut(rank)?;
            match tokio::time::timeout(self.grace, link.send(Frame::shutdown())).await {
                Ok(Ok(())) => debug!(rank, "Shutdown signal sent"),
                Ok(Err(e)) => warn!(rank, error = %e, "Failed to send shutdown signal"),
                Err(_) => warn!(rank, "Timed out sending shutdown signal"),
            }
        }

        state.workers.wait(self.grace).await;
        info!(rounds = self.rounds(), "Distributed strategy stopped");
        Ok(())
    }
}
