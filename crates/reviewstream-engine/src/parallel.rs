//! Thread-pool strategy: classify on a bounded handoff pool

use crate::pool::{Dispatch, PoolConfig, ThreadPool};
use crate::source::IngestionSource;
use crate::strategy::{format_result, Mode, Strategy, StrategyCore};
use async_trait::async_trait;
use reviewstream_classifiers::SharedClassifier;
use reviewstream_core::{Error, Result, ReviewItem};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Submits each review to a [`ThreadPool`]. When the pool is saturated the
/// ingestion task classifies the review itself, which stalls ingestion
/// instead of queueing. Results complete in no particular order.
pub struct ParallelStrategy {
    classifier: SharedClassifier,
    core: Arc<StrategyCore>,
    pool: ThreadPool,
}

impl ParallelStrategy {
    pub fn new(classifier: SharedClassifier, core: StrategyCore, pool: PoolConfig) -> Self {
        info!(
            "Running Parallel Mode (core size {}, max pool size {})",
            pool.core_size, pool.max_size
        );
        Self {
            classifier,
            core: Arc::new(core),
            pool: ThreadPool::new(pool),
        }
    }

    pub fn core(&self) -> &StrategyCore {
        &self.core
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }
}

#[async_trait]
impl Strategy for ParallelStrategy {
    fn mode(&self) -> Mode {
        Mode::Parallel
    }

    async fn subscribe(&self, source: &mut dyn IngestionSource, topics: &[String]) -> Result<()> {
        self.core.subscribe(self.mode(), source, topics).await
    }

    async fn handle_review(&self, review: ReviewItem) -> Result<()> {
        if self.core.is_shut_down() {
            debug!(id = review.id, "Dropping review after shutdown");
            return Ok(());
        }

        let classifier = Arc::clone(&self.classifier);
        let core = Arc::clone(&self.core);
        let dispatch = self.pool.execute(move || {
            let label = classifier.label(&review.text);
            core.complete(format_result(&review.text, label));
        });

        if dispatch == Dispatch::Rejected {
            warn!("Review rejected by stopped pool");
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if !self.core.begin_shutdown() {
            return Ok(());
        }

        self.pool.shutdown();
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || pool.join())
            .await
            .map_err(|e| Error::internal(format!("Failed to join pool workers: {e}")))?;

        let stats = self.pool.stats();
        info!(
            completed = stats.completed,
            caller_runs = stats.caller_runs,
            peak_workers = stats.peak_workers,
            "Parallel strategy stopped"
        );
        Ok(())
    }
}
