//! Sequential strategy: classify inline on the ingestion path

use crate::source::IngestionSource;
use crate::strategy::{format_result, Mode, Strategy, StrategyCore};
use async_trait::async_trait;
use reviewstream_classifiers::SharedClassifier;
use reviewstream_core::{Result, ReviewItem};
use tracing::{debug, info};

/// Classifies each review before the next message is pulled, so the feed
/// is throttled to the classifier's speed.
pub struct SequentialStrategy {
    classifier: SharedClassifier,
    core: StrategyCore,
}

impl SequentialStrategy {
    pub fn new(classifier: SharedClassifier, core: StrategyCore) -> Self {
        info!("Running Sequential Mode");
        Self { classifier, core }
    }

    pub fn core(&self) -> &StrategyCore {
        &self.core
    }
}

#[async_trait]
impl Strategy for SequentialStrategy {
    fn mode(&self) -> Mode {
        Mode::Sequential
    }

    async fn subscribe(&self, source: &mut dyn IngestionSource, topics: &[String]) -> Result<()> {
        self.core.subscribe(self.mode(), source, topics).await
    }

    async fn handle_review(&self, review: ReviewItem) -> Result<()> {
        if self.core.is_shut_down() {
            debug!(id = review.id, "Dropping review after shutdown");
            return Ok(());
        }
        let label = self.classifier.label(&review.text);
        self.core.complete(format_result(&review.text, label));
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if self.core.begin_shutdown() {
            info!("Sequential strategy stopped");
        }
        Ok(())
    }
}
