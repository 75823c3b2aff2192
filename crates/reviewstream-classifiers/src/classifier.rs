//! Classifier trait and common types

use reviewstream_core::SentimentLabel;

/// Trait for all sentiment classifiers.
///
/// Classification is total: every input yields a label, `Neutral` when the
/// classifier has nothing to go on. Implementations are shared across worker
/// threads, so they must be safe to call concurrently.
pub trait Classifier: Send + Sync {
    /// Classify the given text
    fn classify(&self, text: &str) -> ClassificationResult;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Shorthand for callers that only need the label
    fn label(&self, text: &str) -> SentimentLabel {
        self.classify(text).label
    }
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Overall label for the text
    pub label: SentimentLabel,

    /// Per-sentence scores (0-4) the label was averaged from
    pub sentence_scores: Vec<u8>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a result with a label and no sentence detail
    pub fn new(label: SentimentLabel) -> Self {
        Self {
            label,
            sentence_scores: Vec::new(),
            latency_us: 0,
        }
    }

    /// Mean of the sentence scores, `None` when there were no sentences
    pub fn mean_score(&self) -> Option<f32> {
        if self.sentence_scores.is_empty() {
            None
        } else {
            let sum: u32 = self.sentence_scores.iter().map(|&s| s as u32).sum();
            Some(sum as f32 / self.sentence_scores.len() as f32)
        }
    }
}
