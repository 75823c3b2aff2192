//! ReviewStream Classifiers
//!
//! Sentiment classification for streamed reviews.
//!
//! The pipeline treats classification as an opaque, total capability:
//! text in, one of five sentiment labels out. Classifiers are built once per
//! process and shared between threads behind an `Arc<dyn Classifier>`.

pub mod classifier;
pub mod sentiment;

pub use classifier::{ClassificationResult, Classifier};
pub use sentiment::SentimentClassifier;

use std::sync::Arc;

/// Shared handle to a classifier
pub type SharedClassifier = Arc<dyn Classifier>;

/// Build the default classifier for this process
pub fn default_classifier() -> reviewstream_core::Result<SharedClassifier> {
    let classifier = SentimentClassifier::new()?;
    tracing::debug!(classifier = classifier.name(), "Classifier initialized");
    Ok(Arc::new(classifier))
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::sentiment::SentimentClassifier;
    pub use crate::SharedClassifier;
}
