//! ReviewStream Core
//!
//! Core types, traits, and utilities shared across ReviewStream components.
//!
//! This crate provides:
//! - The unit of work flowing through the pipeline (`ReviewItem`)
//! - The five-point sentiment scale and its score conversions
//! - Error types and result handling
//! - Parsing of the inbound message envelope and topic lists

pub mod envelope;
pub mod error;
pub mod types;

pub use envelope::{extract_review_text, extract_topics, subscription_directive};
pub use error::{Error, Result};
pub use types::{ReviewItem, SentimentLabel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::envelope::{extract_review_text, extract_topics};
    pub use crate::error::{Error, Result};
    pub use crate::types::{ReviewItem, SentimentLabel};
}
