//! Core types for ReviewStream

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// A single review pulled off the ingestion stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Arrival sequence number, unique within one process run
    pub id: u64,

    /// Raw review text
    pub text: String,

    /// Timestamp when this review was received
    pub received_at: SystemTime,
}

impl ReviewItem {
    /// Create a new review item
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            received_at: SystemTime::now(),
        }
    }
}

/// Five-point sentiment scale, ordered from most negative to most positive
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    #[default]
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    /// All labels in score order
    pub const ALL: [SentimentLabel; 5] = [
        Self::VeryNegative,
        Self::Negative,
        Self::Neutral,
        Self::Positive,
        Self::VeryPositive,
    ];

    /// Numeric score on the 0-4 scale
    pub fn score(self) -> u8 {
        match self {
            Self::VeryNegative => 0,
            Self::Negative => 1,
            Self::Neutral => 2,
            Self::Positive => 3,
            Self::VeryPositive => 4,
        }
    }

    /// Label for a numeric score. Anything outside 0-4 is `Neutral`.
    pub fn from_score(score: i64) -> Self {
        match score {
            0 => Self::VeryNegative,
            1 => Self::Negative,
            2 => Self::Neutral,
            3 => Self::Positive,
            4 => Self::VeryPositive,
            _ => Self::Neutral,
        }
    }

    /// Parse a textual label. Unrecognized text maps to `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Very Negative" | "VeryNegative" => Self::VeryNegative,
            "Negative" => Self::Negative,
            "Neutral" => Self::Neutral,
            "Positive" => Self::Positive,
            "Very Positive" | "VeryPositive" => Self::VeryPositive,
            _ => Self::Neutral,
        }
    }

    /// Score for a textual label, `2` when the label is not recognized
    pub fn label_to_score(label: &str) -> u8 {
        Self::from_label(label).score()
    }

    /// Human-readable label text
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryNegative => "Very Negative",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Positive => "Positive",
            Self::VeryPositive => "Very Positive",
        }
    }

    /// Length in bytes of the longest label text
    pub fn max_label_len() -> usize {
        Self::ALL.iter().map(|l| l.as_str().len()).max().unwrap_or(0)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_score_label_roundtrip() {
        for label in SentimentLabel::ALL {
            assert_eq!(SentimentLabel::from_score(label.score() as i64), label);
            assert_eq!(SentimentLabel::from_label(label.as_str()), label);
        }
    }

    #[test]
    fn test_unrecognized_label_is_neutral() {
        assert_eq!(SentimentLabel::label_to_score("ecstatic"), 2);
        assert_eq!(SentimentLabel::label_to_score(""), 2);
        assert_eq!(SentimentLabel::from_label("very positive"), SentimentLabel::Neutral);
    }

    #[test]
    fn test_ordering_follows_score() {
        assert!(SentimentLabel::VeryNegative < SentimentLabel::Negative);
        assert!(SentimentLabel::Positive < SentimentLabel::VeryPositive);
        assert_eq!(SentimentLabel::max_label_len(), "Very Negative".len());
    }

    proptest! {
        #[test]
        fn test_out_of_range_score_is_neutral(score in prop_oneof![i64::MIN..0i64, 5i64..i64::MAX]) {
            prop_assert_eq!(SentimentLabel::from_score(score), SentimentLabel::Neutral);
        }
    }
}
