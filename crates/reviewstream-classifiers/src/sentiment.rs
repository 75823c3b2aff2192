//! Lexicon-based five-point sentiment classifier
//!
//! Each sentence is scored on the 0-4 scale from weighted lexicon hits, and
//! the review's label is the rounded mean of its sentence scores. A negator
//! directly before a hit ("not good", "never disappointed") flips its weight.

use crate::classifier::{ClassificationResult, Classifier};
use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use reviewstream_core::{Error, Result, SentimentLabel};
use std::time::Instant;

const STRONG_POSITIVE: &[&str] = &[
    "excellent",
    "amazing",
    "wonderful",
    "fantastic",
    "awesome",
    "best",
    "love",
    "loved",
    "perfect",
    "outstanding",
];

const POSITIVE: &[&str] = &[
    "good", "great", "nice", "happy", "like", "liked", "enjoyed", "recommend", "pleased", "fun",
];

const NEGATIVE: &[&str] = &[
    "bad",
    "poor",
    "sad",
    "disappointed",
    "disappointing",
    "boring",
    "dislike",
    "mediocre",
    "broken",
    "waste",
];

const STRONG_NEGATIVE: &[&str] = &[
    "terrible", "awful", "hate", "hated", "horrible", "worst", "useless", "angry", "garbage",
    "refund",
];

const NEGATORS: &[&str] = &["not", "never", "no", "don't", "didn't", "isn't", "wasn't"];

pub struct SentimentClassifier {
    name: String,
    lexicon: AhoCorasick,
    weights: Vec<i32>,
    sentence_break: Regex,
}

impl SentimentClassifier {
    pub fn new() -> Result<Self> {
        Self::with_name("sentiment-lexicon")
    }

    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        let mut patterns = Vec::new();
        let mut weights = Vec::new();
        for (words, weight) in [
            (STRONG_POSITIVE, 2),
            (POSITIVE, 1),
            (NEGATIVE, -1),
            (STRONG_NEGATIVE, -2),
        ] {
            patterns.extend_from_slice(words);
            weights.extend(std::iter::repeat(weight).take(words.len()));
        }

        let lexicon = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(patterns)
            .map_err(|e| Error::classifier(format!("Failed to build sentiment lexicon: {e}")))?;

        let sentence_break = Regex::new(r"[.!?;]+")
            .map_err(|e| Error::classifier(format!("Failed to build sentence splitter: {e}")))?;

        Ok(Self {
            name: name.into(),
            lexicon,
            weights,
            sentence_break,
        })
    }

    /// Score one sentence on the 0-4 scale
    fn score_sentence(&self, sentence: &str) -> u8 {
        let net: i32 = self
            .lexicon
            .find_iter(sentence)
            .filter(|m| is_word_boundary(sentence, m.start(), m.end()))
            .map(|m| {
                let weight = self.weights[m.pattern().as_usize()];
                if is_negated(&sentence[..m.start()]) {
                    -weight
                } else {
                    weight
                }
            })
            .sum();

        match net {
            n if n >= 2 => 4,
            1 => 3,
            0 => 2,
            -1 => 1,
            _ => 0,
        }
    }
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back().map_or(true, |c| !is_word_char(c));
    let after = text[end..].chars().next().map_or(true, |c| !is_word_char(c));
    before && after
}

fn is_negated(preceding: &str) -> bool {
    preceding
        .split_whitespace()
        .next_back()
        .map(|w| {
            let w = w.to_ascii_lowercase();
            NEGATORS.contains(&w.as_str())
        })
        .unwrap_or(false)
}

impl Classifier for SentimentClassifier {
    fn classify(&self, text: &str) -> ClassificationResult {
        let start = Instant::now();

        let sentence_scores: Vec<u8> = self
            .sentence_break
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| self.score_sentence(s))
            .collect();

        let mut result = ClassificationResult {
            label: SentimentLabel::Neutral,
            sentence_scores,
            latency_us: 0,
        };

        if let Some(mean) = result.mean_score() {
            result.label = SentimentLabel::from_score((mean + 0.5).floor() as i64);
        }
        result.latency_us = start.elapsed().as_micros() as u64;
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
