//! Inbound message envelope and topic list parsing
//!
//! Every message pushed by the review feed is a JSON object with a single
//! field keyed by topic, whose value is itself a JSON-encoded review:
//!
//! ```text
//! {"music":"{\"reviewerID\":\"A3V5XBBT7OZG5G\",\"reviewText\":\"...\",\"overall\":5.0}"}
//! ```

use serde_json::Value;
use tracing::debug;

/// Field holding the review body inside the nested review document
const REVIEW_TEXT_FIELD: &str = "reviewText";

/// Extract the review text from a raw feed message.
///
/// Returns `None` when the message is empty, either nesting level is not
/// valid JSON, the topic value is not a JSON-encoded string, the review has
/// no string `reviewText` field, or the text is empty.
/// Never fails.
pub fn extract_review_text(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }

    let outer: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Envelope is not valid JSON: {}", e);
            return None;
        }
    };

    let Some((topic, inner)) = outer.as_object().and_then(|fields| fields.iter().next()) else {
        debug!("Envelope has no fields");
        return None;
    };

    let Value::String(encoded) = inner else {
        debug!(topic = %topic, "Review payload is not a JSON-encoded string");
        return None;
    };

    let inner_doc: Value = match serde_json::from_str(encoded) {
        Ok(value) => value,
        Err(e) => {
            debug!(topic = %topic, "Review payload is not valid JSON: {}", e);
            return None;
        }
    };

    let Some(Value::String(text)) = inner_doc.get(REVIEW_TEXT_FIELD) else {
        debug!(topic = %topic, "Review has no textual reviewText field");
        return None;
    };

    if text.is_empty() {
        None
    } else {
        Some(text.clone())
    }
}

/// Split a comma and/or whitespace separated topic list into trimmed,
/// non-empty topic names, preserving order.
pub fn extract_topics(topics: &str) -> Vec<String> {
    topics
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Subscription directive sent to the feed for one topic
pub fn subscription_directive(topic: &str) -> String {
    format!("topic:{}", topic.trim())
}
