//! Metric names recorded through the `metrics` facade
//!
//! Recording is a no-op until a recorder is installed (the binaries install a
//! Prometheus exporter when a metrics address is configured).

/// Reviews whose classification completed
pub const REVIEWS_ANALYZED: &str = "reviewstream_reviews_analyzed_total";

/// Reviews dropped before classification (no text, oversized, empty result)
pub const REVIEWS_SKIPPED: &str = "reviewstream_reviews_skipped_total";

/// Completed distribution rounds
pub const ROUNDS: &str = "reviewstream_rounds_total";

/// Wall time of one distribution round, dispatch to drain
pub const ROUND_LATENCY_US: &str = "reviewstream_round_latency_us";

/// Register descriptions for every metric above
pub fn describe() {
    ::metrics::describe_counter!(REVIEWS_ANALYZED, "Total number of reviews classified");
    ::metrics::describe_counter!(
        REVIEWS_SKIPPED,
        "Total number of reviews skipped before or after classification"
    );
    ::metrics::describe_counter!(ROUNDS, "Total number of completed distribution rounds");
    ::metrics::describe_histogram!(
        ROUND_LATENCY_US,
        ::metrics::Unit::Microseconds,
        "Distribution round latency in microseconds"
    );
}

/// Record a skipped review with the reason it was skipped
pub fn record_skipped(reason: &'static str) {
    ::metrics::counter!(REVIEWS_SKIPPED, "reason" => reason).increment(1);
}
