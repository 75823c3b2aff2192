//! ReviewStream Telemetry
//!
//! Throughput accounting for the classification pipeline.
//!
//! Provides:
//! - A once-per-interval throughput counter with an append-only sample sink
//! - Process-wide metric names and descriptions for the `metrics` facade
//! - Statistics over recorded throughput files

pub mod counter;
pub mod instruments;
pub mod report;
pub mod sink;

pub use counter::{ThroughputCounter, ThroughputSample, SAMPLE_PREFIX};
pub use report::{parse_samples, ThroughputStats};
pub use sink::{FileSink, MemorySink, SampleSink};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::counter::{ThroughputCounter, ThroughputSample};
    pub use crate::sink::{FileSink, MemorySink, SampleSink};
}
