//! ReviewStream Engine
//!
//! Execution strategies for the review classification pipeline.
//!
//! Provides:
//! - A `Strategy` abstraction with sequential, thread-pool and distributed variants
//! - A bounded handoff thread pool with a caller-runs saturation policy
//! - The coordinator/worker protocol over length-prefixed frames
//! - Ingestion sources (WebSocket, in-memory) and the pipeline driver

pub mod distributed;
pub mod parallel;
pub mod pipeline;
pub mod pool;
pub mod sequential;
pub mod source;
pub mod strategy;

pub use distributed::DistributedStrategy;
pub use parallel::ParallelStrategy;
pub use pipeline::{Pipeline, PipelineReport, ShutdownHandle, StopReason};
pub use pool::{Dispatch, PoolConfig, ThreadPool};
pub use sequential::SequentialStrategy;
pub use source::{IngestionSource, MemorySource, WebSocketSource, CLOSE_REASON};
pub use strategy::{format_result, Mode, Strategy, StrategyCore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::pipeline::{Pipeline, ShutdownHandle};
    pub use crate::source::IngestionSource;
    pub use crate::strategy::{Mode, Strategy, StrategyCore};
    pub use crate::{DistributedStrategy, ParallelStrategy, SequentialStrategy};
}
