//! Distributed strategy: one coordinator and a fixed set of workers
//!
//! The coordinator batches reviews until it has one per worker, sends
//! item `i` to rank `i`, then collects replies from rank 1 upwards before
//! accepting the next batch.

pub mod coordinator;
pub mod frame;
pub mod link;
pub mod round;
pub mod worker;

pub use coordinator::{DistributedStrategy, DEFAULT_SHUTDOWN_GRACE};
pub use frame::{fits_capacity, Frame, FrameCodec, DEFAULT_FRAME_CAPACITY, SHUTDOWN_SENTINEL};
pub use link::{WorkerCommand, WorkerGroup, WorkerLink, WORKER_RANK_FLAG};
pub use round::{Round, RoundPhase, SlotResult};
pub use worker::{run_worker, WorkerSummary};
