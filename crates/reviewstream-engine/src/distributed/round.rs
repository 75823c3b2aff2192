//! One lock-step distribution round
//!
//! `Dispatch` sends item `i` to rank `i + 1`. `AwaitSlot(rank)` receives
//! from each rank in ascending order. `Drain` releases the batch and
//! `Done` is terminal. A round never overlaps another because the caller
//! holds the worker group mutably for its whole duration.

use super::frame::Frame;
use super::link::WorkerGroup;
use reviewstream_core::{Error, Result, ReviewItem};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Dispatch,
    AwaitSlot(usize),
    Drain,
    Done,
}

/// Outcome of one worker slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotResult {
    pub rank: usize,
    pub review_id: u64,
    /// `None` when the worker replied with an empty frame
    pub result: Option<String>,
}

#[derive(Debug)]
pub struct Round {
    batch: Vec<ReviewItem>,
    phase: RoundPhase,
    results: Vec<SlotResult>,
}

impl Round {
    pub fn new(batch: Vec<ReviewItem>) -> Self {
        let results = Vec::with_capacity(batch.len());
        Self {
            batch,
            phase: RoundPhase::Dispatch,
            results,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Slot results collected so far
    pub fn results(&self) -> &[SlotResult] {
        &self.results
    }

    /// Advance by one phase. Every send and receive gives up with
    /// [`Error::Cancelled`] once `cancel` fires.
    pub async fn step(
        &mut self,
        workers: &mut WorkerGroup,
        cancel: &CancellationToken,
    ) -> Result<RoundPhase> {
        let next = match self.phase {
            RoundPhase::Dispatch => {
                if self.batch.len() > workers.worker_count() {
                    return Err(Error::protocol(format!(
                        "Batch of {} reviews exceeds {} workers",
                        self.batch.len(),
                        workers.worker_count()
                    )));
                }
                for (i, review) in self.batch.iter().enumerate() {
                    let link = workers.link_mut(i + 1)?;
                    trace!(rank = i + 1, id = review.id, "Dispatching review");
                    cancellable(cancel, link.send(Frame::new(review.text.clone()))).await?;
                }
                if self.batch.is_empty() {
                    RoundPhase::Drain
                } else {
                    RoundPhase::AwaitSlot(1)
                }
            }
            RoundPhase::AwaitSlot(rank) => {
                let frame = cancellable(cancel, workers.link_mut(rank)?.recv()).await?;
                let result = (!frame.is_empty()).then(|| frame.trimmed().to_string());
                self.results.push(SlotResult {
                    rank,
                    review_id: self.batch[rank - 1].id,
                    result,
                });
                if rank < self.batch.len() {
                    RoundPhase::AwaitSlot(rank + 1)
                } else {
                    RoundPhase::Drain
                }
            }
            RoundPhase::Drain => {
                self.batch.clear();
                RoundPhase::Done
            }
            RoundPhase::Done => RoundPhase::Done,
        };
        self.phase = next;
        Ok(next)
    }

    /// Drive the round to `Done` and return the results in rank order
    pub async fn run(
        mut self,
        workers: &mut WorkerGroup,
        cancel: &CancellationToken,
    ) -> Result<Vec<SlotResult>> {
        while self.phase != RoundPhase::Done {
            self.step(workers, cancel).await?;
        }
        Ok(self.results)
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
