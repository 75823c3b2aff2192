//! Worker side of the coordinator/worker protocol

use super::frame::{Frame, FrameCodec};
use crate::strategy::format_result;
use futures::{SinkExt, StreamExt};
use reviewstream_classifiers::SharedClassifier;
use reviewstream_core::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// What a worker did before it exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerSummary {
    pub rank: usize,
    /// Reviews classified and answered
    pub processed: u64,
    /// Empty frames answered with an empty reply
    pub empty: u64,
    /// Whether the worker saw the shutdown sentinel (as opposed to EOF)
    pub graceful: bool,
}

/// Serve one coordinator until the sentinel arrives or the channel closes.
///
/// Every non-sentinel frame gets exactly one reply frame: the formatted
/// result, or an empty frame when the input was empty.
pub async fn run_worker<R, W>(
    rank: usize,
    reader: R,
    writer: W,
    classifier: SharedClassifier,
    capacity: usize,
) -> Result<WorkerSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = FramedRead::new(reader, FrameCodec::new(capacity));
    let mut writer = FramedWrite::new(writer, FrameCodec::new(capacity));
    let mut summary = WorkerSummary {
        rank,
        ..Default::default()
    };

    debug!(rank, classifier = classifier.name(), "Worker ready");

    while let Some(frame) = reader.next().await {
        let frame = frame?;

        if frame.is_shutdown() {
            info!("Worker {} received shutdown signal.", rank);
            summary.graceful = true;
            break;
        }

        if frame.is_empty() {
            warn!(rank, "Received empty review, replying with no result");
            summary.empty += 1;
            writer.send(Frame::empty()).await?;
            continue;
        }

        let text = frame.trimmed();
        let label = classifier.label(text);
        debug!(rank, label = %label, "Classified review");
        writer.send(Frame::new(format_result(text, label))).await?;
        summary.processed += 1;
    }

    if !summary.graceful {
        warn!(rank, "Coordinator channel closed without shutdown signal");
    }
    Ok(summary)
}
