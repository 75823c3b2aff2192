//! Rank-addressed channels from the coordinator to its workers

use super::frame::{Frame, FrameCodec};
use super::worker::{run_worker, WorkerSummary};
use futures::{SinkExt, StreamExt};
use reviewstream_classifiers::SharedClassifier;
use reviewstream_core::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// Flag the worker role is launched with
pub const WORKER_RANK_FLAG: &str = "--worker-rank";

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Point-to-point, ordered channel to one worker
pub struct WorkerLink {
    rank: usize,
    reader: FramedRead<BoxedReader, FrameCodec>,
    writer: FramedWrite<BoxedWriter, FrameCodec>,
}

impl WorkerLink {
    pub fn new<R, W>(rank: usize, reader: R, writer: W, capacity: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            rank,
            reader: FramedRead::new(Box::new(reader), FrameCodec::new(capacity)),
            writer: FramedWrite::new(Box::new(writer), FrameCodec::new(capacity)),
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub async fn send(&mut self, frame: Frame) -> Result<()> {
        self.writer.send(frame).await
    }

    /// Receive the next frame; a closed channel is [`Error::WorkerExited`]
    pub async fn recv(&mut self) -> Result<Frame> {
        match self.reader.next().await {
            Some(frame) => frame,
            None => Err(Error::WorkerExited { rank: self.rank }),
        }
    }
}

/// How to launch a worker process
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-launch the running executable
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// The fixed set of workers, ranks `1..=n`
pub struct WorkerGroup {
    links: Vec<WorkerLink>,
    children: Vec<Child>,
    tasks: Vec<JoinHandle<Result<WorkerSummary>>>,
}

impl WorkerGroup {
    /// Group over links that are driven elsewhere. Links must be ordered by rank.
    pub fn from_links(links: Vec<WorkerLink>) -> Self {
        Self {
            links,
            children: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Launch `workers` processes, each talking frames over stdin/stdout
    pub fn spawn_processes(command: &WorkerCommand, workers: usize, capacity: usize) -> Result<Self> {
        let mut group = Self::from_links(Vec::with_capacity(workers));

        for rank in 1..=workers {
            let mut child = Command::new(&command.program)
                .args(&command.args)
                .arg(WORKER_RANK_FLAG)
                .arg(rank.to_string())
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| Error::internal(format!("Failed to launch worker {rank}: {e}")))?;

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| Error::internal(format!("Worker {rank} has no stdin")))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| Error::internal(format!("Worker {rank} has no stdout")))?;

            debug!(rank, pid = ?child.id(), "Worker process launched");
            group.links.push(WorkerLink::new(rank, stdout, stdin, capacity));
            group.children.push(child);
        }

        info!(workers, "Worker processes launched");
        Ok(group)
    }

    /// Run `workers` workers as tasks in this process, connected by in-memory pipes
    pub fn spawn_in_memory(workers: usize, classifier: SharedClassifier, capacity: usize) -> Self {
        let mut group = Self::from_links(Vec::with_capacity(workers));
        // Room for one frame in each direction
        let buffer = capacity + 64;

        for rank in 1..=workers {
            let (coordinator, worker) = tokio::io::duplex(buffer);
            let (worker_rx, worker_tx) = tokio::io::split(worker);
            let (coordinator_rx, coordinator_tx) = tokio::io::split(coordinator);

            let classifier = Arc::clone(&classifier);
            group.tasks.push(tokio::spawn(run_worker(
                rank, worker_rx, worker_tx, classifier, capacity,
            )));
            group
                .links
                .push(WorkerLink::new(rank, coordinator_rx, coordinator_tx, capacity));
        }

        group
    }

    pub fn worker_count(&self) -> usize {
        self.links.len()
    }

    /// Link to worker `rank` (1-based)
    pub fn link_mut(&mut self, rank: usize) -> Result<&mut WorkerLink> {
        let count = self.links.len();
        rank.checked_sub(1)
            .and_then(|i| self.links.get_mut(i))
            .ok_or_else(|| Error::internal(format!("No worker with rank {rank} (have {count})")))
    }

    /// Close every link and wait up to `grace` in total for workers to
    /// exit; stragglers are killed.
    pub async fn wait(&mut self, grace: Duration) {
        self.links.clear();
        let deadline = Instant::now() + grace;

        for (i, child) in self.children.iter_mut().enumerate() {
            let rank = i + 1;
            match timeout_at(deadline, child.wait()).await {
                Ok(Ok(status)) => debug!(rank, %status, "Worker process exited"),
                Ok(Err(e)) => warn!(rank, error = %e, "Failed to wait for worker process"),
                Err(_) => {
                    warn!(rank, "Worker did not exit in time, killing it");
                    if let Err(e) = child.kill().await {
                        warn!(rank, error = %e, "Failed to kill worker process");
                    }
                }
            }
        }

        for (i, task) in self.tasks.iter_mut().enumerate() {
            let rank = i + 1;
            match timeout_at(deadline, &mut *task).await {
                Ok(Ok(Ok(summary))) => {
                    debug!(rank, processed = summary.processed, "Worker task finished")
                }
                Ok(Ok(Err(e))) => warn!(rank, error = %e, "Worker task failed"),
                Ok(Err(e)) => warn!(rank, error = %e, "Worker task panicked"),
                Err(_) => {
                    warn!(rank, "Worker task did not finish in time, aborting it");
                    task.abort();
                }
            }
        }

        self.children.clear();
        self.tasks.clear();
    }
}
