//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use reviewstream_classifiers::{ClassificationResult, Classifier, SharedClassifier};
use reviewstream_core::SentimentLabel;
use reviewstream_engine::distributed::{Frame, FrameCodec, WorkerLink};
use reviewstream_engine::StrategyCore;
use reviewstream_telemetry::{MemorySink, ThroughputCounter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

pub const CAPACITY: usize = 4096;

/// Classifier returning a fixed label after an optional delay
pub struct MockClassifier {
    label: SentimentLabel,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl MockClassifier {
    pub fn new(label: SentimentLabel) -> Self {
        Self {
            label,
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _text: &str) -> ClassificationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        ClassificationResult::new(self.label)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn shared(classifier: MockClassifier) -> (Arc<MockClassifier>, SharedClassifier) {
    let classifier = Arc::new(classifier);
    let shared: SharedClassifier = classifier.clone();
    (classifier, shared)
}

/// Strategy state wired to an in-memory sink and a result channel
pub struct Harness {
    pub counter: ThroughputCounter,
    pub sink: MemorySink,
    pub results: mpsc::UnboundedReceiver<String>,
}

impl Harness {
    pub fn new() -> (StrategyCore, Self) {
        let sink = MemorySink::new();
        let counter = ThroughputCounter::new(Arc::new(sink.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        let core = StrategyCore::new(counter.clone(), Duration::from_secs(1)).with_results(tx);
        (
            core,
            Self {
                counter,
                sink,
                results: rx,
            },
        )
    }

    /// Result lines emitted so far
    pub fn drain_results(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.results.try_recv() {
            lines.push(line);
        }
        lines
    }
}

/// Everything a scripted worker received, in order
pub type Received = Arc<Mutex<Vec<String>>>;

/// Worker that answers each frame with `reply(payload)` until the sentinel
/// or EOF, recording every payload it sees.
pub fn scripted_worker<F>(rank: usize, reply: F) -> (WorkerLink, Received, JoinHandle<()>)
where
    F: Fn(&str) -> String + Send + 'static,
{
    let (coordinator, worker) = tokio::io::duplex(CAPACITY * 2);
    let (coordinator_rx, coordinator_tx) = tokio::io::split(coordinator);
    let link = WorkerLink::new(rank, coordinator_rx, coordinator_tx, CAPACITY);

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let log = received.clone();
    let handle = tokio::spawn(async move {
        let (rx, tx) = tokio::io::split(worker);
        let mut rx = FramedRead::new(rx, FrameCodec::new(CAPACITY));
        let mut tx = FramedWrite::new(tx, FrameCodec::new(CAPACITY));
        while let Some(Ok(frame)) = rx.next().await {
            log.lock().push(frame.payload().to_string());
            if frame.is_shutdown() {
                break;
            }
            if tx.send(Frame::new(reply(frame.trimmed()))).await.is_err() {
                break;
            }
        }
    });

    (link, received, handle)
}
