//! Once-per-interval throughput counter
//!
//! Workers call [`ThroughputCounter::increment`] as each classification
//! completes. A background timer reads and resets the tally every interval,
//! logs `Analyzed Reviews per Second: {n}` and appends the same line to the
//! configured sink.

use crate::instruments;
use crate::sink::SampleSink;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Prefix of every throughput line
pub const SAMPLE_PREFIX: &str = "Analyzed Reviews per Second: ";

/// One emitted throughput reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputSample {
    pub count: u64,
    pub at: DateTime<Utc>,
}

impl ThroughputSample {
    /// Line written to the console and the sink
    pub fn line(&self) -> String {
        format!("{}{}", SAMPLE_PREFIX, self.count)
    }
}

/// Throughput counter shared by every execution path of one strategy
#[derive(Clone)]
pub struct ThroughputCounter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    count: AtomicU64,
    sink: Arc<dyn SampleSink>,
    timer: Mutex<Option<Timer>>,
}

struct Timer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ThroughputCounter {
    /// Create a counter writing samples to `sink`
    pub fn new(sink: Arc<dyn SampleSink>) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                count: AtomicU64::new(0),
                sink,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Start the recurring timer. The first sample is emitted one interval
    /// from now. Calling `start` on a running counter does nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, interval: Duration) {
        let mut timer = self.inner.timer.lock();
        if timer.is_some() {
            warn!("Throughput counter already started");
            return;
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let counter = self.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let sample = counter.take_sample();
                        // Sink appends are blocking file IO; awaiting keeps lines in tick order
                        let writer = counter.clone();
                        let written =
                            tokio::task::spawn_blocking(move || writer.record(&sample)).await;
                        if let Err(e) = written {
                            error!("Throughput sample writer failed: {}", e);
                        }
                    }
                }
            }
            debug!("Throughput timer stopped");
        });

        *timer = Some(Timer { cancel, handle });
        debug!(interval_ms = interval.as_millis() as u64, "Throughput counter started");
    }

    /// Record one completed classification
    pub fn increment(&self) {
        self.inner.count.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(instruments::REVIEWS_ANALYZED).increment(1);
    }

    /// Increments recorded since the last sample
    pub fn pending(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }

    /// Read and reset the tally, then emit the sample
    pub fn tick(&self) -> ThroughputSample {
        let sample = self.take_sample();
        self.record(&sample);
        sample
    }

    fn take_sample(&self) -> ThroughputSample {
        ThroughputSample {
            count: self.inner.count.swap(0, Ordering::AcqRel),
            at: Utc::now(),
        }
    }

    /// Log the sample and append it to the sink. Blocks on sink IO.
    fn record(&self, sample: &ThroughputSample) {
        let line = sample.line();
        info!("{}", line);
        if let Err(e) = self.inner.sink.append(&line) {
            error!("Error writing throughput sample: {}", e);
        }
    }

    /// Stop the timer. Increments not yet sampled are dropped. Returns
    /// `false` when the counter was not running.
    pub fn stop(&self) -> bool {
        match self.inner.timer.lock().take() {
            Some(timer) => {
                timer.cancel.cancel();
                timer.handle.abort();
                debug!("Throughput counter stopped");
                true
            }
            None => false,
        }
    }

    /// Whether the timer is running
    pub fn is_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }
}
