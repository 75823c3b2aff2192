//! Bounded handoff thread pool with a caller-runs saturation policy
//!
//! Submissions never queue. A job is handed straight to an idle worker if
//! one is waiting, otherwise a new worker is spawned while fewer than
//! `max_size` are alive, otherwise the submitting thread runs the job
//! itself. The last case is what throttles ingestion when the pool is
//! saturated.
//!
//! Workers beyond `core_size` exit after `keep_alive` without work.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Workers kept alive while idle
    pub core_size: usize,
    /// Upper bound on live workers
    pub max_size: usize,
    /// Idle time after which a non-core worker exits
    pub keep_alive: Duration,
}

impl PoolConfig {
    /// Sizing for `parallelism` available cores:
    /// core `max(1, n - 1)`, max `2n - 1`, 60 s keep-alive
    pub fn for_parallelism(parallelism: usize) -> Self {
        let n = parallelism.max(1);
        let core_size = n.saturating_sub(1).max(1);
        Self {
            core_size,
            max_size: (n * 2 - 1).max(core_size),
            keep_alive: Duration::from_secs(60),
        }
    }

    /// Sizing for the cores of this machine
    pub fn from_available() -> Self {
        Self::for_parallelism(num_cpus::get())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_available()
    }
}

/// How a submitted job was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to an idle worker
    Handoff,
    /// Ran on a newly spawned worker
    Spawned,
    /// Pool saturated, ran on the submitting thread
    CallerRan,
    /// Pool shut down, job dropped
    Rejected,
}

/// Counters describing pool activity
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub live_workers: usize,
    pub peak_workers: usize,
    pub handoffs: u64,
    pub spawned: u64,
    pub caller_runs: u64,
    pub completed: u64,
}

#[derive(Clone)]
pub struct ThreadPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    live: AtomicUsize,
    peak: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
    next_id: AtomicUsize,
    handoffs: AtomicU64,
    spawned: AtomicU64,
    caller_runs: AtomicU64,
    completed: AtomicU64,
}

impl ThreadPool {
    pub fn new(config: PoolConfig) -> Self {
        // Zero capacity: a send only succeeds when a worker is already waiting
        let (sender, receiver) = channel::bounded::<Job>(0);
        info!(
            core_size = config.core_size,
            max_size = config.max_size,
            "Thread pool created"
        );
        Self {
            inner: Arc::new(PoolInner {
                config,
                sender: Mutex::new(Some(sender)),
                receiver,
                live: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                handles: Mutex::new(Vec::new()),
                shut_down: AtomicBool::new(false),
                next_id: AtomicUsize::new(0),
                handoffs: AtomicU64::new(0),
                spawned: AtomicU64::new(0),
                caller_runs: AtomicU64::new(0),
                completed: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Submit a job
    pub fn execute<F>(&self, job: F) -> Dispatch
    where
        F: FnOnce() + Send + 'static,
    {
        let job: Job = Box::new(job);

        let job = {
            let sender = self.inner.sender.lock();
            let Some(sender) = sender.as_ref() else {
                warn!("Thread pool is shut down, dropping job");
                return Dispatch::Rejected;
            };
            match sender.try_send(job) {
                Ok(()) => {
                    self.inner.handoffs.fetch_add(1, Ordering::Relaxed);
                    return Dispatch::Handoff;
                }
                Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => job,
            }
        };

        match self.try_spawn(job) {
            Ok(()) => Dispatch::Spawned,
            Err(job) => {
                self.inner.caller_runs.fetch_add(1, Ordering::Relaxed);
                debug!("Thread pool saturated, running job on caller");
                PoolInner::run(&self.inner, job);
                Dispatch::CallerRan
            }
        }
    }

    /// Spawn a worker seeded with `job`, or give the job back when the pool
    /// is at `max_size`
    fn try_spawn(&self, job: Job) -> std::result::Result<(), Job> {
        let inner = &self.inner;
        let reserved = inner
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < inner.config.max_size).then_some(live + 1)
            });
        let live = match reserved {
            Ok(previous) => previous + 1,
            Err(_) => return Err(job),
        };
        inner.peak.fetch_max(live, Ordering::Relaxed);

        // Kept outside the closure so a failed spawn can hand the job back
        let seed = Arc::new(Mutex::new(Some(job)));
        let worker_seed = Arc::clone(&seed);
        let worker_inner = Arc::clone(inner);
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let spawn = std::thread::Builder::new()
            .name(format!("classifier-{id}"))
            .spawn(move || {
                let first = worker_seed.lock().take();
                PoolInner::worker_loop(worker_inner, first)
            });

        match spawn {
            Ok(handle) => {
                inner.spawned.fetch_add(1, Ordering::Relaxed);
                let mut handles = inner.handles.lock();
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn pool worker: {}", e);
                inner.live.fetch_sub(1, Ordering::AcqRel);
                match seed.lock().take() {
                    Some(job) => Err(job),
                    None => Ok(()),
                }
            }
        }
    }

    /// Stop accepting jobs. Idle workers exit, busy workers finish their
    /// current job first.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the only sender disconnects every waiting worker
        self.inner.sender.lock().take();
        info!("Thread pool shutting down");
    }

    /// Wait for every worker thread to exit. Call after [`shutdown`].
    ///
    /// [`shutdown`]: ThreadPool::shutdown
    pub fn join(&self) {
        let handles: Vec<_> = self.inner.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("Pool worker panicked outside a job");
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        PoolStats {
            live_workers: inner.live.load(Ordering::Acquire),
            peak_workers: inner.peak.load(Ordering::Relaxed),
            handoffs: inner.handoffs.load(Ordering::Relaxed),
            spawned: inner.spawned.load(Ordering::Relaxed),
            caller_runs: inner.caller_runs.load(Ordering::Relaxed),
            completed: inner.completed.load(Ordering::Relaxed),
        }
    }
}

impl PoolInner {
    fn run(inner: &PoolInner, job: Job) {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("Classification job panicked");
        }
        inner.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn worker_loop(inner: Arc<PoolInner>, first: Option<Job>) {
        if let Some(job) = first {
            Self::run(&inner, job);
        }

        let mut idle_since = Instant::now();
        loop {
            match inner.receiver.recv_timeout(inner.config.keep_alive) {
                Ok(job) => {
                    Self::run(&inner, job);
                    idle_since = Instant::now();
                }
                Err(RecvTimeoutError::Timeout) => {
                    if idle_since.elapsed() >= inner.config.keep_alive && inner.try_retire() {
                        debug!("Idle pool worker retiring");
                        return;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        inner.live.fetch_sub(1, Ordering::AcqRel);
    }

    /// Give up a worker slot if more than `core_size` are alive
    fn try_retire(&self) -> bool {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live > self.config.core_size).then(|| live - 1)
            })
            .is_ok()
    }
}
