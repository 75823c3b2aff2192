//! Append-only destinations for throughput samples

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Line-oriented, append-only sample destination
pub trait SampleSink: Send + Sync {
    /// Append one line
    fn append(&self, line: &str) -> io::Result<()>;
}

/// Appends lines to a text file, creating it if needed
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    // Serializes appends from concurrent tickers on the same file
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSink for FileSink {
    fn append(&self, line: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

/// Keeps lines in memory, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines appended so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl SampleSink for MemorySink {
    fn append(&self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}
