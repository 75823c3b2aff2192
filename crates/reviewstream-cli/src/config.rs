//! Runtime configuration

use crate::cli::ConfigOverrides;
use anyhow::{bail, Context};
use reviewstream_engine::distributed::DEFAULT_FRAME_CAPACITY;
use reviewstream_engine::Mode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest frame that still carries a short review and its result
const MIN_FRAME_CAPACITY: usize = 64;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Review feed URL
    pub url: String,

    /// Run time limit in minutes
    pub timeout_minutes: u64,

    /// Seconds between throughput samples
    pub tick_interval_secs: u64,

    /// Maximum frame payload between coordinator and workers
    pub frame_capacity: usize,

    /// Worker processes in distributed mode; one less than the core count
    /// when unset
    pub workers: Option<usize>,

    /// Seconds workers get to exit after the shutdown signal
    pub shutdown_grace_secs: u64,

    /// Throughput file locations
    pub output: OutputConfig,

    /// Prometheus exporter address, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            url: "wss://prog3.student.famnit.upr.si/sentiment".to_string(),
            timeout_minutes: 5,
            tick_interval_secs: 1,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            workers: None,
            shutdown_grace_secs: 5,
            output: OutputConfig::default(),
            metrics_addr: None,
        }
    }
}

/// One throughput file per strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub sequential_file: String,
    pub parallel_file: String,
    pub distributed_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            sequential_file: "sequential_reviews_per_second.txt".to_string(),
            parallel_file: "parallel_reviews_per_second.txt".to_string(),
            distributed_file: "distributed_reviews_per_second.txt".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path` when given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Load, apply command-line overrides, and validate
    pub fn resolve(overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let mut config = Self::load(overrides.config.as_deref())?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(timeout) = overrides.timeout_minutes {
            self.timeout_minutes = timeout;
        }
        if let Some(url) = &overrides.url {
            self.url = url.clone();
        }
        if let Some(workers) = overrides.workers {
            self.workers = Some(workers);
        }
        if let Some(capacity) = overrides.frame_capacity {
            self.frame_capacity = capacity;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output.dir = dir.clone();
        }
        if let Some(addr) = overrides.metrics_addr {
            self.metrics_addr = Some(addr);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            bail!("Feed URL must start with ws:// or wss://, got '{}'", self.url);
        }
        if self.timeout_minutes == 0 {
            bail!("Timeout must be at least one minute");
        }
        if self.tick_interval_secs == 0 {
            bail!("Tick interval must be at least one second");
        }
        if self.frame_capacity < MIN_FRAME_CAPACITY {
            bail!(
                "Frame capacity must be at least {} bytes, got {}",
                MIN_FRAME_CAPACITY,
                self.frame_capacity
            );
        }
        if self.workers == Some(0) {
            bail!("Distributed mode needs at least one worker");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes * 60)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Configured worker count, or one less than the core count (at least one)
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }

    /// Throughput file for `mode`
    pub fn output_path(&self, mode: Mode) -> PathBuf {
        let file = match mode {
            Mode::Sequential => &self.output.sequential_file,
            Mode::Parallel => &self.output.parallel_file,
            Mode::Distributed => &self.output.distributed_file,
        };
        self.output.dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.frame_capacity, 4096);
        assert!(config.worker_count() >= 1);
        assert_eq!(
            config.output_path(Mode::Parallel),
            Path::new(".").join("parallel_reviews_per_second.txt")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: AppConfig = serde_yaml::from_str(
            "timeout_minutes: 10\nworkers: 3\noutput:\n  dir: results\n",
        )
        .unwrap();
        assert_eq!(config.timeout_minutes, 10);
        assert_eq!(config.worker_count(), 3);
        assert_eq!(
            config.output_path(Mode::Distributed),
            Path::new("results").join("distributed_reviews_per_second.txt")
        );
        assert_eq!(config.url, AppConfig::default().url);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = AppConfig::default();
        config.apply(&ConfigOverrides {
            timeout_minutes: Some(1),
            url: Some("ws://localhost:9000/feed".into()),
            workers: Some(2),
            frame_capacity: Some(1024),
            ..Default::default()
        });
        assert_eq!(config.timeout_minutes, 1);
        assert_eq!(config.url, "ws://localhost:9000/feed");
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.frame_capacity, 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation() {
        let invalid = [
            AppConfig {
                url: "http://example.com".into(),
                ..Default::default()
            },
            AppConfig {
                timeout_minutes: 0,
                ..Default::default()
            },
            AppConfig {
                frame_capacity: 16,
                ..Default::default()
            },
            AppConfig {
                workers: Some(0),
                ..Default::default()
            },
        ];
        for config in invalid {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
