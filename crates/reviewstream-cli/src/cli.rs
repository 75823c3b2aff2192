//! Command-line definitions for both entry points

use clap::{Args, Parser, Subcommand};
use reviewstream_engine::Mode;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Printed when `mode` or `topics` is missing
pub const USAGE_HINT: &str = "\
Mode options:
  sequential - classify each review inline
  parallel   - classify reviews on a thread pool
Example: reviewstream mode=parallel topics=\"sport music\" timeout=10";

/// Printed when `topics` is missing for the distributed binary
pub const DISTRIBUTED_USAGE_HINT: &str = "\
Example: reviewstream-distributed topics=\"sport music\" timeout=10 workers=3";

#[derive(Parser, Debug)]
#[command(name = "reviewstream")]
#[command(
    author,
    version,
    about = "Stream product reviews through a sentiment classifier and measure throughput"
)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise recorded throughput files
    Report {
        /// Files written by a previous run
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments of a sequential or parallel run
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Execution strategy: sequential or parallel
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<Mode>,

    /// Topics to subscribe to, separated by spaces or commas
    #[arg(long)]
    pub topics: Option<String>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Arguments of the distributed binary
#[derive(Parser, Debug)]
#[command(name = "reviewstream-distributed")]
#[command(
    author,
    version,
    about = "Classify streamed reviews on a coordinator and a fixed set of worker processes"
)]
pub struct DistributedCli {
    /// Topics to subscribe to, separated by spaces or commas
    #[arg(long)]
    pub topics: Option<String>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Run as the worker with this rank
    #[arg(long, hide = true)]
    pub worker_rank: Option<usize>,
}

/// Settings that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run time limit in minutes
    #[arg(long = "timeout", value_name = "MINUTES")]
    pub timeout_minutes: Option<u64>,

    /// Review feed URL
    #[arg(long)]
    pub url: Option<String>,

    /// Number of worker processes (distributed mode)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Maximum frame payload between coordinator and workers
    #[arg(long)]
    pub frame_capacity: Option<usize>,

    /// Directory for throughput files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

/// Accept bare `key=value` tokens as `--key=value`.
///
/// The program name, flags, and anything after `--` pass through unchanged.
/// Underscores in the key become hyphens, so `output_dir=out` works.
pub fn normalize_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for (i, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if i == 0 || passthrough {
            normalized.push(arg);
            continue;
        }

        let rewritten = match arg.to_str() {
            Some("--") => {
                passthrough = true;
                None
            }
            Some(token) => token.split_once('=').and_then(|(key, value)| {
                is_bare_key(key).then(|| format!("--{}={}", key.replace('_', "-"), value))
            }),
            None => None,
        };
        normalized.push(rewritten.map(OsString::from).unwrap_or(arg));
    }

    normalized
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
