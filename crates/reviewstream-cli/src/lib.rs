//! ReviewStream command-line support
//!
//! Argument parsing, configuration, process setup and the `report`
//! subcommand shared by the `reviewstream` and `reviewstream-distributed`
//! binaries.

pub mod app;
pub mod cli;
pub mod config;
pub mod report;

pub use cli::{normalize_args, Cli, Commands, ConfigOverrides, DistributedCli, RunArgs};
pub use config::AppConfig;
