//! `report` subcommand: statistics over throughput files

use anyhow::Context;
use reviewstream_telemetry::ThroughputStats;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Statistics for one throughput file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    /// `None` when the file holds no samples
    pub stats: Option<ThroughputStats>,
}

/// Read every file and compute its statistics
pub fn summarize(files: &[PathBuf]) -> anyhow::Result<Vec<FileReport>> {
    files
        .iter()
        .map(|file| {
            let stats = ThroughputStats::from_file(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            Ok(FileReport {
                file: file.clone(),
                stats,
            })
        })
        .collect()
}

pub fn render_json(reports: &[FileReport]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

pub fn render_text(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_file(&mut out, &report.file, report.stats.as_ref());
    }
    out
}

fn render_file(out: &mut String, file: &Path, stats: Option<&ThroughputStats>) {
    let _ = writeln!(out, "{}", file.display());
    let Some(stats) = stats else {
        let _ = writeln!(out, "  No throughput samples");
        return;
    };
    let _ = writeln!(out, "  Seconds: {}", stats.samples);
    let _ = writeln!(out, "  Total: {}", stats.total);
    let _ = writeln!(out, "  Average: {:.2}", stats.average);
    let _ = writeln!(out, "  Max: {}", stats.max);
    let _ = writeln!(out, "  Median: {:.2}", stats.median);
    let _ = writeln!(out, "  Min: {}", stats.min);
    let _ = writeln!(out, "  Standard Deviation: {:.2}", stats.std_dev);
    let _ = writeln!(out, "  Percentage Zero Reviews: {:.2}%", stats.percentage_zero);
}
