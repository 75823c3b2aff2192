//! Statistics over recorded throughput files

use crate::counter::SAMPLE_PREFIX;
use reviewstream_core::Result;
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

/// Summary of a throughput recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputStats {
    /// Number of samples (seconds) recorded
    pub samples: usize,
    pub total: u64,
    pub average: f64,
    pub max: u64,
    pub median: f64,
    pub min: u64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Share of samples with zero throughput, as a percentage
    pub percentage_zero: f64,
}

impl ThroughputStats {
    /// Compute statistics, `None` when there are no samples
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let total: u64 = samples.iter().sum();
        let average = total as f64 / n;
        let variance = samples
            .iter()
            .map(|&s| {
                let d = s as f64 - average;
                d * d
            })
            .sum::<f64>()
            / n;

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };

        let zeros = samples.iter().filter(|&&s| s == 0).count();

        Some(Self {
            samples: samples.len(),
            total,
            average,
            max: sorted[sorted.len() - 1],
            median,
            min: sorted[0],
            std_dev: variance.sqrt(),
            percentage_zero: zeros as f64 / n * 100.0,
        })
    }

    /// Load a throughput file and compute its statistics
    pub fn from_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let file = std::fs::File::open(path)?;
        let samples = parse_samples(std::io::BufReader::new(file))?;
        Ok(Self::from_samples(&samples))
    }
}

/// Extract sample counts from throughput lines, ignoring anything else
pub fn parse_samples(reader: impl BufRead) -> Result<Vec<u64>> {
    let mut samples = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(pos) = line.find(SAMPLE_PREFIX) {
            if let Ok(count) = line[pos + SAMPLE_PREFIX.len()..].trim().parse() {
                samples.push(count);
            }
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_ignores_unrelated_lines() {
        let input = "Analyzed Reviews per Second: 3\nnoise\n\
                     2024-01-01 INFO Analyzed Reviews per Second: 5\n\
                     Analyzed Reviews per Second: nope\n";
        let samples = parse_samples(Cursor::new(input)).unwrap();
        assert_eq!(samples, vec![3, 5]);
    }

    #[test]
    fn test_stats() {
        let stats = ThroughputStats::from_samples(&[0, 2, 4, 0, 4]).unwrap();
        assert_eq!(stats.samples, 5);
        assert_eq!(stats.total, 10);
        assert_eq!(stats.average, 2.0);
        assert_eq!(stats.max, 4);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.median, 2.0);
        // deviations: -2, 0, 2, -2, 2 -> variance 16/5
        assert!((stats.std_dev - (16.0f64 / 5.0).sqrt()).abs() < 1e-9);
        assert_eq!(stats.percentage_zero, 40.0);
    }

    #[test]
    fn test_even_median_and_empty() {
        let stats = ThroughputStats::from_samples(&[1, 2, 3, 10]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert!(ThroughputStats::from_samples(&[]).is_none());
    }
}
