//! Metrics describing what a merge run produced.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason an output file was written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    /// Accumulated input size exceeded the configured limit.
    Threshold,
    /// Final flush after the last input file of the domain.
    Remainder,
}

/// Metrics captured for each output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlushMetrics {
    /// Zero-based output index within the domain.
    pub index: usize,
    /// Path the output was written to.
    pub path: PathBuf,
    /// Why the flush happened.
    pub trigger: FlushTrigger,
    /// Input files merged into this output.
    pub files: usize,
    /// On-disk size of those input files.
    pub input_bytes: u64,
    /// Sessions written.
    pub sessions_kept: usize,
    /// Sessions discarded as duplicates.
    pub sessions_duplicate: usize,
    /// Bytes written to the output file.
    pub bytes_written: u64,
}

/// Aggregate metrics for one domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainMetrics {
    /// Domain name.
    pub domain: String,
    /// Output directory of the domain.
    pub output_dir: PathBuf,
    /// Number of input files consumed.
    pub files: usize,
    /// Total on-disk size of the inputs.
    pub input_bytes: u64,
    /// Distinct sessions fingerprinted across all flushes.
    pub distinct_sessions: usize,
    /// One entry per output file, in index order.
    pub flushes: Vec<FlushMetrics>,
    /// Wall time spent on the domain.
    pub elapsed: Duration,
    /// Resident set size sample captured after the domain on Linux. A domain's accumulator
    /// holds up to the size limit of text in memory, so this shows how close a run came to
    /// exhausting RAM.
    pub rss_kb: Option<usize>,
}

impl DomainMetrics {
    /// Total sessions written across the domain.
    #[must_use]
    pub fn sessions_kept(&self) -> usize {
        self.flushes.iter().map(|flush| flush.sessions_kept).sum()
    }

    /// Total sessions dropped as duplicates across the domain.
    #[must_use]
    pub fn sessions_duplicate(&self) -> usize {
        self.flushes
            .iter()
            .map(|flush| flush.sessions_duplicate)
            .sum()
    }

    /// Total bytes written across the domain.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.flushes.iter().map(|flush| flush.bytes_written).sum()
    }
}

/// Metrics produced by a full run over every domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunMetrics {
    /// Per-domain metrics in processing order.
    pub domains: Vec<DomainMetrics>,
    /// Total duration of the run.
    pub total_duration: Duration,
}

impl RunMetrics {
    /// Number of output files written by the run.
    #[must_use]
    pub fn output_files(&self) -> usize {
        self.domains.iter().map(|domain| domain.flushes.len()).sum()
    }

    /// Looks up the metrics of a domain by name.
    #[must_use]
    pub fn domain(&self, name: &str) -> Option<&DomainMetrics> {
        self.domains.iter().find(|domain| domain.domain == name)
    }
}

// VmRSS from procfs, reported in kB.
#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
            return value;
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
