//! Metrics describing a completed grouping run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::GroupingReport;

/// Summary statistics captured for one grouping run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroupingMetrics {
    /// Tokens in the input stream.
    pub tokens: usize,
    /// Non-empty chunks dispatched to the pool.
    pub chunks: usize,
    /// Chunks that failed or were cancelled.
    pub failed_chunks: usize,
    /// Groups emitted by successful chunks.
    pub groups: usize,
    /// Tokens placed in some group.
    pub grouped_tokens: usize,
    /// Groups holding only their representative.
    pub singleton_groups: usize,
    /// Token occurrences without an embedding.
    pub oov_tokens: usize,
    /// Worker threads used.
    pub concurrency: usize,
    /// Similarity threshold used.
    pub threshold: f32,
    /// Wall-clock time of the run.
    pub total_duration: Duration,
    /// Resident set size sample captured from `/proc/self/status` on Linux.
    pub rss_kb: Option<usize>,
}

impl GroupingMetrics {
    /// Fills the group counters from a merged report.
    pub fn record_report(&mut self, report: &GroupingReport) {
        self.failed_chunks = report.failures.len();
        self.groups = report.groups.len();
        self.grouped_tokens = report.groups.iter().map(|g| g.len()).sum();
        self.singleton_groups = report.groups.iter().filter(|g| g.is_singleton()).count();
    }
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            return rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
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
