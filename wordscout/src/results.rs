//! Result types for a counting run.
//!
//! A [`FileResult`] is produced once per file by its isolated worker and folded into the
//! [`AggregateReport`] by the coordinator. The report keeps `total` equal to the sum of
//! the per-file counts at every step, so a partially built report is still consistent.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::metrics::{serialize_micros, ResourceUsage};

/// Occurrence count for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    /// The path to the file
    pub path: PathBuf,
    /// Occurrences found in the file
    pub count: u64,
}

impl FileResult {
    pub fn new(path: impl Into<PathBuf>, count: u64) -> Self {
        Self {
            path: path.into(),
            count,
        }
    }
}

/// The complete result of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    /// The pattern that was counted
    pub pattern: String,
    /// Per-file results, in the order the files were given
    pub per_file: Vec<FileResult>,
    /// Sum of all per-file counts
    pub total: u64,
    /// Wall-clock time from dispatch to the last reaped worker
    #[serde(serialize_with = "serialize_micros")]
    pub elapsed: Duration,
    /// Resource usage of the coordinating process
    pub usage: ResourceUsage,
}

impl AggregateReport {
    /// Creates an empty report for `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// Adds a file result and updates the total
    pub fn add_file_result(&mut self, file_result: FileResult) {
        self.total += file_result.count;
        self.per_file.push(file_result);
    }

    /// Records timing and usage once every file has been added
    pub fn finalize(&mut self, elapsed: Duration, usage: ResourceUsage) {
        self.elapsed = elapsed;
        self.usage = usage;
    }

    /// Per-file counts in file order
    pub fn counts(&self) -> Vec<u64> {
        self.per_file.iter().map(|r| r.count).collect()
    }

    /// Number of files with at least one occurrence
    pub fn files_with_matches(&self) -> usize {
        self.per_file.iter().filter(|r| r.count > 0).count()
    }
}
