use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, trace};

use super::chunk::{partition, ChunkResult, ChunkWorker};
use super::matcher::PatternMatcher;
use crate::config::SeamMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;

/// Counts occurrences in one file by fanning its byte ranges out over a
/// fixed number of threads
#[derive(Debug)]
pub struct FileScanner {
    matcher: PatternMatcher,
    thread_count: NonZeroUsize,
    seam_mode: SeamMode,
    metrics: ScanMetrics,
}

impl FileScanner {
    pub fn new(matcher: PatternMatcher, thread_count: NonZeroUsize, seam_mode: SeamMode) -> Self {
        Self {
            matcher,
            thread_count,
            seam_mode,
            metrics: ScanMetrics::new(),
        }
    }

    /// Gets the scan metrics
    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Returns the total number of occurrences in `path`.
    ///
    /// A file that cannot be opened is a fatal error. Chunks that fail after
    /// that contribute zero.
    pub fn process_file(&self, path: &Path) -> SearchResult<u64> {
        let chunks = self.scan_chunks(path)?;
        let total = chunks.iter().map(|c| c.local_count).sum();
        debug!("{}: {} matches", path.display(), total);
        Ok(total)
    }

    /// Scans every chunk of `path` and returns the per-chunk results in range order.
    ///
    /// Each worker keeps its own count; the caller folds them after every
    /// worker has been joined.
    pub fn scan_chunks(&self, path: &Path) -> SearchResult<Vec<ChunkResult>> {
        // The file must open, not just stat, or every chunk would quietly count zero
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| SearchError::from_io(path, e))?
            .len();
        drop(file);
        self.metrics.record_file();

        let ranges = partition(file_size, self.thread_count);
        trace!(
            "Scanning {} ({} bytes) in {} chunks",
            path.display(),
            file_size,
            ranges.len()
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.thread_count.get())
            .thread_name(|i| format!("wordscout-chunk-{}", i))
            .build()
            .map_err(|e| SearchError::thread_pool(e.to_string()))?;

        let worker = ChunkWorker::new(path, &self.matcher, self.seam_mode, &self.metrics);
        let chunks = pool.install(|| {
            ranges
                .par_iter()
                .with_max_len(1)
                .map(|range| worker.scan(*range))
                .collect::<Vec<_>>()
        });

        Ok(chunks)
    }
}
