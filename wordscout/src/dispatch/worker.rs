use std::io::Write;
use tracing::info;

use super::{ScanSettings, SearchTask};
use crate::errors::SearchResult;
use crate::search::{FileScanner, PatternMatcher};

/// Bytes a worker writes to report its count
pub const RESULT_WIDTH: usize = 8;

pub fn encode_count(count: u64) -> [u8; RESULT_WIDTH] {
    count.to_le_bytes()
}

pub fn decode_count(bytes: [u8; RESULT_WIDTH]) -> u64 {
    u64::from_le_bytes(bytes)
}

/// Worker-side entry point: scans one file with fresh scanner state and
/// writes the count to `out`.
///
/// Nothing is written on failure, so the reader sees an empty channel.
pub fn run_worker<W: Write>(
    task: &SearchTask,
    settings: ScanSettings,
    out: &mut W,
) -> SearchResult<u64> {
    let matcher = PatternMatcher::new(&task.pattern)?;
    let scanner = FileScanner::new(matcher, settings.thread_count, settings.seam_mode);
    let count = scanner.process_file(&task.file_path)?;

    out.write_all(&encode_count(count))?;
    out.flush()?;

    info!(
        "Worker {} finished {}: {} occurrences",
        std::process::id(),
        task.file_path.display(),
        count
    );
    scanner.metrics().log_stats();
    Ok(count)
}
