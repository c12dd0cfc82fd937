use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{trace, warn};

use super::matcher::PatternMatcher;
use crate::config::SeamMode;
use crate::metrics::ScanMetrics;

/// Size of one line read in approximate mode, including the slot a C string
/// terminator would take; a single read returns at most `LINE_BUFFER_SIZE - 1` bytes.
pub const LINE_BUFFER_SIZE: usize = 1024;

/// Block size for exact-mode reads
const BLOCK_SIZE: usize = 64 * 1024;

/// Half-open interval `[start, end)` of file byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "range end {} before start {}", end, start);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `[0, file_size)` into `thread_count` contiguous ranges.
///
/// Every range but the last is `file_size / thread_count` bytes long; the last
/// one is stretched to `file_size` to absorb the remainder. An empty file gives
/// `thread_count` empty ranges at offset 0.
pub fn partition(file_size: u64, thread_count: NonZeroUsize) -> Vec<ByteRange> {
    let threads = thread_count.get() as u64;
    let chunk_size = file_size / threads;

    (0..threads)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == threads - 1 {
                file_size
            } else {
                (i + 1) * chunk_size
            };
            ByteRange::new(start, end)
        })
        .collect()
}

/// Count produced by a single chunk worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkResult {
    pub range: ByteRange,
    pub local_count: u64,
}

/// Scans one byte range of a file through its own file handle
#[derive(Debug)]
pub struct ChunkWorker<'a> {
    path: &'a Path,
    matcher: &'a PatternMatcher,
    seam_mode: SeamMode,
    metrics: &'a ScanMetrics,
}

impl<'a> ChunkWorker<'a> {
    pub fn new(
        path: &'a Path,
        matcher: &'a PatternMatcher,
        seam_mode: SeamMode,
        metrics: &'a ScanMetrics,
    ) -> Self {
        Self {
            path,
            matcher,
            seam_mode,
            metrics,
        }
    }

    /// Counts matches in `range`.
    ///
    /// A failure to open, seek or read is logged and yields a count of zero;
    /// it never reaches sibling workers.
    pub fn scan(&self, range: ByteRange) -> ChunkResult {
        let local_count = match self.try_scan(range) {
            Ok((count, bytes_read)) => {
                self.metrics.record_chunk(bytes_read);
                count
            }
            Err(e) => {
                warn!(
                    "Chunk {}..{} of {} failed, counting it as 0: {}",
                    range.start,
                    range.end,
                    self.path.display(),
                    e
                );
                self.metrics.record_chunk_failure();
                0
            }
        };

        trace!(
            "Chunk {}..{} of {}: {} matches",
            range.start,
            range.end,
            self.path.display(),
            local_count
        );
        ChunkResult { range, local_count }
    }

    fn try_scan(&self, range: ByteRange) -> io::Result<(u64, u64)> {
        let mut file = File::open(self.path)?;
        file.seek(SeekFrom::Start(range.start))?;

        match self.seam_mode {
            SeamMode::Approximate => self.scan_lines(file, range),
            SeamMode::Exact => self.scan_exact(file, range),
        }
    }

    /// Line-granular scan. Keeps reading while the position before a read is
    /// inside the range, so the last line read may run past `range.end`.
    fn scan_lines(&self, file: File, range: ByteRange) -> io::Result<(u64, u64)> {
        let mut reader = BufReader::with_capacity(LINE_BUFFER_SIZE, file);
        let mut line = Vec::with_capacity(LINE_BUFFER_SIZE);
        let mut position = range.start;
        let mut count = 0;

        while position < range.end {
            line.clear();
            let read = reader
                .by_ref()
                .take(LINE_BUFFER_SIZE as u64 - 1)
                .read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            position += read as u64;
            count += self.matcher.count(&line);
        }

        Ok((count, position - range.start))
    }

    /// Block scan over the range plus `pattern_len - 1` bytes of overlap.
    /// Only matches starting inside the range are counted, so an occurrence
    /// straddling the seam belongs to the chunk it starts in.
    fn scan_exact(&self, file: File, range: ByteRange) -> io::Result<(u64, u64)> {
        let overlap = self.matcher.len() - 1;
        let mut reader = file.take(range.len() + overlap as u64);
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut window: Vec<u8> = Vec::with_capacity(BLOCK_SIZE + overlap);
        // Offset of window[0] relative to range.start
        let mut window_start: u64 = 0;
        let mut bytes_read: u64 = 0;
        let mut count = 0;

        'read: loop {
            let n = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            bytes_read += n as u64;
            window.extend_from_slice(&block[..n]);

            let mut cursor = 0;
            while let Some(pos) = self.matcher.find_from(&window, cursor) {
                if window_start + pos as u64 >= range.len() {
                    break 'read;
                }
                count += 1;
                cursor = pos + self.matcher.len();
            }

            // Keep the unconsumed tail that could still begin a match
            let keep_from = cursor.max(window.len().saturating_sub(overlap));
            window.drain(..keep_from);
            window_start += keep_from as u64;
        }

        Ok((count, bytes_read))
    }
}
