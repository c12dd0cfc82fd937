use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
#[cfg(unix)]
use std::mem::MaybeUninit;
use std::time::Duration;
use tracing::{debug, info};

/// Tracks chunk-level scan statistics
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    files_scanned: Arc<AtomicU64>,
    chunks_scanned: Arc<AtomicU64>,
    chunk_failures: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            files_scanned: Arc::new(AtomicU64::new(0)),
            chunks_scanned: Arc::new(AtomicU64::new(0)),
            chunk_failures: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a file handed to the scanner
    pub fn record_file(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished chunk and the bytes it read
    pub fn record_chunk(&self, bytes: u64) {
        self.chunks_scanned.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!("Chunk read {} bytes, total: {} bytes", bytes, total);
    }

    /// Records a chunk whose handle could not be used
    pub fn record_chunk_failure(&self) {
        self.chunk_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            chunks_scanned: self.chunks_scanned.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Files scanned: {}\n\
             Chunks scanned/failed: {}/{}\n\
             Bytes read: {}",
            stats.files_scanned, stats.chunks_scanned, stats.chunk_failures, stats.bytes_read
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub files_scanned: u64,
    pub chunks_scanned: u64,
    pub chunk_failures: u64,
    pub bytes_read: u64,
}

/// CPU time and peak resident memory of the calling process.
///
/// Only the caller's own accounting is sampled. Child processes that have
/// already been reaped are not included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    /// User plus system CPU time
    #[serde(serialize_with = "serialize_micros")]
    pub cpu_time: Duration,
    /// Peak resident set size in kilobytes
    pub peak_memory_kb: u64,
}

impl ResourceUsage {
    #[cfg(unix)]
    pub fn current() -> Self {
        let mut usage = MaybeUninit::<libc::rusage>::uninit();
        // SAFETY: getrusage fills the whole struct when it returns 0
        if unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) } != 0 {
            debug!(
                "getrusage failed: {}",
                std::io::Error::last_os_error()
            );
            return Self::default();
        }
        // SAFETY: checked the return value above
        let usage = unsafe { usage.assume_init() };

        let cpu_time = timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime);
        Self {
            cpu_time,
            peak_memory_kb: max_rss_kb(usage.ru_maxrss as u64),
        }
    }

    #[cfg(not(unix))]
    pub fn current() -> Self {
        Self::default()
    }
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

// macOS reports ru_maxrss in bytes, Linux in kilobytes
#[cfg(all(unix, target_os = "macos"))]
fn max_rss_kb(raw: u64) -> u64 {
    raw / 1024
}

#[cfg(all(unix, not(target_os = "macos")))]
fn max_rss_kb(raw: u64) -> u64 {
    raw
}

pub(crate) fn serialize_micros<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_micros() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_tracking() {
        let metrics = ScanMetrics::new();

        metrics.record_file();
        metrics.record_chunk(1000);
        metrics.record_chunk(500);
        metrics.record_chunk_failure();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.chunks_scanned, 2);
        assert_eq!(stats.chunk_failures, 1);
        assert_eq!(stats.bytes_read, 1500);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ScanMetrics::default();
        let clone = metrics.clone();
        clone.record_chunk(42);
        assert_eq!(metrics.get_stats().bytes_read, 42);
    }

    #[cfg(unix)]
    #[test]
    fn test_resource_usage_is_sampled() {
        // Burn a little CPU so the counters are non-zero
        let mut acc = 0u64;
        for i in 0..2_000_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        std::hint::black_box(acc);

        let usage = ResourceUsage::current();
        assert!(usage.peak_memory_kb > 0);
    }
}
