//! Error types for wordscout.
//!
//! Every fallible operation returns [`SearchResult`]. The variants split into two groups:
//!
//! 1. **Fatal errors** abort the whole run: a file that cannot be stat'd, a thread pool or
//!    worker that cannot be created, a worker that dies without reporting, or a deadline
//!    that expires.
//! 2. **Configuration errors** are caught before any worker is launched: an empty pattern,
//!    a bad config file, an unknown seam mode.
//!
//! A chunk worker that cannot open its own handle is *not* an error at this level. It is
//! logged and contributes zero to its file's count.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for counting operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while counting
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Search pattern must not be empty")]
    EmptyPattern,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
    #[error("Failed to spawn worker for {path}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Worker for {path} failed: {reason}")]
    WorkerFailed { path: PathBuf, reason: String },
    #[error("Worker for {path} did not finish within {after:?}")]
    Timeout { path: PathBuf, after: Duration },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn thread_pool(msg: impl Into<String>) -> Self {
        Self::ThreadPool(msg.into())
    }

    pub fn spawn(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Spawn {
            path: path.into(),
            source,
        }
    }

    pub fn worker_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(path: impl Into<PathBuf>, after: Duration) -> Self {
        Self::Timeout {
            path: path.into(),
            after,
        }
    }

    /// Maps an IO error on `path` to the most specific variant
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let path = Path::new("test.txt");
        let err = SearchError::file_not_found(path);
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::permission_denied(path);
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::worker_failed(path, "exit status: 1");
        assert!(matches!(err, SearchError::WorkerFailed { .. }));

        let err = SearchError::timeout(path, Duration::from_secs(1));
        assert!(matches!(err, SearchError::Timeout { .. }));
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let err = SearchError::from_io(
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::from_io(
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::from_io("a.txt", std::io::Error::other("disk on fire"));
        assert!(matches!(err, SearchError::IoError(_)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SearchError::EmptyPattern.to_string(),
            "Search pattern must not be empty"
        );

        let err = SearchError::config_error("Missing required field".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = SearchError::file_not_found("test.txt");
        assert_eq!(err.to_string(), "File not found: test.txt");

        let err = SearchError::worker_failed("bib.txt", "no result written");
        assert_eq!(err.to_string(), "Worker for bib.txt failed: no result written");
    }
}
