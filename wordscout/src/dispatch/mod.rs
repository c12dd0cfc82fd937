//! Tier-1 fan-out: one isolated worker unit per file.
//!
//! A [`Dispatcher`] turns a [`SearchTask`] into a running worker and hands back a
//! [`WorkerHandle`]. The handle owns the read side of a one-shot result channel and
//! whatever is needed to reap the worker afterwards. Workers never share mutable
//! state with the coordinator or with each other; the single count sent over the
//! channel is the only thing that crosses the boundary.
//!
//! Two backends are provided:
//!
//! - [`ProcessDispatcher`] runs each file in a child process with its own address
//!   space. The child writes its count to stdout as [`RESULT_WIDTH`] little-endian
//!   bytes and exits.
//! - [`ThreadDispatcher`] runs each file on a dedicated thread with its own scanner
//!   state and reports through a bounded channel of capacity one.

pub mod process;
pub mod thread;
pub mod worker;

pub use process::ProcessDispatcher;
pub use thread::ThreadDispatcher;
pub use worker::{decode_count, encode_count, run_worker, RESULT_WIDTH};

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{CountConfig, SeamMode};
use crate::errors::{SearchError, SearchResult};

/// One file to scan for one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTask {
    pub file_path: PathBuf,
    pub pattern: String,
}

impl SearchTask {
    pub fn new(file_path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            pattern: pattern.into(),
        }
    }
}

/// Per-file scan settings shared by every worker of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub thread_count: NonZeroUsize,
    pub seam_mode: SeamMode,
}

impl From<&CountConfig> for ScanSettings {
    fn from(config: &CountConfig) -> Self {
        Self {
            thread_count: config.thread_count,
            seam_mode: config.seam_mode,
        }
    }
}

/// Launches isolated worker units
pub trait Dispatcher {
    /// Starts a worker for `task` without waiting for it
    fn dispatch(&self, task: &SearchTask) -> SearchResult<WorkerHandle>;
}

/// Point in time after which outstanding workers are abandoned
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn starting_now(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

#[derive(Debug)]
enum WorkerUnit {
    Process(Child),
    Thread(JoinHandle<()>),
}

/// Coordinator-side handle to a running worker
#[derive(Debug)]
pub struct WorkerHandle {
    path: PathBuf,
    results: Receiver<SearchResult<u64>>,
    unit: WorkerUnit,
}

impl WorkerHandle {
    pub(crate) fn for_process(
        path: PathBuf,
        results: Receiver<SearchResult<u64>>,
        child: Child,
    ) -> Self {
        Self {
            path,
            results,
            unit: WorkerUnit::Process(child),
        }
    }

    pub(crate) fn for_thread(
        path: PathBuf,
        results: Receiver<SearchResult<u64>>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            path,
            results,
            unit: WorkerUnit::Thread(handle),
        }
    }

    /// The file this worker scans
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks for the worker's single result
    pub fn recv(&self, deadline: Option<&Deadline>) -> SearchResult<u64> {
        let received = match deadline {
            None => self.results.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => self.results.recv_timeout(deadline.remaining()),
        };

        match received {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SearchError::timeout(
                &self.path,
                deadline.map(Deadline::budget).unwrap_or_default(),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(SearchError::worker_failed(
                &self.path,
                "worker exited without reporting a count",
            )),
        }
    }

    /// Waits for the worker to terminate
    pub fn reap(self) -> SearchResult<()> {
        match self.unit {
            WorkerUnit::Process(mut child) => {
                let status = child.wait()?;
                debug!("Reaped worker for {}: {}", self.path.display(), status);
                if status.success() {
                    Ok(())
                } else {
                    Err(SearchError::worker_failed(&self.path, status.to_string()))
                }
            }
            WorkerUnit::Thread(handle) => handle
                .join()
                .map_err(|_| SearchError::worker_failed(&self.path, "worker thread panicked")),
        }
    }

    /// Stops waiting for the worker. A child process is killed and reaped;
    /// a thread cannot be interrupted and is left to finish on its own.
    pub fn abort(self) {
        match self.unit {
            WorkerUnit::Process(mut child) => {
                if let Err(e) = child.kill() {
                    debug!("Worker for {} already gone: {}", self.path.display(), e);
                }
                let _ = child.wait();
            }
            WorkerUnit::Thread(_) => {
                warn!(
                    "Detaching worker thread for {}; it will finish in the background",
                    self.path.display()
                );
            }
        }
    }
}
