use std::io;
use std::sync::mpsc::sync_channel;
use std::thread;
use tracing::debug;

use super::{run_worker, Dispatcher, ScanSettings, SearchTask, WorkerHandle};
use crate::errors::{SearchError, SearchResult};

/// Runs each file on its own OS thread.
///
/// Every thread builds its own matcher, scanner and thread pool, so no
/// accumulator is shared between files.
#[derive(Debug, Clone, Copy)]
pub struct ThreadDispatcher {
    settings: ScanSettings,
}

impl ThreadDispatcher {
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }
}

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, task: &SearchTask) -> SearchResult<WorkerHandle> {
        let (tx, rx) = sync_channel(1);
        let settings = self.settings;
        let worker_task = task.clone();

        let handle = thread::Builder::new()
            .name(format!("wordscout-file-{}", task.file_path.display()))
            .spawn(move || {
                let result = run_worker(&worker_task, settings, &mut io::sink());
                // The coordinator may have given up on us already
                let _ = tx.send(result);
            })
            .map_err(|e| SearchError::spawn(&task.file_path, e))?;

        debug!("Dispatched thread worker for {}", task.file_path.display());
        Ok(WorkerHandle::for_thread(task.file_path.clone(), rx, handle))
    }
}
