use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{ChildStdout, Command, Stdio};
use std::sync::mpsc::sync_channel;
use std::thread;
use tracing::debug;

use super::{decode_count, Dispatcher, ScanSettings, SearchTask, WorkerHandle, RESULT_WIDTH};
use crate::errors::{SearchError, SearchResult};

/// Subcommand the worker binary must accept
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Runs each file in a child process.
///
/// The child is started as
/// `<program> worker --file <path> --pattern <pattern> --threads <n> --seam-mode <mode>`
/// and must write its count to stdout as [`RESULT_WIDTH`] little-endian bytes.
/// Its stderr is inherited so worker diagnostics reach the terminal.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    program: PathBuf,
    settings: ScanSettings,
    log_level: Option<String>,
}

impl ProcessDispatcher {
    pub fn new(program: impl Into<PathBuf>, settings: ScanSettings) -> Self {
        Self {
            program: program.into(),
            settings,
            log_level: None,
        }
    }

    /// Uses the running executable as the worker program
    pub fn current_exe(settings: ScanSettings) -> SearchResult<Self> {
        Ok(Self::new(std::env::current_exe()?, settings))
    }

    /// Log level handed to each worker
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Arguments for the worker invocation of `task`
    pub fn worker_args(&self, task: &SearchTask) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            WORKER_SUBCOMMAND.into(),
            "--file".into(),
            task.file_path.clone().into_os_string(),
            "--pattern".into(),
            task.pattern.clone().into(),
            "--threads".into(),
            self.settings.thread_count.to_string().into(),
            "--seam-mode".into(),
            self.settings.seam_mode.to_string().into(),
        ];
        if let Some(level) = &self.log_level {
            args.push("--log-level".into());
            args.push(level.into());
        }
        args
    }
}

impl Dispatcher for ProcessDispatcher {
    fn dispatch(&self, task: &SearchTask) -> SearchResult<WorkerHandle> {
        let mut child = Command::new(&self.program)
            .args(self.worker_args(task))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SearchError::spawn(&task.file_path, e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SearchError::worker_failed(&task.file_path, "worker stdout was not captured")
        })?;

        // Forward the pipe into a channel so the coordinator can wait with a deadline
        let (tx, rx) = sync_channel(1);
        let path = task.file_path.clone();
        let reader_path = path.clone();
        let spawned = thread::Builder::new()
            .name(format!("wordscout-pipe-{}", child.id()))
            .spawn(move || {
                let _ = tx.send(read_count(stdout, &reader_path));
            });
        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SearchError::spawn(&path, e));
        }

        debug!("Dispatched worker {} for {}", child.id(), path.display());
        Ok(WorkerHandle::for_process(path, rx, child))
    }
}

/// Reads exactly one count from a worker's stdout, then closes it
fn read_count(mut stdout: ChildStdout, path: &std::path::Path) -> SearchResult<u64> {
    let mut bytes = [0u8; RESULT_WIDTH];
    match stdout.read_exact(&mut bytes) {
        Ok(()) => Ok(decode_count(bytes)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(SearchError::worker_failed(
            path,
            "worker exited without reporting a count",
        )),
        Err(e) => Err(SearchError::IoError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeamMode;
    use std::num::NonZeroUsize;

    fn settings() -> ScanSettings {
        ScanSettings {
            thread_count: NonZeroUsize::new(3).unwrap(),
            seam_mode: SeamMode::Approximate,
        }
    }

    #[test]
    fn test_worker_args() {
        let dispatcher = ProcessDispatcher::new("wordscout-cli", settings()).with_log_level("debug");
        let args = dispatcher.worker_args(&SearchTask::new("bib.txt", "-the"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            vec![
                "worker",
                "--file",
                "bib.txt",
                "--pattern",
                "-the",
                "--threads",
                "3",
                "--seam-mode",
                "approximate",
                "--log-level",
                "debug",
            ]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dispatcher = ProcessDispatcher::new("/definitely/not/a/real/program", settings());
        let result = dispatcher.dispatch(&SearchTask::new("bib.txt", "the"));
        assert!(matches!(result, Err(SearchError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_worker_is_reported() {
        // `true` exits 0 without writing anything
        let dispatcher = ProcessDispatcher::new("true", settings());
        let handle = dispatcher
            .dispatch(&SearchTask::new("bib.txt", "the"))
            .unwrap();
        assert!(matches!(
            handle.recv(None),
            Err(SearchError::WorkerFailed { .. })
        ));
        handle.reap().unwrap();
    }
}
