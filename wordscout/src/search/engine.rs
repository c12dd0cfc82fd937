use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CountConfig;
use crate::dispatch::{Deadline, Dispatcher, ScanSettings, SearchTask, ThreadDispatcher};
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ResourceUsage;
use crate::results::{AggregateReport, FileResult};

/// Runs one counting job across all configured files
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: CountConfig,
}

impl Coordinator {
    pub fn new(config: CountConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CountConfig {
        &self.config
    }

    /// Runs with one in-process thread per file
    pub fn run_in_process(&self) -> SearchResult<AggregateReport> {
        self.run(&ThreadDispatcher::new(ScanSettings::from(&self.config)))
    }

    /// Dispatches every file, collects the counts in file order, then reaps
    /// every worker before reporting.
    ///
    /// Results are read in the order the files were configured, not the order
    /// they finish. Any worker failure fails the run, but only after all
    /// workers have been reaped. When the deadline expires the remaining
    /// workers are aborted instead.
    pub fn run(&self, dispatcher: &dyn Dispatcher) -> SearchResult<AggregateReport> {
        self.config.validate()?;
        let pattern = &self.config.pattern;
        info!(
            "Counting '{}' in {} files with {} threads each",
            pattern,
            self.config.files.len(),
            self.config.thread_count
        );

        let started = Instant::now();
        let deadline = self.config.timeout.map(Deadline::starting_now);

        let mut handles = Vec::with_capacity(self.config.files.len());
        for path in &self.config.files {
            match dispatcher.dispatch(&SearchTask::new(path, pattern.as_str())) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!("Dispatch failed for {}, aborting run", path.display());
                    handles.into_iter().for_each(|h| h.abort());
                    return Err(e);
                }
            }
        }
        debug!("Dispatched {} workers", handles.len());

        let mut report = AggregateReport::new(pattern.as_str());
        let mut failure: Option<SearchError> = None;
        for handle in &handles {
            match handle.recv(deadline.as_ref()) {
                Ok(count) => {
                    debug!("{}: {}", handle.path().display(), count);
                    report.add_file_result(FileResult::new(handle.path(), count));
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let timed_out = matches!(failure, Some(SearchError::Timeout { .. }));
        for handle in handles {
            if timed_out {
                handle.abort();
            } else if let Err(e) = handle.reap() {
                failure.get_or_insert(e);
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let elapsed = started.elapsed();
        report.finalize(elapsed, ResourceUsage::current());
        info!(
            "Count complete. {} occurrences in {} of {} files ({} µs)",
            report.total,
            report.files_with_matches(),
            report.per_file.len(),
            elapsed.as_micros()
        );
        Ok(report)
    }
}

/// Counts `config.pattern` across `config.files` using in-process workers
pub fn count(config: &CountConfig) -> SearchResult<AggregateReport> {
    Coordinator::new(config.clone()).run_in_process()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeamMode;
    use crate::dispatch::WorkerHandle;
    use std::collections::HashMap;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;
    use std::sync::mpsc::sync_channel;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_two_files_total() {
        let dir = tempdir().unwrap();
        let five = dir.path().join("five.txt");
        let zero = dir.path().join("zero.txt");
        std::fs::write(&five, "word\nword word\nsome text\nword\nword\n").unwrap();
        std::fs::write(&zero, "nothing to see here\n").unwrap();

        let config = CountConfig::new("word", vec![five.clone(), zero.clone()]);
        let report = count(&config).unwrap();

        assert_eq!(report.counts(), vec![5, 0]);
        assert_eq!(report.total, 5);
        assert_eq!(report.total, report.counts().iter().sum::<u64>());
        assert_eq!(report.per_file[0].path, five);
        assert_eq!(report.per_file[1].path, zero);
        assert_eq!(report.pattern, "word");
    }

    #[test]
    fn test_runs_are_idempotent() {
        let dir = tempdir().unwrap();
        let files: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("f{}.txt", i));
                std::fs::write(&path, "the quick brown fox\n".repeat(50 * (i + 1))).unwrap();
                path
            })
            .collect();

        let mut config = CountConfig::new("the", files);
        config.thread_count = NonZeroUsize::new(3).unwrap();
        config.seam_mode = SeamMode::Approximate;

        let first = count(&config).unwrap();
        let second = count(&config).unwrap();
        assert_eq!(first.per_file, second.per_file);
        assert_eq!(first.total, second.total);
    }

    #[test]
    fn test_missing_file_fails_run() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.txt");
        std::fs::write(&present, "word").unwrap();

        let config = CountConfig::new("word", vec![present, dir.path().join("absent.txt")]);
        assert!(matches!(
            count(&config),
            Err(SearchError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_empty_pattern_rejected_before_dispatch() {
        let config = CountConfig::new("", vec![PathBuf::from("a.txt")]);
        assert!(matches!(count(&config), Err(SearchError::EmptyPattern)));
    }

    /// Sleeps per file before reporting the delay in milliseconds as the count
    struct SlowDispatcher {
        delays: HashMap<PathBuf, Duration>,
        fallback: Duration,
        finished: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl SlowDispatcher {
        fn uniform(delay: Duration) -> Self {
            Self {
                delays: HashMap::new(),
                fallback: delay,
                finished: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn with_delay(mut self, path: &str, delay: Duration) -> Self {
            self.delays.insert(PathBuf::from(path), delay);
            self
        }

        fn completion_order(&self) -> Vec<PathBuf> {
            self.finished.lock().unwrap().clone()
        }
    }

    impl Dispatcher for SlowDispatcher {
        fn dispatch(&self, task: &SearchTask) -> SearchResult<WorkerHandle> {
            let (tx, rx) = sync_channel(1);
            let delay = self
                .delays
                .get(&task.file_path)
                .copied()
                .unwrap_or(self.fallback);
            let finished = Arc::clone(&self.finished);
            let path = task.file_path.clone();
            let handle = thread::spawn(move || {
                thread::sleep(delay);
                finished.lock().unwrap().push(path);
                let _ = tx.send(Ok(delay.as_millis() as u64));
            });
            Ok(WorkerHandle::for_thread(task.file_path.clone(), rx, handle))
        }
    }

    #[test]
    fn test_deadline_expires() {
        let mut config = CountConfig::new("x", vec![PathBuf::from("slow.txt")]);
        config.timeout = Some(Duration::from_millis(50));

        let result = Coordinator::new(config).run(&SlowDispatcher::uniform(Duration::from_secs(2)));
        assert!(matches!(result, Err(SearchError::Timeout { .. })));
    }

    #[test]
    fn test_results_reported_in_file_order() {
        let mut config = CountConfig::new(
            "x",
            vec![PathBuf::from("first.txt"), PathBuf::from("second.txt")],
        );
        config.timeout = Some(Duration::from_secs(10));

        // The first file finishes last
        let dispatcher = SlowDispatcher::uniform(Duration::from_millis(10))
            .with_delay("first.txt", Duration::from_millis(300));
        let report = Coordinator::new(config).run(&dispatcher).unwrap();

        assert_eq!(
            dispatcher.completion_order(),
            vec![PathBuf::from("second.txt"), PathBuf::from("first.txt")]
        );
        assert_eq!(report.per_file[0].path, PathBuf::from("first.txt"));
        assert_eq!(report.per_file[1].path, PathBuf::from("second.txt"));
        assert_eq!(report.counts(), vec![300, 10]);
        assert_eq!(report.total, 310);
    }
}
