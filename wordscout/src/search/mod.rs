//! Occurrence counting, from a single buffer up to a whole run.
//!
//! The pieces nest leaf-first:
//!
//! 1. [`PatternMatcher`] counts non-overlapping literal matches in a byte buffer.
//! 2. [`ChunkWorker`] opens its own handle on a file and counts one [`ByteRange`].
//! 3. [`FileScanner`] partitions a file into one range per thread, runs a chunk worker
//!    per range on a dedicated rayon pool, and folds the partial counts after join.
//! 4. [`Coordinator`] dispatches one isolated worker per file, collects the counts in
//!    file order, reaps every worker and builds the [`AggregateReport`].
//!
//! ```rust,ignore
//! let config = CountConfig::new("the", vec!["bib.txt".into(), "paper1.txt".into()]);
//! let report = Coordinator::new(config).run_in_process()?;
//! println!("{} occurrences", report.total);
//! ```
//!
//! [`AggregateReport`]: crate::results::AggregateReport

pub mod chunk;
pub mod engine;
pub mod matcher;
pub mod scanner;

pub use chunk::{partition, ByteRange, ChunkResult, ChunkWorker};
pub use engine::{count, Coordinator};
pub use matcher::{count_occurrences, PatternMatcher};
pub use scanner::FileScanner;
