pub mod config;
pub mod dispatch;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;

pub use self::config::{CountConfig, SeamMode};
pub use dispatch::{Dispatcher, ProcessDispatcher, ScanSettings, SearchTask, ThreadDispatcher};
pub use errors::{SearchError, SearchResult};
pub use results::{AggregateReport, FileResult};
pub use search::{count, Coordinator};
