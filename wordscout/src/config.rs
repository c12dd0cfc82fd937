use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};

/// Threads per file when nothing else is configured
pub const DEFAULT_THREAD_COUNT: usize = 4;

/// Corpus scanned when no files are given on the command line or in a config file
pub const DEFAULT_FILES: [&str; 7] = [
    "bib.txt",
    "paper1.txt",
    "paper2.txt",
    "progc.txt",
    "progl.txt",
    "progp.txt",
    "trans.txt",
];

/// How a chunk worker treats occurrences that straddle a chunk seam
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeamMode {
    /// Read `pattern_len - 1` bytes past the chunk end and count only matches
    /// that start inside the chunk. Each occurrence is counted once.
    #[default]
    Exact,
    /// Line-granular reads that may run past the chunk end. Seam text can be
    /// counted by both neighbours, and lines longer than the read buffer can
    /// split an occurrence.
    Approximate,
}

impl FromStr for SeamMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(SeamMode::Exact),
            "approximate" | "approx" => Ok(SeamMode::Approximate),
            other => Err(SearchError::config_error(format!(
                "Unknown seam mode '{}' (expected exact|approximate)",
                other
            ))),
        }
    }
}

impl fmt::Display for SeamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeamMode::Exact => write!(f, "exact"),
            SeamMode::Approximate => write!(f, "approximate"),
        }
    }
}

/// Configuration for a counting run.
///
/// Loaded from YAML, lowest precedence first:
/// 1. Global `$CONFIG_DIR/wordscout/config.yaml`
/// 2. Local `.wordscout.yaml` in the current directory
/// 3. A file given with `--config`
///
/// ```yaml
/// pattern: "the"
/// files:
///   - "bib.txt"
///   - "paper1.txt"
/// thread_count: 4
/// seam_mode: exact      # or approximate
/// timeout: "30s"        # optional, humantime syntax
/// log_level: "warn"
/// ```
///
/// Command-line values win over file values; see [`CountConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountConfig {
    /// Literal byte pattern to count
    #[serde(default)]
    pub pattern: String,

    /// Files to scan, one isolated worker each
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Threads (and chunks) per file
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    #[serde(default)]
    pub seam_mode: SeamMode,

    /// Deadline for the whole run; no deadline when unset
    #[serde(default, with = "humantime_opt")]
    pub timeout: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_THREAD_COUNT).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            files: Vec::new(),
            thread_count: default_thread_count(),
            seam_mode: SeamMode::default(),
            timeout: None,
            log_level: default_log_level(),
        }
    }
}

impl CountConfig {
    /// Creates a config for `pattern` over `files` with default settings
    pub fn new(pattern: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            files,
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("wordscout/config.yaml")),
            Some(PathBuf::from(".wordscout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments over configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if !cli.files.is_empty() {
            self.files = cli.files;
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        if let Some(mode) = cli.seam_mode {
            self.seam_mode = mode;
        }
        if cli.timeout.is_some() {
            self.timeout = cli.timeout;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Falls back to [`DEFAULT_FILES`] when no files are configured
    pub fn with_default_files(mut self) -> Self {
        if self.files.is_empty() {
            self.files = DEFAULT_FILES.iter().map(PathBuf::from).collect();
        }
        self
    }

    /// Checks the settings every run needs
    pub fn validate(&self) -> SearchResult<()> {
        if self.pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        if self.files.is_empty() {
            return Err(SearchError::config_error("No files to scan"));
        }
        Ok(())
    }
}

/// Values supplied on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub pattern: Option<String>,
    pub files: Vec<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub seam_mode: Option<SeamMode>,
    pub timeout: Option<Duration>,
    pub log_level: Option<String>,
}

mod humantime_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&humantime::format_duration(*d).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
