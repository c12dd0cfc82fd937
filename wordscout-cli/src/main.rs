mod prompt;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::{
    io::{self, Write},
    num::NonZeroUsize,
    path::PathBuf,
    time::Duration,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wordscout::{
    config::CliOverrides,
    dispatch::{run_worker, Dispatcher},
    AggregateReport, Coordinator, CountConfig, ProcessDispatcher, ScanSettings, SearchError,
    SearchTask, SeamMode, ThreadDispatcher,
};

type Result<T> = std::result::Result<T, SearchError>;

const RULE: &str = "------------------------------------------------------------------";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliCountConfig {
    /// Word to count; prompted for when omitted
    #[arg(short = 'p', long, allow_hyphen_values = true)]
    pattern: Option<String>,

    /// Files to scan (default: the built-in corpus list)
    files: Vec<PathBuf>,

    /// Threads per file
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// How matches across chunk seams are handled (exact|approximate)
    #[arg(long)]
    seam_mode: Option<SeamMode>,

    /// Run each file on a thread instead of a child process
    #[arg(long)]
    in_process: bool,

    /// Give up after this long (e.g. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count occurrences of a word across files
    Count(Box<CliCountConfig>),

    /// Scan one file and write its count to stdout
    #[command(hide = true)]
    Worker {
        #[arg(long, allow_hyphen_values = true)]
        file: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        pattern: String,

        #[arg(long, default_value = "4")]
        threads: NonZeroUsize,

        #[arg(long, default_value = "exact")]
        seam_mode: SeamMode,

        #[arg(long, default_value = "warn")]
        log_level: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Count(args) => {
            let overrides = CliOverrides {
                pattern: args.pattern.clone(),
                files: args.files.clone(),
                thread_count: args.threads,
                seam_mode: args.seam_mode,
                timeout: args.timeout,
                log_level: args.log_level.clone(),
            };
            let mut config = CountConfig::load_from(args.config.as_deref())?
                .merge_with_cli(overrides)
                .with_default_files();
            init_tracing(&config.log_level);
            debug!("Effective configuration: {:?}", config);

            if config.pattern.is_empty() {
                let stdin = io::stdin();
                // Keep stdout pure JSON
                config.pattern = if args.json {
                    prompt::prompt_for_word(stdin.lock(), &mut io::stderr())?
                } else {
                    prompt::prompt_for_word(stdin.lock(), &mut io::stdout())?
                };
            }

            let settings = ScanSettings::from(&config);
            let dispatcher: Box<dyn Dispatcher> = if args.in_process {
                Box::new(ThreadDispatcher::new(settings))
            } else {
                Box::new(
                    ProcessDispatcher::current_exe(settings)?.with_log_level(&config.log_level),
                )
            };

            let report = Coordinator::new(config).run(dispatcher.as_ref())?;
            if args.json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Commands::Worker {
            file,
            pattern,
            threads,
            seam_mode,
            log_level,
        } => {
            init_tracing(&log_level);
            let task = SearchTask::new(file, pattern);
            let settings = ScanSettings {
                thread_count: threads,
                seam_mode,
            };
            let stdout = io::stdout();
            run_worker(&task, settings, &mut stdout.lock())?;
            Ok(())
        }
    }
}

/// Logs go to stderr; stdout carries the report and the worker result pipe
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn print_report(report: &AggregateReport) {
    for result in &report.per_file {
        println!(
            "File {}: {} occurrences of the word '{}'",
            result.path.display().to_string().blue(),
            result.count,
            report.pattern
        );
    }

    println!("{}", RULE);
    println!(
        "Total time taken: {} microseconds",
        report.elapsed.as_micros()
    );
    println!(
        "Total CPU time taken: {} microseconds",
        report.usage.cpu_time.as_micros()
    );
    println!(
        "Maximum memory usage: {} kilobytes",
        report.usage.peak_memory_kb
    );
    println!("{}", RULE);
    println!(
        "TOTAL OCCURRENCES OF '{}' ACROSS ALL FILES: {}",
        report.pattern,
        report.total.to_string().green()
    );
}

fn print_json(report: &AggregateReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::from)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}
