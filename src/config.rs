//! Search configuration.
//!
//! [`SearchConfig`] holds the knobs the workers read. The binary builds one by
//! layering, lowest precedence first: built-in defaults, an optional TOML file,
//! then command-line flags. See [`Settings::resolve`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::Deserialize;

use crate::error::{Error, Result};

// ============================================================================
// Search configuration
// ============================================================================

/// How a worker draws its next candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Greedy pairwise-swap hill climbing with periodic restarts.
    #[default]
    LocalSearch,
    /// Independent uniform samples, bounded by a case budget.
    RandomSample,
}

impl Strategy {
    /// Name used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalSearch => "local-search",
            Self::RandomSample => "random-sample",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search configuration parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Search budget, measured from coordinator start.
    pub max_time: Duration,
    /// Extra time after `max_time` so the last reconciliation can finish.
    pub buffer: Duration,
    /// Cadence at which workers reconcile with the shared best.
    pub update_interval: Duration,
    /// Cadence at which local-search workers restart their incumbent.
    pub restart_interval: Duration,
    /// Probability that a restart draws a fresh random candidate instead of
    /// pulling the shared best.
    pub restart_probability: f64,
    /// Number of workers. `None` means one per available hardware thread.
    pub workers: Option<usize>,
    /// Upper bound applied after resolving `workers`.
    pub max_workers: Option<usize>,
    /// Optional deterministic base seed.
    pub seed: Option<u64>,
    /// Candidate generation strategy.
    pub strategy: Strategy,
    /// Total number of samples for [`Strategy::RandomSample`]. `None` means `N!`.
    pub case_budget: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(60),
            buffer: Duration::from_secs(1),
            update_interval: Duration::from_secs(5),
            restart_interval: Duration::from_secs(10),
            restart_probability: 0.5,
            workers: None,
            max_workers: None,
            seed: None,
            strategy: Strategy::LocalSearch,
            case_budget: None,
        }
    }
}

impl SearchConfig {
    /// Checks that every parameter is in range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.update_interval.is_zero() {
            return Err(Error::invalid_config("update_interval must be positive"));
        }
        if self.restart_interval.is_zero() {
            return Err(Error::invalid_config("restart_interval must be positive"));
        }
        if !(0.0..=1.0).contains(&self.restart_probability) {
            return Err(Error::invalid_config(format!(
                "restart_probability must be in [0, 1], got {}",
                self.restart_probability
            )));
        }
        if self.workers == Some(0) {
            return Err(Error::invalid_config("workers must be at least 1"));
        }
        if self.max_workers == Some(0) {
            return Err(Error::invalid_config("max_workers must be at least 1"));
        }
        if self.case_budget == Some(0) {
            return Err(Error::invalid_config("case_budget must be at least 1"));
        }
        Ok(())
    }

    /// Resolved worker count: `workers`, else hardware parallelism, then capped.
    pub fn worker_count(&self) -> usize {
        let requested = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(1)
        });
        match self.max_workers {
            Some(cap) => requested.min(cap),
            None => requested,
        }
    }

    /// Wall-clock limit for every worker: `max_time + buffer` for local search,
    /// `max_time` alone for random sampling.
    pub fn deadline(&self) -> Duration {
        match self.strategy {
            Strategy::LocalSearch => self.max_time.saturating_add(self.buffer),
            Strategy::RandomSample => self.max_time,
        }
    }
}

/// Converts a user-supplied number of seconds into a [`Duration`].
///
/// # Errors
/// Returns [`Error::InvalidConfig`] for negative, NaN or infinite values.
pub fn seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::invalid_config(format!(
            "{name} must be a finite, non-negative number of seconds, got {secs}"
        ))
    })
}

// ============================================================================
// Logging level
// ============================================================================

/// Verbosity of stderr diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Run milestones.
    Info,
    /// Per-worker detail.
    Debug,
    /// Everything.
    Trace,
    /// Silence.
    Off,
}

impl LogLevel {
    /// Maps to the `log` crate's filter.
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

// ============================================================================
// Config file
// ============================================================================

/// On-disk TOML configuration. Every field is optional.
///
/// ```toml
/// input = "racks/lab.txt"
///
/// [search]
/// max_time = 120
/// restart_probability = 0.3
/// strategy = "local-search"
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Instance file.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// `[search]` table.
    #[serde(default)]
    pub search: SearchSection,
    /// `[logging]` table.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[search]` table. Durations are in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(missing_docs)]
pub struct SearchSection {
    pub max_time: Option<f64>,
    pub buffer: Option<f64>,
    pub update_interval: Option<f64>,
    pub restart_interval: Option<f64>,
    pub restart_probability: Option<f64>,
    pub workers: Option<usize>,
    pub max_workers: Option<usize>,
    pub seed: Option<u64>,
    pub strategy: Option<Strategy>,
    pub case_budget: Option<u64>,
}

/// `[logging]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Log level.
    pub level: Option<LogLevel>,
    /// Prefix log lines with a millisecond timestamp.
    pub timestamps: Option<bool>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    /// Returns [`Error::Toml`] on syntax errors or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Toml`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

// ============================================================================
// Command line
// ============================================================================

/// Command-line arguments. Flags override the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "cable-search", version)]
#[command(about = "Search for the device order with the shortest total cable length")]
pub struct Args {
    /// Instance file, one `DEVICE DEVICE CABLES` relation per line (default: bundled 15-device rack)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Search budget in seconds
    #[arg(short = 't', long)]
    pub max_time: Option<f64>,

    /// Grace period after the budget, in seconds
    #[arg(long)]
    pub buffer: Option<f64>,

    /// Seconds between reconciliations with the shared best
    #[arg(short, long)]
    pub update_interval: Option<f64>,

    /// Seconds between restarts
    #[arg(short, long)]
    pub restart_interval: Option<f64>,

    /// Probability that a restart reshuffles instead of pulling the shared best
    #[arg(short = 'p', long)]
    pub restart_probability: Option<f64>,

    /// Number of workers (default: available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Upper bound on the number of workers
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Deterministic base seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Candidate generation strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Total samples for random-sample (default: N!)
    #[arg(long)]
    pub case_budget: Option<u64>,

    /// Log level for stderr diagnostics
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Validate the bundled instances and exit
    #[arg(long, alias = "test")]
    pub validate: bool,
}

/// Fully resolved settings for one run of the binary.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Search parameters, validated.
    pub search: SearchConfig,
    /// Instance file, if any.
    pub input: Option<PathBuf>,
    /// Log level.
    pub log_level: LogLevel,
    /// Whether log lines carry timestamps.
    pub log_timestamps: bool,
}

impl Settings {
    /// Loads the config file named by `args` (if any) and layers `args` over it.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed, or if the
    /// merged configuration is invalid.
    pub fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::layer(&file, args)
    }

    /// Layers command-line flags over a parsed config file over defaults.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the merged configuration is invalid.
    pub fn layer(file: &FileConfig, args: &Args) -> Result<Self> {
        let f = &file.search;
        let mut search = SearchConfig::default();

        if let Some(secs) = args.max_time.or(f.max_time) {
            search.max_time = seconds("max_time", secs)?;
        }
        if let Some(secs) = args.buffer.or(f.buffer) {
            search.buffer = seconds("buffer", secs)?;
        }
        if let Some(secs) = args.update_interval.or(f.update_interval) {
            search.update_interval = seconds("update_interval", secs)?;
        }
        if let Some(secs) = args.restart_interval.or(f.restart_interval) {
            search.restart_interval = seconds("restart_interval", secs)?;
        }
        if let Some(p) = args.restart_probability.or(f.restart_probability) {
            search.restart_probability = p;
        }
        search.workers = args.workers.or(f.workers);
        search.max_workers = args.max_workers.or(f.max_workers);
        search.seed = args.seed.or(f.seed);
        if let Some(strategy) = args.strategy.or(f.strategy) {
            search.strategy = strategy;
        }
        search.case_budget = args.case_budget.or(f.case_budget);
        search.validate()?;

        Ok(Self {
            search,
            input: args.input.clone().or_else(|| file.input.clone()),
            log_level: args.log_level.or(file.logging.level).unwrap_or_default(),
            log_timestamps: file.logging.timestamps.unwrap_or(true),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
