//! Crate-wide error type.

use thiserror::Error as ThisError;

/// Errors raised while loading an instance, configuring a run, or starting workers.
///
/// Nothing in here is produced mid-search: instances and configs are checked up
/// front, and a worker that panics is excluded from aggregation rather than
/// surfaced as an error.
#[derive(Debug, ThisError)]
pub enum Error {
    /// I/O failure while reading an instance or config file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// TOML config file did not parse.
    #[error("config file: {0}")]
    Toml(#[from] toml::de::Error),
    /// The worker pool could not be built (thread spawn failure).
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Instance text could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong on that line.
        message: String,
    },
    /// Instance parsed but is not a valid problem.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
    /// A candidate is not a bijection over the item set.
    #[error("invalid candidate: {0}")]
    InvalidCandidate(String),
    /// Search configuration is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an [`Error::Parse`] for the given 1-based line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Builds an [`Error::InvalidInstance`].
    pub fn invalid_instance(message: impl Into<String>) -> Self {
        Self::InvalidInstance(message.into())
    }

    /// Builds an [`Error::InvalidCandidate`].
    pub fn invalid_candidate(message: impl Into<String>) -> Self {
        Self::InvalidCandidate(message.into())
    }

    /// Builds an [`Error::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Builds an [`Error::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
