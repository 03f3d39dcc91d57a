//! Logger setup for the command-line binary.
//!
//! Diagnostics go to stderr through the `log` facade so that stdout carries
//! only the progress table and the final summary.

use std::io::Write;

use env_logger::{Builder, Target, fmt::Formatter};
use log::Level;

use crate::config::LogLevel;
use crate::error::{Error, Result};

/// Installs the global logger.
///
/// # Errors
/// Returns [`Error::Other`] if a logger has already been installed.
pub fn init_logger(level: LogLevel, timestamps: bool) -> Result<()> {
    let mut builder = Builder::new();
    builder
        .filter_level(level.to_filter())
        .write_style(env_logger::WriteStyle::Never)
        .format(move |buf: &mut Formatter, record| {
            if timestamps {
                write!(buf, "{} ", buf.timestamp_millis())?;
            }
            writeln!(buf, "{} {}", level_tag(record.level()), record.args())
        })
        .target(Target::Stderr);

    builder
        .try_init()
        .map_err(|e| Error::other(format!("logger init failed: {e}")))
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
