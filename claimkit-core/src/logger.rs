//! Host logging bridge.
//!
//! The library logs through the `log` facade. Applications that do not run
//! their own `log` backend can hand a [`Logger`] to [`set_logger`] and receive
//! every record as a level and a formatted message.
//!
//! ```rust
//! use std::sync::Arc;
//! use claimkit_core::logger::{set_logger, LogLevel, Logger};
//!
//! struct StderrLogger;
//!
//! impl Logger for StderrLogger {
//!     fn log(&self, level: LogLevel, message: String) {
//!         eprintln!("[{level:?}] {message}");
//!     }
//! }
//!
//! set_logger(Arc::new(StderrLogger));
//! ```
//!
//! Records never contain claim attribute values, passphrases or key material.

use std::sync::{Arc, OnceLock};

/// A sink for log records.
pub trait Logger: Sync + Send {
    /// Receives one record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Lifecycle progress.
    Info,
    /// Something unexpected that the caller may want to look at.
    Warn,
    /// A failure.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

const CRATE_PREFIX: &str = "claimkit";

/// Debug and trace records are forwarded only from this crate's modules;
/// dependencies are chatty at those levels.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let from_claimkit = module_path.is_some_and(|path| path.starts_with(CRATE_PREFIX));
    level <= log::Level::Info || from_claimkit
}

struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("claimkit logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination of all `log` records.
///
/// Only the first call takes effect. Later calls, or a process that already
/// installed another `log` backend, are reported on stderr and otherwise
/// ignored.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("claimkit logger already set");
        return;
    }
    if let Err(err) = init_logger() {
        eprintln!("failed to install claimkit logger: {err}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
