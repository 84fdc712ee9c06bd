//! `log` backend for binaries built with verbtree
//!
//! Records go to standard error and, if configured, to a log file. The level
//! filter comes from `RUST_LOG` and defaults to `warn` so diagnostics do not
//! mix with help output.

use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

struct VerbtreeLogger {
    file: Option<Mutex<File>>,
    filter: LevelFilter,
    start: Instant,
}

impl Log for VerbtreeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_record(self.start.elapsed(), record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
        if let Some(ref file) = self.file {
            let _ = writeln!(file.lock(), "{line}");
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

fn format_record(elapsed: Duration, record: &Record) -> String {
    format!(
        "[{:.3}s] [{}] {}: {}",
        elapsed.as_secs_f64(),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Parse a level filter from a `RUST_LOG`-style value.
#[must_use]
pub fn parse_filter(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Install the global logger. Call once, before any logging.
///
/// # Errors
///
/// Returns `SetLoggerError` if a logger is already installed.
pub fn init(log_file: Option<File>) -> Result<(), SetLoggerError> {
    let filter = parse_filter(std::env::var("RUST_LOG").ok().as_deref());
    let logger = VerbtreeLogger {
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}
