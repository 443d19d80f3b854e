//! Stderr logging for pipeline runs.
//!
//! Each record becomes one line,
//! `[  0.412s  WARN fiducial-view-3 adapter] view 3: no face detected`:
//! elapsed time since installation, level, emitting thread and the module
//! path below the crate root. Views run on a worker pool, so lines are
//! assembled in full before the single write to stderr.
//!
//! `init_with_level` takes the level from the caller; `init_from_env` reads
//! it from `FACE_FIDUCIALS_LOG` (`error`, `warn`, `info`, `debug`, `trace`
//! or `off`).

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Environment variable holding the level (stderr logger) or the filter
/// directives (tracing subscriber).
pub const LOG_ENV: &str = "FACE_FIDUCIALS_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let thread = std::thread::current();
        let line = format_line(
            self.started.elapsed(),
            record.level(),
            thread.name(),
            record.target(),
            record.args(),
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Module path below the crate root; the crate root itself stays as is.
fn short_target(target: &str) -> &str {
    match target.split_once("::") {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => target,
    }
}

fn format_line(
    elapsed: Duration,
    level: Level,
    thread: Option<&str>,
    target: &str,
    args: &std::fmt::Arguments<'_>,
) -> String {
    let mut line = String::with_capacity(96);
    let _ = writeln!(
        line,
        "[{:7.3}s {:>5} {} {}] {}",
        elapsed.as_secs_f64(),
        level,
        thread.unwrap_or("-"),
        short_target(target),
        args
    );
    line
}

/// Parse a level name, falling back to `default` when absent or unknown.
fn parse_level(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(default)
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs; later calls keep the installed level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(logger.level);
    Ok(())
}

/// Install the stderr logger at the level named by [`LOG_ENV`], or `default`.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    let value = std::env::var(LOG_ENV).ok();
    init_with_level(parse_level(value.as_deref(), default))
}

/// Install a `tracing` subscriber instead of the stderr logger.
///
/// Filter directives come from [`LOG_ENV`], then `RUST_LOG`, then `info`.
/// With `json` set, events and closed spans are written as flattened JSON
/// lines; otherwise as text with uptime and thread names. A subscriber that
/// is already installed is kept.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_thread_names(true)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_thread_names(true)
            .with_timer(fmt::time::Uptime::default())
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
