//! Stderr logging for the helper.
//!
//! Stdout carries the credential protocol, so every log line goes to stderr.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

/// Values accepted by `--show-logger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowLogger {
    None,
    Info,
    Warn,
    Error,
    All,
}

/// Fold the requested outputs, in order, into one level filter.
///
/// `none` silences everything seen so far; other values only ever widen.
pub fn level_filter(outputs: &[ShowLogger]) -> LevelFilter {
    if outputs.is_empty() {
        return LevelFilter::ERROR;
    }
    outputs.iter().fold(LevelFilter::OFF, |level, output| match output {
        ShowLogger::None => LevelFilter::OFF,
        ShowLogger::Error => level.max(LevelFilter::ERROR),
        ShowLogger::Warn => level.max(LevelFilter::WARN),
        ShowLogger::Info => level.max(LevelFilter::INFO),
        ShowLogger::All => LevelFilter::TRACE,
    })
}

/// Install the global stderr subscriber. A second call is a no-op.
pub fn init(outputs: &[ShowLogger]) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level_filter(outputs))
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}
