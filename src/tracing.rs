//! Tracing setup for diagnosing key dispatch
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=multikey::dispatch=trace` - every keystroke and its outcome
//! - `RUST_LOG=multikey::keymap=debug` - keymap loading and parsing
//!
//! # Log Files
//!
//! Logs are written to `~/.config/multikey/logs/multikey.log` with daily rotation.
//! File logging uses debug level by default for more verbose troubleshooting.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config_paths::LOG_FILE_PREFIX;

/// Console level for a `-v` count when RUST_LOG is unset
pub fn console_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing subscriber with console and file logging
///
/// Console output respects RUST_LOG (else [`console_level`]) and goes to
/// stderr so it never mixes with command output. File logging writes to
/// `~/.config/multikey/logs/multikey.log` with daily rotation.
pub fn init(verbosity: u8) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level(verbosity)));

    // Console layer - respects RUST_LOG
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    // File layer - always debug level for troubleshooting
    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_level_by_verbosity() {
        assert_eq!(console_level(0), "warn");
        assert_eq!(console_level(1), "info");
        assert_eq!(console_level(2), "debug");
        assert_eq!(console_level(7), "trace");
    }
}
