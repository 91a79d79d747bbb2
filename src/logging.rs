//! Logging initialisation.
//!
//! Library code logs through the `log` and `tracing` macros. This installs a
//! `tracing-subscriber` that also captures `log` records: formatted to stderr
//! on desktop, forwarded to logcat on Android.

use std::str::FromStr;

use tracing::Level;

use crate::config::LoggingConfig;

/// Parse a level name, falling back to INFO.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Install the global subscriber. Later calls are no-ops.
#[cfg(not(target_os = "android"))]
pub fn init_logging(config: &LoggingConfig) {
    let level = parse_level(&config.level);
    if tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
    {
        log::debug!("[Logging] Initialised at {}", level);
    }
}

/// Install the global subscriber. Later calls are no-ops.
#[cfg(target_os = "android")]
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let level = parse_level(&config.level);
    let layer = match tracing_android::layer(&config.android_tag) {
        Ok(layer) => layer,
        Err(_) => return,
    };
    if tracing_subscriber::registry()
        .with(layer.with_filter(LevelFilter::from_level(level)))
        .try_init()
        .is_ok()
    {
        log::debug!("[Logging] Initialised at {}", level);
    }
}
