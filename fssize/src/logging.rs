//! Tracing setup for the module.
//!
//! The host redirects stderr into its own log file, so by default events go
//! there; `[log] file` sends them to a dedicated file instead.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// `RUST_LOG` wins over the configured level; an unusable directive falls
/// back to `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns `Ok(false)` when one is already
/// installed, which happens when the host reloads the module.
pub fn init(config: &LogConfig) -> io::Result<bool> {
    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    let installed = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(env_filter(&config.level))
        .with_writer(writer)
        .compact()
        .try_init()
        .is_ok();

    Ok(installed)
}
