//! Logging setup.
//!
//! Standard output carries the result document and nothing else, so every
//! sink here writes to stderr, a log file or the systemd journal.
//!
//! Log level is controlled via the `CLIP2_LOG` environment variable:
//! - `CLIP2_LOG=debug` for verbose output
//! - `CLIP2_LOG=info` for model download and load progress
//! - `CLIP2_LOG=warn` for warnings and errors only (default)

use anyhow::Result;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogTarget, LoggingConfig};

pub const LOG_ENV: &str = "CLIP2_LOG";

static GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the logging system. Call once, before any work.
pub fn init(config: &LoggingConfig) -> Result<()> {
    match config.target {
        LogTarget::Stderr => init_stderr(),
        LogTarget::File => init_file(config),
        LogTarget::Journald => init_journald(),
    }
}

/// Plain stderr sink, also the fallback when another sink cannot start.
pub fn init_stderr() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    Ok(())
}

fn init_file(config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.dir)?;

    let file_appender = tracing_appender::rolling::daily(&config.dir, "clip2.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard would stop the writer thread before the final flush
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    tracing::debug!("Logging initialized with file backend at {:?}", config.dir);
    Ok(())
}

#[cfg(target_os = "linux")]
fn init_journald() -> Result<()> {
    match tracing_journald::layer() {
        Ok(journald_layer) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(journald_layer)
                .try_init()?;
            tracing::debug!("Logging initialized with journald backend");
            Ok(())
        }
        Err(e) => {
            init_stderr()?;
            tracing::warn!("journald unavailable ({}), logging to stderr", e);
            Ok(())
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn init_journald() -> Result<()> {
    init_stderr()?;
    tracing::warn!("journald logging is only supported on Linux, logging to stderr");
    Ok(())
}
