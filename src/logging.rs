use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{PipelineError, Result};

pub const LOG_FILE_PREFIX: &str = "survey_pipeline.log";
const DEFAULT_FILTER: &str = "survey_pipeline=info,warn";

/// `RUST_LOG` when set and valid, otherwise info for this crate and warn for
/// dependencies.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber: human-readable console output plus a
/// daily-rotated JSON file under `log_dir`.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// lifetime of the run.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
        .try_init()
        .map_err(|e| PipelineError::Config(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}
