//! Tracing setup and stage timing.

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::error::{LexnormError, Result};

/// Initialize structured logging.
///
/// `RUST_LOG` overrides `log_level`. Console output goes to stderr, as text
/// or JSON depending on `format`. With `log_file` set, a JSON copy is written
/// through a daily rolling appender; keep the returned guard alive until
/// exit so buffered lines are flushed.
pub fn init_logging(
    log_level: Option<&str>,
    format: &str,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .map_err(|e| LexnormError::InvalidConfig(format!("Failed to create log filter: {e}")))?;

    let console_layer = if format == "json" {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .boxed()
    };

    let registry = Registry::default().with(env_filter).with(console_layer);

    let guard = if let Some(log_path) = log_file {
        let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = log_path
            .file_name()
            .map_or_else(|| "lexnorm.log".into(), |n| n.to_string_lossy().into_owned());
        let file_appender = rolling::daily(directory, file_name);
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(true)
            .json();

        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| LexnormError::InvalidConfig(format!("Failed to install logger: {e}")))?;
        Some(guard)
    } else {
        registry
            .try_init()
            .map_err(|e| LexnormError::InvalidConfig(format!("Failed to install logger: {e}")))?;
        None
    };

    info!("Logging system initialized");
    Ok(guard)
}

/// Logs how long a pipeline stage took.
pub struct OperationTimer {
    operation: String,
    start: std::time::Instant,
    finished: bool,
}

impl OperationTimer {
    /// Start timing `operation`.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: std::time::Instant::now(),
            finished: false,
        }
    }

    /// Name of the timed operation.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Log and return the elapsed time.
    pub fn finish(mut self) -> std::time::Duration {
        self.finished = true;
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.finished && !std::thread::panicking() {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = self.start.elapsed().as_millis(),
                "Operation abandoned"
            );
        }
    }
}
