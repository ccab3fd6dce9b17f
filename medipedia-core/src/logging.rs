//! Structured logging for every MediPedia crate

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Subscriber settings, loaded from the `[logging]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback level when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Source file and line on every event
    pub include_location: bool,
    pub include_thread: bool,
    /// Append to `log_file_path` instead of stderr
    pub log_to_file: bool,
    pub log_file_path: Option<String>,
    /// Emit span-close events carrying their duration
    pub enable_performance_monitoring: bool,
    /// Extra `EnvFilter` directives such as `medipedia_api=debug`
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_to_file: false,
            log_file_path: None,
            enable_performance_monitoring: false,
            filter_directives: vec![
                "medipedia_core=info".to_string(),
                "medipedia_api=info".to_string(),
                "medipedia_session=info".to_string(),
                "medipedia_app=info".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    /// Verbose preset used by `--verbose`
    pub fn verbose() -> Self {
        Self {
            level: "debug".to_string(),
            include_location: true,
            enable_performance_monitoring: true,
            filter_directives: vec![
                "medipedia_core=debug".to_string(),
                "medipedia_api=debug".to_string(),
                "medipedia_session=debug".to_string(),
                "medipedia_app=debug".to_string(),
            ],
            ..Self::default()
        }
    }
}

/// Install the global `tracing` subscriber described by `config`.
///
/// `RUST_LOG` overrides `config.level`. Fails if a subscriber is already
/// installed, so tests and embedders can call it more than once.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.filter_directives.iter().try_fold(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        |filter, directive| directive.parse().map(|d| filter.add_directive(d)),
    )?;

    let writer = match (config.log_to_file, &config.log_file_path) {
        (true, Some(path)) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        (true, None) => return Err("log_to_file requires log_file_path".into()),
        // stdout belongs to command output
        (false, _) => BoxMakeWriter::new(io::stderr),
    };

    let base = fmt::layer()
        .with_span_events(if config.enable_performance_monitoring {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread)
        .with_writer(writer);

    let output = match config.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;

    Ok(())
}

pub mod performance {
    use std::time::Instant;
    use tracing::Instrument;

    /// Run `future` inside a `performance` span and log how long it took
    pub async fn measure_async<F, T>(operation_name: &str, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let started = Instant::now();
        let result = future
            .instrument(tracing::info_span!("performance", operation = operation_name))
            .await;

        tracing::debug!(
            target: "performance",
            operation = operation_name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Timed operation finished"
        );
        result
    }
}

/// `info!` marking the start of a named operation, with optional fields
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr $(, $($field:tt)*)?) => {
        tracing::info!(operation = $operation, $($($field)*,)? "Operation started")
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr $(, $($field:tt)*)?) => {
        tracing::info!(operation = $operation, $($($field)*,)? "Operation succeeded")
    };
}

/// `error!` for a failed operation; `$error` is recorded with `Display`
#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            $($($field)*,)?
            "Operation failed"
        )
    };
}
