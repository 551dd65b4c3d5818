//! Logging configuration and initialization
//!
//! Console output goes to stderr so stdout stays free for command output.
//! Optional file logging runs through a non-blocking `tracing-appender`
//! writer whose guard must outlive the program's last log line.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "CORRPT_LOG";
/// Environment variable selecting the console format ("json" or "compact")
pub const LOG_FORMAT_ENV: &str = "CORRPT_LOG_FORMAT";

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// One JSON object per event, for log aggregation
    Json,
}

impl LogFormat {
    /// Parse a format name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "compact" | "text" | "pretty" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Write logs to this file as well (default: none)
    pub file_path: Option<PathBuf>,
    /// Console format unless overridden by `CORRPT_LOG_FORMAT`
    pub format: LogFormat,
    /// Filter used when neither `CORRPT_LOG` nor `RUST_LOG` is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_path: None,
            format: LogFormat::Compact,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Console format after applying the environment override
    pub fn effective_format(&self) -> LogFormat {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or(self.format)
    }
}

/// Initialize the global subscriber
///
/// The filter comes from `CORRPT_LOG`, then `RUST_LOG`, then
/// `config.default_level`. Returns the file writer's guard when file
/// logging is enabled; keep it alive until exit so buffered lines flush.
///
/// # Example
///
/// ```no_run
/// use corrpt::telemetry::{init_logging, LogConfig};
///
/// let _guard = init_logging(&LogConfig::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let format = config.effective_format();

    let (json_layer, compact_layer) = match (config.console_enabled, format) {
        (false, _) => (None, None),
        (true, LogFormat::Json) => (
            Some(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
            None,
        ),
        (true, LogFormat::Compact) => (
            None,
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            ),
        ),
    };

    let mut file_guard: Option<WorkerGuard> = None;
    let file_layer = match &config.file_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            file_guard = Some(guard);
            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(compact_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        target: "corrpt",
        version = env!("CARGO_PKG_VERSION"),
        ?format,
        file = ?config.file_path,
        "Logging initialized"
    );

    Ok(file_guard)
}

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
