//! Logging configuration and initialization
//!
//! Console output is compact text or JSON; an optional log file is written
//! through a non-blocking appender.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Filter directives, e.g. `debug` or `info,ndi_texture::ndi=trace`
pub const LOG_ENV: &str = "NDI_TEXTURE_LOG";
/// Set to `json` for JSON console output
pub const LOG_FORMAT_ENV: &str = "NDI_TEXTURE_LOG_FORMAT";

/// Keeps the file writer alive; logs are flushed when it drops.
pub type LogGuard = WorkerGuard;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Also write to this file
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Filter used when neither env variable is set (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Default filter for a CLI verbosity count (`-v`, `-vv`).
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.default_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string();
        self
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global logger is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

fn use_json(format_env: Option<&str>, default: bool) -> bool {
    format_env.map_or(default, |v| v.eq_ignore_ascii_case("json"))
}

/// Install the global subscriber.
///
/// `NDI_TEXTURE_LOG` takes precedence over `RUST_LOG`, which takes precedence
/// over [`LogConfig::default_level`]. Keep the returned guard alive while the
/// program runs when a log file is configured.
pub fn init_logging(config: &LogConfig) -> Result<Option<LogGuard>, LogError> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let json = use_json(std::env::var(LOG_FORMAT_ENV).ok().as_deref(), config.json_format);

    let (file_layer, guard) = match &config.file_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| LogError::File {
                path: path.clone(),
                source,
            })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console = config.console_enabled;
    let json_layer = (console && json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let compact_layer = (console && !json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init()?;

    tracing::info!(
        target: "ndi_texture",
        version = env!("CARGO_PKG_VERSION"),
        json_format = json,
        file = ?config.file_path,
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(config.file_path.is_none());
        assert!(!config.json_format);
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LogConfig::default().with_verbosity(0).default_level, "info");
        assert_eq!(LogConfig::default().with_verbosity(1).default_level, "debug");
        assert_eq!(LogConfig::default().with_verbosity(5).default_level, "trace");
    }

    #[test]
    fn test_json_format_selection() {
        assert!(use_json(Some("JSON"), false));
        assert!(!use_json(Some("text"), true));
        assert!(use_json(None, true));
        assert!(!use_json(None, false));
    }
}
