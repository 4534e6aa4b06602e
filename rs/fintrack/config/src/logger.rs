use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// The format of emitted log lines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    TextFull,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::TextFull,
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to install the global logger: {0}")]
pub struct LoggingError(String);

/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr so that command
/// output on stdout stays machine-readable.
pub fn init_logging(config: &LoggerConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = match config.format {
        LogFormat::TextFull => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    result.map_err(|err| LoggingError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_info_text() {
        let config: LoggerConfig = json5::from_str("{}").unwrap();
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.level.as_directive(), "info");
    }

    #[test]
    fn should_refuse_second_global_logger() {
        let config = LoggerConfig {
            level: LogLevel::Warn,
            format: LogFormat::Json,
        };
        // Another test binary thread may have won the race, so only the second call is checked.
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
