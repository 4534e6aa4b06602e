pub mod config;
pub mod config_sample;
pub mod logger;

pub use config::{CanisterConfig, Config, ConfigError, EthereumConfig, IcConfig};
pub use logger::{init_logging, LogFormat, LogLevel, LoggerConfig};
