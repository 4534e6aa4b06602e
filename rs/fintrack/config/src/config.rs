use crate::logger::LoggerConfig;
use candid::Principal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_IC_URL: &str = "https://icp-api.io";
pub const DEFAULT_GAS_LIMIT: u64 = 100_000;
/// Lower bound of the delay between two receipt lookups.
pub const MIN_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Test-network deployments: ckTESTBTC and ckSepoliaETH.
const CKBTC_LEDGER: &str = "mc6ru-gyaaa-aaaar-qaaaq-cai";
const CKBTC_MINTER: &str = "ml52i-qqaaa-aaaar-qaaba-cai";
const CKETH_LEDGER: &str = "apia6-jaaaa-aaaar-qabma-cai";
const CKETH_MINTER: &str = "jzenf-aiaaa-aaaar-qaa7q-cai";

fn canister_id(text: &str) -> Principal {
    Principal::from_text(text).expect("BUG: invalid built-in canister id")
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ic: IcConfig,
    pub canisters: CanisterConfig,
    pub ethereum: EthereumConfig,
    pub logger: LoggerConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: json5::Error },
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        json5::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcConfig {
    /// Boundary node or replica to send requests to.
    pub url: String,
    /// Only for local replicas; never enable against mainnet.
    pub fetch_root_key: bool,
    /// PEM file of the identity to act as. Calls are anonymous without one.
    pub identity_pem: Option<PathBuf>,
}

impl Default for IcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IC_URL.to_string(),
            fetch_root_key: false,
            identity_pem: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanisterConfig {
    pub ckbtc_ledger: Principal,
    pub ckbtc_minter: Principal,
    pub cketh_ledger: Principal,
    pub cketh_minter: Principal,
    pub backend: Option<Principal>,
}

impl Default for CanisterConfig {
    fn default() -> Self {
        Self {
            ckbtc_ledger: canister_id(CKBTC_LEDGER),
            ckbtc_minter: canister_id(CKBTC_MINTER),
            cketh_ledger: canister_id(CKETH_LEDGER),
            cketh_minter: canister_id(CKETH_MINTER),
            backend: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint of the wallet that signs deposits.
    pub wallet_url: Option<Url>,
    pub gas_limit: u64,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_interval_millis: u64,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            wallet_url: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            receipt_timeout_secs: 300,
            receipt_poll_interval_millis: 2_000,
        }
    }
}

impl EthereumConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_millis).max(MIN_RECEIPT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogFormat, LogLevel};
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn should_fill_missing_sections_with_defaults() {
        let config: Config = json5::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ic.url, DEFAULT_IC_URL);
        assert_eq!(config.ethereum.gas_limit, 100_000);
        assert_eq!(config.canisters.backend, None);
        assert_eq!(config.canisters.ckbtc_ledger.to_text(), CKBTC_LEDGER);
    }

    #[test]
    fn should_override_individual_fields() {
        let config: Config = json5::from_str(
            r#"{
                ic: { url: "http://127.0.0.1:4943", fetch_root_key: true },
                canisters: { backend: "2vxsx-fae" },
                ethereum: { wallet_url: "http://127.0.0.1:8545", receipt_timeout_secs: 60 },
                logger: { level: "debug", format: "json" },
            }"#,
        )
        .unwrap();

        assert!(config.ic.fetch_root_key);
        assert_eq!(config.canisters.backend, Some(Principal::anonymous()));
        assert_eq!(config.canisters.cketh_minter.to_text(), CKETH_MINTER);
        assert_eq!(config.ethereum.receipt_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.ethereum.receipt_poll_interval(),
            Duration::from_secs(2)
        );
        assert_eq!(config.logger.level, LogLevel::Debug);
        assert_eq!(config.logger.format, LogFormat::Json);
    }

    #[test]
    fn should_clamp_receipt_poll_interval() {
        let config: Config =
            json5::from_str("{ ethereum: { receipt_poll_interval_millis: 0 } }").unwrap();
        assert_eq!(
            config.ethereum.receipt_poll_interval(),
            MIN_RECEIPT_POLL_INTERVAL
        );

        let config: Config =
            json5::from_str("{ ethereum: { receipt_poll_interval_millis: 250 } }").unwrap();
        assert_eq!(
            config.ethereum.receipt_poll_interval(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn should_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ ethereum: {{ gas_limit: 120000 }} }}").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.ethereum.gas_limit, 120_000);
    }

    #[test]
    fn should_report_io_and_parse_errors() {
        assert_matches!(
            Config::load("/nonexistent/fintrack.json5"),
            Err(ConfigError::Io { .. })
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ ic: {{ url: 42 }} }}").unwrap();
        assert_matches!(Config::load(file.path()), Err(ConfigError::Parse { .. }));
    }
}
