//! The external Ethereum wallet that signs and broadcasts deposits.
//!
//! Only the three EIP-1193 methods a deposit needs are modelled. [`JsonRpcWallet`] reaches a
//! wallet exposing them as JSON-RPC 2.0 over HTTP, e.g. a local signer proxy.

use async_trait::async_trait;
use ethnum::u256;
use fintrack_ledger_types::ErrorKind;
use mockall::automock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Amount of ether in wei.
pub type Wei = u256;

/// EIP-1193 code of a request the user declined.
pub const USER_REJECTED_REQUEST: i64 = 4001;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub value: Wei,
    pub gas: u64,
    pub data: Vec<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u256,
    pub gas_used: u256,
    pub status: ReceiptStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("the user rejected the request")]
    UserRejected,
    #[error("wallet returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("failed to reach wallet: {0}")]
    Transport(String),
    #[error("unexpected wallet response: {0}")]
    InvalidResponse(String),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserRejected => ErrorKind::UserRejected,
            Self::Rpc { .. } | Self::Transport(_) | Self::InvalidResponse(_) => ErrorKind::Network,
        }
    }
}

#[automock]
#[async_trait]
pub trait EthereumWallet: Send + Sync {
    /// Asks the wallet to expose its accounts, prompting the user if needed.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Signs and broadcasts `transaction`, returning its hash.
    async fn send_transaction(&self, transaction: TransactionRequest)
        -> Result<String, WalletError>;

    /// `None` until the transaction is mined.
    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, WalletError>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JsonRpcResult<T> {
    Result(T),
    Error(JsonRpcError),
}

#[derive(Debug, Deserialize)]
struct JsonRpcReply<T> {
    #[serde(flatten)]
    result: JsonRpcResult<T>,
}

impl<T> JsonRpcReply<T> {
    fn into_result(self) -> Result<T, WalletError> {
        match self.result {
            JsonRpcResult::Result(value) => Ok(value),
            JsonRpcResult::Error(error) if error.code == USER_REJECTED_REQUEST => {
                Err(WalletError::UserRejected)
            }
            JsonRpcResult::Error(error) => Err(WalletError::Rpc {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: String,
    gas_used: String,
    status: String,
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(text: &str) -> Result<u256, WalletError> {
    text.strip_prefix("0x")
        .and_then(|digits| u256::from_str_radix(digits, 16).ok())
        .ok_or_else(|| WalletError::InvalidResponse(format!("invalid quantity {text:?}")))
}

pub fn format_quantity(value: u256) -> String {
    format!("0x{:x}", value)
}

impl TryFrom<RawReceipt> for TransactionReceipt {
    type Error = WalletError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let status = match parse_quantity(&raw.status)? {
            s if s == u256::ONE => ReceiptStatus::Success,
            s if s == u256::ZERO => ReceiptStatus::Failure,
            other => {
                return Err(WalletError::InvalidResponse(format!(
                    "unknown receipt status {other}"
                )))
            }
        };
        Ok(Self {
            transaction_hash: raw.transaction_hash,
            block_number: parse_quantity(&raw.block_number)?,
            gas_used: parse_quantity(&raw.gas_used)?,
            status,
        })
    }
}

pub struct JsonRpcWallet {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(url = %self.url, method, id, "sending wallet request");
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let reply: JsonRpcReply<T> = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| WalletError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::InvalidResponse(e.to_string()))?;
        reply.into_result()
    }
}

#[async_trait]
impl EthereumWallet for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.request("eth_requestAccounts", json!([])).await
    }

    async fn send_transaction(
        &self,
        transaction: TransactionRequest,
    ) -> Result<String, WalletError> {
        let params = json!([{
            "from": transaction.from,
            "to": transaction.to,
            "value": format_quantity(transaction.value),
            "gas": format_quantity(u256::from(transaction.gas)),
            "data": format!("0x{}", hex::encode(&transaction.data)),
        }]);
        self.request("eth_sendTransaction", params).await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        raw.map(TransactionReceipt::try_from).transpose()
    }
}
