use crate::abi::{deposit_call_data, is_valid_address};
use crate::identity_tag::{
    resolve_identity_tag, IdentityTag, IdentityTagSource, ResolvedIdentityTag,
};
use crate::wallet::{
    EthereumWallet, ReceiptStatus, TransactionReceipt, TransactionRequest, WalletError, Wei,
};
use fintrack_agent::backend::BackendCanister;
use fintrack_agent::CallCanisters;
use fintrack_ledger_types::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Gas ceiling of a helper contract deposit.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositSettings {
    pub gas_limit: u64,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for DepositSettings {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            receipt_timeout: Duration::from_secs(300),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error)]
pub enum DepositError {
    #[error("invalid deposit: {0}")]
    Validation(String),
    #[error("no Ethereum wallet is available")]
    ProviderNotFound,
    #[error("the wallet exposed no account")]
    NoAccount,
    #[error("could not resolve the deposit address: {0}")]
    BackendUnavailable(String),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("deposit transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
    #[error("deposit transaction {tx_hash} was not mined within {timeout:?}")]
    Timeout { tx_hash: String, timeout: Duration },
    #[error("deposit transaction {tx_hash} was broadcast but its receipt could not be fetched: {source}")]
    Unconfirmed {
        tx_hash: String,
        #[source]
        source: WalletError,
    },
}

impl DepositError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ProviderNotFound | Self::NoAccount => ErrorKind::ProviderUnavailable,
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::Wallet(err) => err.kind(),
            Self::Reverted { .. } => ErrorKind::Ledger,
            Self::Timeout { .. } | Self::Unconfirmed { .. } => ErrorKind::Network,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositOutcome {
    pub tx_hash: String,
    pub receipt: TransactionReceipt,
    pub identity_tag: IdentityTag,
    pub tag_source: IdentityTagSource,
}

/// Sends ETH to the ckETH helper contract on behalf of a principal.
///
/// Only receipt polling is retried. Every attempt resolves the deposit address anew.
pub struct DepositBridge<C> {
    agent: C,
    backend: BackendCanister,
    wallet: Option<Arc<dyn EthereumWallet>>,
    settings: DepositSettings,
}

impl<C: CallCanisters> DepositBridge<C> {
    pub fn new(
        agent: C,
        backend: BackendCanister,
        wallet: Option<Arc<dyn EthereumWallet>>,
        settings: DepositSettings,
    ) -> Self {
        Self {
            agent,
            backend,
            wallet,
            settings,
        }
    }

    pub async fn resolve_deposit_address(&self) -> Result<String, DepositError> {
        let address = match self.backend.eth_get_deposit_address(&self.agent, None).await {
            Ok(Ok(address)) => address,
            Ok(Err(reason)) => return Err(DepositError::BackendUnavailable(reason)),
            Err(err) => return Err(DepositError::BackendUnavailable(err.to_string())),
        };
        if !is_valid_address(&address) {
            return Err(DepositError::BackendUnavailable(format!(
                "backend returned malformed address {address:?}"
            )));
        }
        debug!(%address, "resolved deposit address");
        Ok(address)
    }

    pub async fn identity_tag(&self, identity: &str) -> ResolvedIdentityTag {
        resolve_identity_tag(&self.backend, &self.agent, identity).await
    }

    /// Submits one `deposit(bytes32)` transaction and waits until it is mined.
    pub async fn deposit_to_address(
        &self,
        address: &str,
        identity_tag: ResolvedIdentityTag,
        amount: Wei,
    ) -> Result<DepositOutcome, DepositError> {
        if !is_valid_address(address) {
            return Err(DepositError::Validation(format!(
                "{address:?} is not an Ethereum address"
            )));
        }
        if amount == Wei::ZERO {
            return Err(DepositError::Validation(
                "deposit amount must be greater than zero".to_string(),
            ));
        }
        let wallet = self.wallet.as_ref().ok_or(DepositError::ProviderNotFound)?;
        if identity_tag.is_degraded() {
            warn!(tag = %identity_tag.tag, "depositing with a locally computed identity tag");
        }

        let from = wallet
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(DepositError::NoAccount)?;
        let transaction = TransactionRequest {
            from,
            to: address.to_string(),
            value: amount,
            gas: self.settings.gas_limit,
            data: deposit_call_data(&identity_tag.tag),
        };
        let tx_hash = wallet.send_transaction(transaction).await?;
        info!(%tx_hash, %address, %amount, "deposit transaction submitted");

        let receipt = self.wait_for_receipt(wallet.as_ref(), &tx_hash).await?;
        if receipt.status == ReceiptStatus::Failure {
            error!(%tx_hash, "deposit transaction reverted");
            return Err(DepositError::Reverted { tx_hash });
        }
        info!(%tx_hash, block = %receipt.block_number, "deposit confirmed");
        Ok(DepositOutcome {
            tx_hash,
            receipt,
            identity_tag: identity_tag.tag,
            tag_source: identity_tag.source,
        })
    }

    /// Resolves the deposit address and the identity tag, then deposits.
    pub async fn deposit(
        &self,
        identity: &str,
        amount: Wei,
    ) -> Result<DepositOutcome, DepositError> {
        let address = self.resolve_deposit_address().await?;
        let identity_tag = self.identity_tag(identity).await;
        self.deposit_to_address(&address, identity_tag, amount).await
    }

    /// Polls until the receipt shows up or `receipt_timeout` elapses.
    ///
    /// The transaction is already broadcast, so failed polls are retried and
    /// every error carries `tx_hash`.
    async fn wait_for_receipt(
        &self,
        wallet: &dyn EthereumWallet,
        tx_hash: &str,
    ) -> Result<TransactionReceipt, DepositError> {
        let mut last_error = None;
        let poll = async {
            loop {
                match wallet.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(err) => {
                        warn!(%tx_hash, %err, "failed to fetch deposit receipt, retrying");
                        last_error = Some(err);
                    }
                }
                tokio::time::sleep(self.settings.receipt_poll_interval).await;
            }
        };
        let outcome = tokio::time::timeout(self.settings.receipt_timeout, poll).await;
        match (outcome, last_error) {
            (Ok(receipt), _) => Ok(receipt),
            (Err(_), Some(source)) => Err(DepositError::Unconfirmed {
                tx_hash: tx_hash.to_string(),
                source,
            }),
            (Err(_), None) => Err(DepositError::Timeout {
                tx_hash: tx_hash.to_string(),
                timeout: self.settings.receipt_timeout,
            }),
        }
    }
}
