//! Deposit, fee and withdrawal endpoints of the chain-key minters.
//!
//! Both minters burn the withdrawn amount with an ICRC-2 `transfer_from`, so the caller must
//! first approve the minter as spender on the corresponding ledger.

use crate::icrc1::account::Subaccount;
use candid::{CandidType, Deserialize, Nat, Principal};
use serde::Serialize;
use serde_bytes::ByteBuf;
use std::fmt;

/// Argument of the ckBTC minter's `retrieve_btc_with_approval`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RetrieveBtcWithApprovalArgs {
    /// Amount to retrieve, in satoshi.
    pub amount: u64,
    /// Bitcoin address receiving the funds.
    pub address: String,
    #[serde(default)]
    pub from_subaccount: Option<Subaccount>,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RetrieveBtcOk {
    /// Index of the ledger block burning the retrieved amount.
    pub block_index: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum RetrieveBtcWithApprovalError {
    MalformedAddress(String),
    AlreadyProcessing,
    AmountTooLow(u64),
    InsufficientFunds { balance: u64 },
    InsufficientAllowance { allowance: u64 },
    TemporarilyUnavailable(String),
    GenericError { error_message: String, error_code: u64 },
}

impl fmt::Display for RetrieveBtcWithApprovalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedAddress(reason) => write!(f, "malformed address: {}", reason),
            Self::AlreadyProcessing => {
                write!(f, "a retrieval for this account is already being processed")
            }
            Self::AmountTooLow(min) => {
                write!(f, "amount too low, the minimum is {} satoshi", min)
            }
            Self::InsufficientFunds { balance } => {
                write!(f, "insufficient funds, current balance: {}", balance)
            }
            Self::InsufficientAllowance { allowance } => {
                write!(f, "insufficient allowance, current allowance: {}", allowance)
            }
            Self::TemporarilyUnavailable(reason) => {
                write!(f, "minter temporarily unavailable: {}", reason)
            }
            Self::GenericError {
                error_message,
                error_code,
            } => write!(f, "{} {}", error_code, error_message),
        }
    }
}

impl std::error::Error for RetrieveBtcWithApprovalError {}

/// Argument of the ckETH minter's `withdraw_eth`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalArg {
    /// Amount to withdraw, in wei.
    pub amount: Nat,
    /// Ethereum address receiving the funds.
    pub recipient: String,
    #[serde(default)]
    pub from_subaccount: Option<Subaccount>,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RetrieveEthRequest {
    /// Index of the ledger block burning the withdrawn amount; identifies the withdrawal.
    pub block_index: Nat,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum WithdrawalError {
    AmountTooLow { min_withdrawal_amount: Nat },
    InsufficientFunds { balance: Nat },
    InsufficientAllowance { allowance: Nat },
    RecipientAddressBlocked { address: String },
    TemporarilyUnavailable(String),
}

impl fmt::Display for WithdrawalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmountTooLow {
                min_withdrawal_amount,
            } => write!(
                f,
                "amount too low, the minimum is {} wei",
                min_withdrawal_amount
            ),
            Self::InsufficientFunds { balance } => {
                write!(f, "insufficient funds, current balance: {}", balance)
            }
            Self::InsufficientAllowance { allowance } => {
                write!(f, "insufficient allowance, current allowance: {}", allowance)
            }
            Self::RecipientAddressBlocked { address } => {
                write!(f, "recipient address {} is blocked", address)
            }
            Self::TemporarilyUnavailable(reason) => {
                write!(f, "minter temporarily unavailable: {}", reason)
            }
        }
    }
}

impl std::error::Error for WithdrawalError {}

/// Argument of the ckBTC minter's `get_btc_address`. The minter uses the caller when `owner`
/// is `None`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GetBtcAddressArgs {
    pub owner: Option<Principal>,
    pub subaccount: Option<Subaccount>,
}

/// Argument of the ckBTC minter's `update_balance`. The minter uses the caller when `owner`
/// is `None`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateBalanceArgs {
    pub owner: Option<Principal>,
    pub subaccount: Option<Subaccount>,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct OutPoint {
    pub txid: ByteBuf,
    pub vout: u32,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// Value in satoshi.
    pub value: u64,
    pub height: u32,
}

/// What the minter did with one deposited UTXO.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum UtxoStatus {
    /// The value does not cover the Bitcoin check fee.
    ValueTooSmall(Utxo),
    /// The Bitcoin check rejected the UTXO.
    Tainted(Utxo),
    /// The UTXO passed the check but minting failed; calling `update_balance` again retries.
    Checked(Utxo),
    Minted {
        block_index: u64,
        minted_amount: u64,
        utxo: Utxo,
    },
}

impl UtxoStatus {
    pub fn utxo(&self) -> &Utxo {
        match self {
            Self::ValueTooSmall(utxo) | Self::Tainted(utxo) | Self::Checked(utxo) => utxo,
            Self::Minted { utxo, .. } => utxo,
        }
    }

    /// Satoshi credited on the ledger, zero unless minted.
    pub fn minted_amount(&self) -> u64 {
        match self {
            Self::Minted { minted_amount, .. } => *minted_amount,
            _ => 0,
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingUtxo {
    pub outpoint: OutPoint,
    pub value: u64,
    pub confirmations: u32,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum SuspendedReason {
    ValueTooSmall,
    Quarantined,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SuspendedUtxo {
    pub utxo: Utxo,
    pub reason: SuspendedReason,
    /// Nanoseconds since the epoch.
    pub earliest_retry: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum UpdateBalanceError {
    TemporarilyUnavailable(String),
    AlreadyProcessing,
    NoNewUtxos {
        current_confirmations: Option<u32>,
        required_confirmations: u32,
        pending_utxos: Option<Vec<PendingUtxo>>,
        suspended_utxos: Option<Vec<SuspendedUtxo>>,
    },
    GenericError {
        error_code: u64,
        error_message: String,
    },
}

impl fmt::Display for UpdateBalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemporarilyUnavailable(reason) => {
                write!(f, "minter temporarily unavailable: {}", reason)
            }
            Self::AlreadyProcessing => {
                write!(f, "a balance update for this account is already being processed")
            }
            Self::NoNewUtxos {
                current_confirmations,
                required_confirmations,
                pending_utxos,
                ..
            } => {
                write!(f, "no new UTXOs to process")?;
                if let Some(current) = current_confirmations {
                    write!(
                        f,
                        ", the newest has {} of {} required confirmations",
                        current, required_confirmations
                    )?;
                }
                let pending = pending_utxos.as_ref().map_or(0, Vec::len);
                if pending > 0 {
                    write!(f, " ({} pending)", pending)?;
                }
                Ok(())
            }
            Self::GenericError {
                error_message,
                error_code,
            } => write!(f, "{} {}", error_code, error_message),
        }
    }
}

impl std::error::Error for UpdateBalanceError {}

/// Argument of the ckBTC minter's `estimate_withdrawal_fee`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EstimateFeeArg {
    /// Withdrawal amount in satoshi; the minter assumes a typical amount when `None`.
    pub amount: Option<u64>,
}

/// Fees deducted from a ckBTC withdrawal, in satoshi.
#[derive(CandidType, Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WithdrawalFee {
    pub minter_fee: u64,
    pub bitcoin_fee: u64,
}

impl WithdrawalFee {
    pub fn total(&self) -> u64 {
        self.minter_fee.saturating_add(self.bitcoin_fee)
    }
}

/// Selects the ckERC20 token whose withdrawal is priced. ETH withdrawals pass no argument.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Eip1559TransactionPriceArg {
    pub ckerc20_ledger_id: Principal,
}

/// Current price of the transaction the ckETH minter sends for a withdrawal, in wei.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Eip1559TransactionPrice {
    pub gas_limit: Nat,
    pub max_fee_per_gas: Nat,
    pub max_priority_fee_per_gas: Nat,
    /// Upper bound of the fee deducted from the withdrawn amount.
    pub max_transaction_fee: Nat,
    /// Nanoseconds since the epoch at which the price was estimated.
    pub timestamp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(value: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint {
                txid: ByteBuf::from(vec![9; 32]),
                vout: 1,
            },
            value,
            height: 840_000,
        }
    }

    #[test]
    fn should_count_only_minted_utxos() {
        let statuses = [
            UtxoStatus::Minted {
                block_index: 12,
                minted_amount: 99_000,
                utxo: utxo(100_000),
            },
            UtxoStatus::Checked(utxo(50_000)),
            UtxoStatus::ValueTooSmall(utxo(500)),
        ];

        let minted: u64 = statuses.iter().map(UtxoStatus::minted_amount).sum();

        assert_eq!(minted, 99_000);
        assert_eq!(statuses[1].utxo().value, 50_000);
    }

    #[test]
    fn should_describe_missing_confirmations() {
        let error = UpdateBalanceError::NoNewUtxos {
            current_confirmations: Some(2),
            required_confirmations: 6,
            pending_utxos: Some(vec![PendingUtxo {
                outpoint: utxo(1).outpoint,
                value: 10_000,
                confirmations: 2,
            }]),
            suspended_utxos: None,
        };

        assert_eq!(
            error.to_string(),
            "no new UTXOs to process, the newest has 2 of 6 required confirmations (1 pending)"
        );
    }

    #[test]
    fn should_sum_withdrawal_fees() {
        let fee = WithdrawalFee {
            minter_fee: 1_000,
            bitcoin_fee: 2_500,
        };
        assert_eq!(fee.total(), 3_500);
    }
}
