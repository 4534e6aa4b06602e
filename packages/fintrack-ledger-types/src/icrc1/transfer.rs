use super::account::{Account, Subaccount};
use crate::ErrorKind;
use candid::{CandidType, Deserialize, Nat};
use serde::Serialize;
use serde_bytes::ByteBuf;
use std::fmt;
use thiserror::Error;

pub type BlockIndex = Nat;
pub type NumTokens = Nat;

/// Largest memo accepted by ICRC-1 ledgers with default settings.
pub const MAX_MEMO_LENGTH: usize = 32;

/// Largest amount representable by the ledgers' token type.
pub const MAX_AMOUNT_BITS: u64 = 256;

#[derive(Serialize, Deserialize, CandidType, Clone, Debug, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Memo(pub ByteBuf);

impl From<Vec<u8>> for Memo {
    fn from(bytes: Vec<u8>) -> Self {
        Self(ByteBuf::from(bytes))
    }
}

impl From<u64> for Memo {
    fn from(n: u64) -> Self {
        Self::from(n.to_be_bytes().to_vec())
    }
}

/// Argument of `icrc1_transfer` exactly as it travels on the wire.
///
/// Every `Option` is encoded as a candid `opt`, so an absent fee is distinct from a fee of zero.
#[derive(Serialize, Deserialize, CandidType, Clone, Debug, PartialEq, Eq)]
pub struct TransferArg {
    #[serde(default)]
    pub from_subaccount: Option<Subaccount>,
    pub to: Account,
    #[serde(default)]
    pub fee: Option<NumTokens>,
    #[serde(default)]
    pub created_at_time: Option<u64>,
    #[serde(default)]
    pub memo: Option<Memo>,
    pub amount: NumTokens,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum TransferError {
    BadFee { expected_fee: NumTokens },
    BadBurn { min_burn_amount: NumTokens },
    InsufficientFunds { balance: NumTokens },
    TooOld,
    CreatedInFuture { ledger_time: u64 },
    TemporarilyUnavailable,
    Duplicate { duplicate_of: BlockIndex },
    GenericError { error_code: Nat, message: String },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadFee { expected_fee } => {
                write!(f, "transfer fee should be {}", expected_fee)
            }
            Self::BadBurn { min_burn_amount } => write!(
                f,
                "the minimum number of tokens to be burned is {}",
                min_burn_amount
            ),
            Self::InsufficientFunds { balance } => write!(
                f,
                "the debit account doesn't have enough funds to complete the transaction, current balance: {}",
                balance
            ),
            Self::TooOld => write!(f, "transaction's created_at_time is too far in the past"),
            Self::CreatedInFuture { ledger_time } => write!(
                f,
                "transaction's created_at_time is in future, current ledger time is {}",
                ledger_time
            ),
            Self::Duplicate { duplicate_of } => write!(
                f,
                "transaction is a duplicate of another transaction in block {}",
                duplicate_of
            ),
            Self::TemporarilyUnavailable => write!(f, "the ledger is temporarily unavailable"),
            Self::GenericError {
                error_code,
                message,
            } => write!(f, "{} {}", error_code, message),
        }
    }
}

impl std::error::Error for TransferError {}

/// A transfer as requested by a caller, before it is checked and turned into a [`TransferArg`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub destination: Account,
    pub amount: NumTokens,
    /// Overrides the fee declared by the ledger.
    pub fee: Option<NumTokens>,
    pub memo: Option<Memo>,
    /// Nanoseconds since the epoch; enables the ledger's deduplication.
    pub created_at_time: Option<u64>,
    pub source_subaccount: Option<Subaccount>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidTransfer {
    #[error("transfer amount must be greater than zero")]
    ZeroAmount,
    #[error("transfer amount does not fit in {MAX_AMOUNT_BITS} bits")]
    AmountOutOfRange,
    #[error("memo is {len} bytes long, at most {MAX_MEMO_LENGTH} are accepted")]
    MemoTooLong { len: usize },
}

impl InvalidTransfer {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

impl TransferRequest {
    pub fn new(destination: Account, amount: impl Into<NumTokens>) -> Self {
        Self {
            destination,
            amount: amount.into(),
            fee: None,
            memo: None,
            created_at_time: None,
            source_subaccount: None,
        }
    }

    pub fn with_fee(mut self, fee: impl Into<NumTokens>) -> Self {
        self.fee = Some(fee.into());
        self
    }

    /// Integer memos are encoded big-endian, as the ckBTC and ckETH minters do.
    pub fn with_memo(mut self, memo: impl Into<Memo>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_created_at_time(mut self, created_at_time: u64) -> Self {
        self.created_at_time = Some(created_at_time);
        self
    }

    pub fn with_source_subaccount(mut self, subaccount: Subaccount) -> Self {
        self.source_subaccount = Some(subaccount);
        self
    }

    /// Checks the request and produces the wire argument; the amount is moved, never converted.
    pub fn validate(self) -> Result<TransferArg, InvalidTransfer> {
        if self.amount == 0_u64 {
            return Err(InvalidTransfer::ZeroAmount);
        }
        if self.amount.0.bits() > MAX_AMOUNT_BITS {
            return Err(InvalidTransfer::AmountOutOfRange);
        }
        if let Some(memo) = &self.memo {
            if memo.0.len() > MAX_MEMO_LENGTH {
                return Err(InvalidTransfer::MemoTooLong { len: memo.0.len() });
            }
        }
        Ok(TransferArg {
            from_subaccount: self.source_subaccount,
            to: self.destination,
            fee: self.fee,
            created_at_time: self.created_at_time,
            memo: self.memo,
            amount: self.amount,
        })
    }
}
