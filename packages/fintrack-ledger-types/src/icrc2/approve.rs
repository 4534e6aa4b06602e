use crate::icrc1::account::{Account, Subaccount};
use crate::icrc1::transfer::{BlockIndex, Memo, NumTokens};
use candid::{CandidType, Deserialize, Nat};
use serde::Serialize;
use std::fmt;

/// Argument of `icrc2_approve`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ApproveArgs {
    #[serde(default)]
    pub from_subaccount: Option<Subaccount>,
    pub spender: Account,
    pub amount: NumTokens,
    #[serde(default)]
    pub expected_allowance: Option<NumTokens>,
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub fee: Option<NumTokens>,
    #[serde(default)]
    pub memo: Option<Memo>,
    #[serde(default)]
    pub created_at_time: Option<u64>,
}

impl ApproveArgs {
    /// An approval of `amount` for `spender` with every optional field left to the ledger.
    pub fn new(spender: Account, amount: NumTokens, from_subaccount: Option<Subaccount>) -> Self {
        Self {
            from_subaccount,
            spender,
            amount,
            expected_allowance: None,
            expires_at: None,
            fee: None,
            memo: None,
            created_at_time: None,
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum ApproveError {
    BadFee { expected_fee: NumTokens },
    InsufficientFunds { balance: NumTokens },
    AllowanceChanged { current_allowance: NumTokens },
    Expired { ledger_time: u64 },
    TooOld,
    CreatedInFuture { ledger_time: u64 },
    Duplicate { duplicate_of: BlockIndex },
    TemporarilyUnavailable,
    GenericError { error_code: Nat, message: String },
}

impl fmt::Display for ApproveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadFee { expected_fee } => write!(f, "approve fee should be {}", expected_fee),
            Self::InsufficientFunds { balance } => write!(
                f,
                "the debit account doesn't have enough funds to pay the approval fee, current balance: {}",
                balance
            ),
            Self::AllowanceChanged { current_allowance } => write!(
                f,
                "the current allowance ({}) does not match the expected allowance",
                current_allowance
            ),
            Self::Expired { ledger_time } => write!(
                f,
                "the approval expiration time is in the past, ledger time: {}",
                ledger_time
            ),
            Self::TooOld => write!(f, "the approval's created_at_time is too far in the past"),
            Self::CreatedInFuture { ledger_time } => write!(
                f,
                "the approval's created_at_time is in the future, ledger time: {}",
                ledger_time
            ),
            Self::Duplicate { duplicate_of } => write!(
                f,
                "the approval is a duplicate of another one in block {}",
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

impl std::error::Error for ApproveError {}
