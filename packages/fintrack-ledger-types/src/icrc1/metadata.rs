use candid::{CandidType, Deserialize, Nat};
use serde::Serialize;

/// The descriptive parameters of a token, gathered from the individual ICRC-1 queries.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Default transfer fee, in base units.
    pub fee: Nat,
}
