//! Types exchanged with ICRC ledgers, the ckBTC/ckETH minters and the FinTrack backend.
//!
//! Nothing in this crate performs I/O. Amounts are always [`candid::Nat`] in base units;
//! [`tokens`] holds the only conversions between user-entered decimal text and base units.

pub mod error;
pub mod icrc1;
pub mod icrc2;
pub mod minter;
pub mod tokens;

pub use error::ErrorKind;
