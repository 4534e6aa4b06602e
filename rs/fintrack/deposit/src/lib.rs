//! ETH deposits into ckETH.
//!
//! A deposit is a single `deposit(bytes32)` call on the ckETH helper contract, sent from the
//! user's external wallet, whose argument identifies the principal to credit.

pub mod abi;
pub mod bridge;
pub mod identity_tag;
pub mod wallet;

pub use bridge::{DepositBridge, DepositError, DepositOutcome, DepositSettings};
pub use identity_tag::{IdentityTag, IdentityTagSource, ResolvedIdentityTag};
pub use wallet::{EthereumWallet, JsonRpcWallet, WalletError};
