//! Withdrawals of ckBTC and ckETH to their native chains.
//!
//! A withdrawal is two sequential update calls: an ICRC-2 approval of the minter on the token
//! ledger, then the minter's withdrawal endpoint. [`WithdrawalOrchestrator`] runs them as a
//! small state machine and [`progress`] turns its sessions into renderable step lists.

pub mod flow;
pub mod orchestrator;
pub mod progress;
pub mod session;

pub use flow::{CkBtcWithdrawalFlow, CkEthWithdrawalFlow, FlowError, WithdrawalFlow};
pub use orchestrator::{
    InvalidWithdrawal, ResetError, WithdrawError, WithdrawalOrchestrator, WithdrawalRequest,
};
pub use session::{StepFailure, WithdrawalSession, WithdrawalStatus, WithdrawalStep};
