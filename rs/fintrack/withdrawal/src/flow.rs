//! The two network steps of a withdrawal, for each supported token.

use async_trait::async_trait;
use candid::Nat;
use fintrack_agent::ledger::LedgerCanister;
use fintrack_agent::minter::{CkBtcMinterCanister, CkEthMinterCanister};
use fintrack_agent::CallCanisters;
use fintrack_ledger_types::icrc1::account::{Account, Subaccount};
use fintrack_ledger_types::icrc2::approve::{ApproveArgs, ApproveError};
use fintrack_ledger_types::minter::{
    RetrieveBtcWithApprovalArgs, RetrieveBtcWithApprovalError, WithdrawalArg, WithdrawalError,
};
use fintrack_ledger_types::ErrorKind;
use mockall::automock;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("the ledger rejected the approval: {0}")]
    Approve(ApproveError),
    #[error("the ckBTC minter rejected the withdrawal: {0}")]
    RetrieveBtc(RetrieveBtcWithApprovalError),
    #[error("the ckETH minter rejected the withdrawal: {0}")]
    WithdrawEth(WithdrawalError),
    #[error("amount {0} is larger than the minter accepts")]
    AmountOutOfRange(Nat),
    #[error("call failed: {0}")]
    Call(String),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Approve(_) | Self::RetrieveBtc(_) | Self::WithdrawEth(_) => ErrorKind::Ledger,
            Self::AmountOutOfRange(_) => ErrorKind::Validation,
            Self::Call(_) => ErrorKind::Network,
        }
    }
}

/// Approve-then-withdraw against one ledger and its minter.
#[automock]
#[async_trait]
pub trait WithdrawalFlow: Send + Sync {
    /// Allows the minter to burn `amount` from the caller's account.
    async fn approve(&self, amount: &Nat) -> Result<(), FlowError>;

    /// Asks the minter to burn `amount` and pay it out to `destination`. Returns the
    /// withdrawal identifier.
    async fn withdraw(&self, destination: &str, amount: &Nat) -> Result<String, FlowError>;
}

async fn approve_minter<C: CallCanisters>(
    agent: &C,
    ledger: &LedgerCanister,
    spender: Account,
    amount: &Nat,
    from_subaccount: Option<Subaccount>,
) -> Result<(), FlowError> {
    let args = ApproveArgs::new(spender, amount.clone(), from_subaccount);
    match ledger.approve(agent, args).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(err)) => Err(FlowError::Approve(err)),
        Err(err) => Err(FlowError::Call(err.to_string())),
    }
}

pub struct CkBtcWithdrawalFlow<C> {
    pub agent: Arc<C>,
    pub ledger: LedgerCanister,
    pub minter: CkBtcMinterCanister,
    pub from_subaccount: Option<Subaccount>,
}

#[async_trait]
impl<C: CallCanisters> WithdrawalFlow for CkBtcWithdrawalFlow<C> {
    async fn approve(&self, amount: &Nat) -> Result<(), FlowError> {
        approve_minter(
            self.agent.as_ref(),
            &self.ledger,
            self.minter.spender(),
            amount,
            self.from_subaccount,
        )
        .await
    }

    async fn withdraw(&self, destination: &str, amount: &Nat) -> Result<String, FlowError> {
        let satoshi =
            u64::try_from(&amount.0).map_err(|_| FlowError::AmountOutOfRange(amount.clone()))?;
        let args = RetrieveBtcWithApprovalArgs {
            amount: satoshi,
            address: destination.to_string(),
            from_subaccount: self.from_subaccount,
        };
        match self
            .minter
            .retrieve_btc_with_approval(self.agent.as_ref(), args)
            .await
        {
            Ok(Ok(ok)) => Ok(ok.block_index.to_string()),
            Ok(Err(err)) => Err(FlowError::RetrieveBtc(err)),
            Err(err) => Err(FlowError::Call(err.to_string())),
        }
    }
}

pub struct CkEthWithdrawalFlow<C> {
    pub agent: Arc<C>,
    pub ledger: LedgerCanister,
    pub minter: CkEthMinterCanister,
    pub from_subaccount: Option<Subaccount>,
}

#[async_trait]
impl<C: CallCanisters> WithdrawalFlow for CkEthWithdrawalFlow<C> {
    async fn approve(&self, amount: &Nat) -> Result<(), FlowError> {
        approve_minter(
            self.agent.as_ref(),
            &self.ledger,
            self.minter.spender(),
            amount,
            self.from_subaccount,
        )
        .await
    }

    async fn withdraw(&self, destination: &str, amount: &Nat) -> Result<String, FlowError> {
        let args = WithdrawalArg {
            amount: amount.clone(),
            recipient: destination.to_string(),
            from_subaccount: self.from_subaccount,
        };
        match self.minter.withdraw_eth(self.agent.as_ref(), args).await {
            Ok(Ok(request)) => Ok(request.block_index.0.to_string()),
            Ok(Err(err)) => Err(FlowError::WithdrawEth(err)),
            Err(err) => Err(FlowError::Call(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use candid::Principal;
    use fintrack_agent::fake::FakeCanisters;
    use fintrack_ledger_types::minter::{RetrieveBtcOk, RetrieveEthRequest};
    use num_bigint::BigUint;

    fn ledger() -> LedgerCanister {
        LedgerCanister::new(Principal::from_slice(&[1; 10]))
    }

    fn btc_flow() -> CkBtcWithdrawalFlow<FakeCanisters> {
        CkBtcWithdrawalFlow {
            agent: Arc::new(FakeCanisters::new(Principal::from_slice(&[9; 29]))),
            ledger: ledger(),
            minter: CkBtcMinterCanister::new(Principal::from_slice(&[2; 10])),
            from_subaccount: None,
        }
    }

    fn eth_flow() -> CkEthWithdrawalFlow<FakeCanisters> {
        CkEthWithdrawalFlow {
            agent: Arc::new(FakeCanisters::new(Principal::from_slice(&[9; 29]))),
            ledger: ledger(),
            minter: CkEthMinterCanister::new(Principal::from_slice(&[3; 10])),
            from_subaccount: None,
        }
    }

    #[tokio::test]
    async fn should_approve_minter_for_exact_amount() {
        let flow = btc_flow();
        flow.agent.reply(
            ledger().canister_id,
            "icrc2_approve",
            Ok::<Nat, ApproveError>(Nat::from(1_u8)),
        );

        flow.approve(&Nat::from(25_000_u64)).await.unwrap();

        let args: ApproveArgs = flow.agent.calls_to("icrc2_approve")[0].decode_arg();
        assert_eq!(args.spender, Account::from(flow.minter.canister_id));
        assert_eq!(args.amount, Nat::from(25_000_u64));
        assert_eq!(args.fee, None);
    }

    #[tokio::test]
    async fn should_keep_structured_approval_error() {
        let flow = eth_flow();
        let rejection = ApproveError::InsufficientFunds {
            balance: Nat::from(0_u8),
        };
        flow.agent.reply(
            ledger().canister_id,
            "icrc2_approve",
            Err::<Nat, ApproveError>(rejection.clone()),
        );

        let error = flow.approve(&Nat::from(1_u8)).await.unwrap_err();

        assert_eq!(error, FlowError::Approve(rejection));
        assert_eq!(error.kind(), ErrorKind::Ledger);
    }

    #[tokio::test]
    async fn should_report_btc_block_index_as_id() {
        let flow = btc_flow();
        flow.agent.reply(
            flow.minter.canister_id,
            "retrieve_btc_with_approval",
            Ok::<_, RetrieveBtcWithApprovalError>(RetrieveBtcOk { block_index: 1234 }),
        );

        let id = flow
            .withdraw("tb1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh", &Nat::from(50_000_u64))
            .await
            .unwrap();

        assert_eq!(id, "1234");
        let args: RetrieveBtcWithApprovalArgs =
            flow.agent.calls_to("retrieve_btc_with_approval")[0].decode_arg();
        assert_eq!(args.amount, 50_000);
    }

    #[tokio::test]
    async fn should_refuse_btc_amount_beyond_u64_without_calling() {
        let flow = btc_flow();
        let amount = Nat(BigUint::from(u64::MAX) + 1_u8);

        assert_matches!(
            flow.withdraw("tb1q", &amount).await,
            Err(FlowError::AmountOutOfRange(_))
        );
        assert!(flow.agent.calls().is_empty());
    }

    #[tokio::test]
    async fn should_report_eth_block_index_as_id() {
        let flow = eth_flow();
        flow.agent.reply(
            flow.minter.canister_id,
            "withdraw_eth",
            Ok::<_, WithdrawalError>(RetrieveEthRequest {
                block_index: Nat::from(987_u64),
            }),
        );

        let id = flow
            .withdraw(
                "0xb44B5e756A894775FC32EDdf3314Bb1B1944dC34",
                &Nat::from(10_000_000_000_000_000_u64),
            )
            .await
            .unwrap();

        assert_eq!(id, "987");
    }

    #[tokio::test]
    async fn should_map_transport_failure_to_call_error() {
        let flow = eth_flow();
        flow.agent
            .fail(flow.minter.canister_id, "withdraw_eth", "replica unavailable");

        let error = flow
            .withdraw("0xb44B5e756A894775FC32EDdf3314Bb1B1944dC34", &Nat::from(1_u8))
            .await
            .unwrap_err();

        assert_matches!(error, FlowError::Call(_));
        assert_eq!(error.kind(), ErrorKind::Network);
    }
}
