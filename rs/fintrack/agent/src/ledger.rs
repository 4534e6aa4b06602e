use crate::{null_request::NullRequest, CallCanisters, Request};
use candid::{Nat, Principal};
use fintrack_ledger_types::icrc1::account::Account;
use fintrack_ledger_types::icrc1::metadata::TokenMetadata;
use fintrack_ledger_types::icrc1::transfer::{
    BlockIndex, InvalidTransfer, NumTokens, TransferArg, TransferError, TransferRequest,
};
use fintrack_ledger_types::icrc2::approve::{ApproveArgs, ApproveError};
use fintrack_ledger_types::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The chain-key tokens FinTrack moves in and out of.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Token {
    CkBtc,
    CkEth,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LedgerCanister {
    pub canister_id: Principal,
}

/// The ledger of each [`Token`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TokenLedgers {
    pub ckbtc: LedgerCanister,
    pub cketh: LedgerCanister,
}

impl TokenLedgers {
    pub fn get(&self, token: Token) -> LedgerCanister {
        match token {
            Token::CkBtc => self.ckbtc,
            Token::CkEth => self.cketh,
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerCallError<E> {
    #[error("invalid transfer: {0}")]
    InvalidRequest(#[from] InvalidTransfer),
    #[error("ledger call failed: {0}")]
    Call(#[source] E),
}

impl<E> LedgerCallError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::Call(_) => ErrorKind::Network,
        }
    }
}

/// `icrc1_balance_of` argument.
pub struct BalanceOf {
    pub account: Account,
}

impl Request for BalanceOf {
    fn method(&self) -> &'static str {
        "icrc1_balance_of"
    }

    fn update(&self) -> bool {
        false
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self.account)
    }

    type Response = Nat;
}

impl Request for TransferArg {
    fn method(&self) -> &'static str {
        "icrc1_transfer"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = Result<BlockIndex, TransferError>;
}

impl Request for ApproveArgs {
    fn method(&self) -> &'static str {
        "icrc2_approve"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = Result<Nat, ApproveError>;
}

impl LedgerCanister {
    pub fn new(canister_id: impl Into<Principal>) -> Self {
        Self {
            canister_id: canister_id.into(),
        }
    }

    /// Validates `request` and submits it once. A ledger rejection is returned as the inner
    /// `Err`, untouched.
    pub async fn transfer<C: CallCanisters>(
        &self,
        agent: &C,
        request: TransferRequest,
    ) -> Result<Result<BlockIndex, TransferError>, LedgerCallError<C::Error>> {
        let arg = request.validate()?;
        debug!(ledger = %self.canister_id, to = %arg.to, amount = %arg.amount, "submitting transfer");
        agent
            .call(self.canister_id, arg)
            .await
            .map_err(LedgerCallError::Call)
    }

    pub async fn balance_of<C: CallCanisters>(
        &self,
        agent: &C,
        account: Account,
    ) -> Result<NumTokens, C::Error> {
        agent.call(self.canister_id, BalanceOf { account }).await
    }

    pub async fn fee<C: CallCanisters>(&self, agent: &C) -> Result<NumTokens, C::Error> {
        agent
            .call(self.canister_id, NullRequest::new("icrc1_fee", false))
            .await
    }

    /// Fetches name, symbol, decimals and fee with four concurrent queries.
    pub async fn metadata<C: CallCanisters>(&self, agent: &C) -> Result<TokenMetadata, C::Error> {
        let (name, symbol, decimals, fee) = futures::try_join!(
            agent.call(
                self.canister_id,
                NullRequest::<String>::new("icrc1_name", false)
            ),
            agent.call(
                self.canister_id,
                NullRequest::<String>::new("icrc1_symbol", false)
            ),
            agent.call(
                self.canister_id,
                NullRequest::<u8>::new("icrc1_decimals", false)
            ),
            self.fee(agent),
        )?;
        Ok(TokenMetadata {
            name,
            symbol,
            decimals,
            fee,
        })
    }

    pub async fn approve<C: CallCanisters>(
        &self,
        agent: &C,
        args: ApproveArgs,
    ) -> Result<Result<Nat, ApproveError>, C::Error> {
        debug!(ledger = %self.canister_id, spender = %args.spender, amount = %args.amount, "approving spender");
        agent.call(self.canister_id, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeCallError, FakeCanisters};
    use assert_matches::assert_matches;
    use std::str::FromStr;

    fn ledger() -> LedgerCanister {
        LedgerCanister::new(Principal::from_slice(&[0, 0, 0, 0, 2, 48, 0, 6, 1, 1]))
    }

    fn user() -> Principal {
        Principal::from_slice(&[7; 29])
    }

    fn destination() -> Account {
        Account::from(Principal::from_slice(&[9; 10]))
    }

    #[tokio::test]
    async fn should_submit_validated_transfer() {
        let agent = FakeCanisters::new(user());
        agent.reply(
            ledger().canister_id,
            "icrc1_transfer",
            Ok::<Nat, TransferError>(Nat::from(42_u64)),
        );

        let result = ledger()
            .transfer(
                &agent,
                TransferRequest::new(destination(), 1_000_u64).with_memo(b"fintrack".to_vec()),
            )
            .await
            .unwrap();

        assert_eq!(result, Ok(Nat::from(42_u64)));
        let calls = agent.calls_to("icrc1_transfer");
        assert_eq!(calls.len(), 1);
        assert!(calls[0].update);
        let arg: TransferArg = calls[0].decode_arg();
        assert_eq!(arg.to, destination());
        assert_eq!(arg.amount, Nat::from(1_000_u64));
        assert_eq!(arg.fee, None);
    }

    #[tokio::test]
    async fn should_not_call_ledger_for_invalid_transfer() {
        let agent = FakeCanisters::new(user());

        let result = ledger()
            .transfer(&agent, TransferRequest::new(destination(), 0_u64))
            .await;

        assert_matches!(
            result,
            Err(LedgerCallError::InvalidRequest(InvalidTransfer::ZeroAmount))
        );
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn should_pass_ledger_rejection_through() {
        let agent = FakeCanisters::new(user());
        let rejection = TransferError::InsufficientFunds {
            balance: Nat::from(5_u64),
        };
        agent.reply(
            ledger().canister_id,
            "icrc1_transfer",
            Err::<Nat, TransferError>(rejection.clone()),
        );

        let result = ledger()
            .transfer(&agent, TransferRequest::new(destination(), 10_u64))
            .await
            .unwrap();

        assert_eq!(result, Err(rejection));
    }

    #[tokio::test]
    async fn should_report_transport_failure_as_network_error() {
        let agent = FakeCanisters::new(user());
        agent.fail(ledger().canister_id, "icrc1_transfer", "connection reset");

        let error = ledger()
            .transfer(&agent, TransferRequest::new(destination(), 10_u64))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Network);
        assert_matches!(error, LedgerCallError::Call(FakeCallError::Transport(_)));
    }

    #[tokio::test]
    async fn should_query_balance_of_account() {
        let agent = FakeCanisters::new(user());
        agent.reply(ledger().canister_id, "icrc1_balance_of", Nat::from(1_234_u64));

        let balance = ledger().balance_of(&agent, destination()).await.unwrap();

        assert_eq!(balance, Nat::from(1_234_u64));
        let calls = agent.calls_to("icrc1_balance_of");
        assert!(!calls[0].update);
        assert_eq!(calls[0].decode_arg::<Account>(), destination());
    }

    #[tokio::test]
    async fn should_collect_metadata() {
        let agent = FakeCanisters::new(user());
        let id = ledger().canister_id;
        agent.reply(id, "icrc1_name", "ckBTC".to_string());
        agent.reply(id, "icrc1_symbol", "ckBTC".to_string());
        agent.reply(id, "icrc1_decimals", 8_u8);
        agent.reply(id, "icrc1_fee", Nat::from(10_u64));

        let metadata = ledger().metadata(&agent).await.unwrap();

        assert_eq!(
            metadata,
            TokenMetadata {
                name: "ckBTC".to_string(),
                symbol: "ckBTC".to_string(),
                decimals: 8,
                fee: Nat::from(10_u64),
            }
        );
        assert_eq!(agent.calls().len(), 4);
    }

    #[tokio::test]
    async fn should_fail_metadata_when_any_query_fails() {
        let agent = FakeCanisters::new(user());
        let id = ledger().canister_id;
        agent.reply(id, "icrc1_name", "ckETH".to_string());
        agent.reply(id, "icrc1_symbol", "ckETH".to_string());
        agent.reply(id, "icrc1_decimals", 18_u8);

        assert_matches!(
            ledger().metadata(&agent).await,
            Err(FakeCallError::NoReply { method, .. }) if method == "icrc1_fee"
        );
    }

    #[tokio::test]
    async fn should_approve_spender() {
        let agent = FakeCanisters::new(user());
        agent.reply(
            ledger().canister_id,
            "icrc2_approve",
            Ok::<Nat, ApproveError>(Nat::from(3_u64)),
        );
        let spender = Account::from(Principal::from_slice(&[5; 10]));

        let result = ledger()
            .approve(&agent, ApproveArgs::new(spender, Nat::from(500_u64), None))
            .await
            .unwrap();

        assert_eq!(result, Ok(Nat::from(3_u64)));
        let args: ApproveArgs = agent.calls_to("icrc2_approve")[0].decode_arg();
        assert_eq!(args.spender, spender);
        assert_eq!(args.fee, None);
    }

    #[test]
    fn should_select_ledger_by_token() {
        let ledgers = TokenLedgers {
            ckbtc: LedgerCanister::new(Principal::from_slice(&[1])),
            cketh: LedgerCanister::new(Principal::from_slice(&[2])),
        };
        assert_eq!(ledgers.get(Token::CkBtc), ledgers.ckbtc);
        assert_eq!(ledgers.get(Token::from_str("cketh").unwrap()), ledgers.cketh);
        assert_eq!(Token::CkBtc.to_string(), "ckbtc");
    }
}
