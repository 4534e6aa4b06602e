//! Clients for the ckBTC and ckETH minters.
//!
//! The minters burn withdrawn tokens through ICRC-2 `transfer_from`, so a withdrawal must be
//! preceded by an `icrc2_approve` on the token ledger naming [`spender`] as spender.
//!
//! BTC deposits go to the address returned by `get_btc_address` and are credited as ckBTC only
//! once `update_balance` is called after the transaction has enough confirmations.

use crate::{CallCanisters, Request};
use candid::Principal;
use fintrack_ledger_types::icrc1::account::Account;
use fintrack_ledger_types::minter::{
    Eip1559TransactionPrice, Eip1559TransactionPriceArg, EstimateFeeArg, GetBtcAddressArgs,
    RetrieveBtcOk, RetrieveBtcWithApprovalArgs, RetrieveBtcWithApprovalError, RetrieveEthRequest,
    UpdateBalanceArgs, UpdateBalanceError, UtxoStatus, WithdrawalArg, WithdrawalError,
    WithdrawalFee,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The account a minter burns from when it executes `transfer_from`.
pub fn spender(minter_id: Principal) -> Account {
    Account::from(minter_id)
}

impl Request for RetrieveBtcWithApprovalArgs {
    fn method(&self) -> &'static str {
        "retrieve_btc_with_approval"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = Result<RetrieveBtcOk, RetrieveBtcWithApprovalError>;
}

impl Request for WithdrawalArg {
    fn method(&self) -> &'static str {
        "withdraw_eth"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = Result<RetrieveEthRequest, WithdrawalError>;
}

impl Request for GetBtcAddressArgs {
    fn method(&self) -> &'static str {
        "get_btc_address"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = String;
}

impl Request for UpdateBalanceArgs {
    fn method(&self) -> &'static str {
        "update_balance"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = Result<Vec<UtxoStatus>, UpdateBalanceError>;
}

impl Request for EstimateFeeArg {
    fn method(&self) -> &'static str {
        "estimate_withdrawal_fee"
    }

    fn update(&self) -> bool {
        false
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(self)
    }

    type Response = WithdrawalFee;
}

/// `eip_1559_transaction_price` argument: `None` prices an ETH withdrawal.
pub struct Eip1559TransactionPriceRequest {
    pub arg: Option<Eip1559TransactionPriceArg>,
}

impl Request for Eip1559TransactionPriceRequest {
    fn method(&self) -> &'static str {
        "eip_1559_transaction_price"
    }

    fn update(&self) -> bool {
        false
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(&self.arg)
    }

    type Response = Eip1559TransactionPrice;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CkBtcMinterCanister {
    pub canister_id: Principal,
}

impl CkBtcMinterCanister {
    pub fn new(canister_id: impl Into<Principal>) -> Self {
        Self {
            canister_id: canister_id.into(),
        }
    }

    pub fn spender(&self) -> Account {
        spender(self.canister_id)
    }

    pub async fn retrieve_btc_with_approval<C: CallCanisters>(
        &self,
        agent: &C,
        args: RetrieveBtcWithApprovalArgs,
    ) -> Result<Result<RetrieveBtcOk, RetrieveBtcWithApprovalError>, C::Error> {
        debug!(minter = %self.canister_id, address = %args.address, amount = args.amount, "retrieving BTC");
        agent.call(self.canister_id, args).await
    }

    /// The Bitcoin address whose deposits are minted to `account`.
    pub async fn get_btc_address<C: CallCanisters>(
        &self,
        agent: &C,
        account: Account,
    ) -> Result<String, C::Error> {
        agent
            .call(
                self.canister_id,
                GetBtcAddressArgs {
                    owner: Some(account.owner),
                    subaccount: account.subaccount,
                },
            )
            .await
    }

    /// Mints ckBTC for the confirmed deposits to `account`'s Bitcoin address.
    pub async fn update_balance<C: CallCanisters>(
        &self,
        agent: &C,
        account: Account,
    ) -> Result<Result<Vec<UtxoStatus>, UpdateBalanceError>, C::Error> {
        debug!(minter = %self.canister_id, %account, "updating BTC balance");
        agent
            .call(
                self.canister_id,
                UpdateBalanceArgs {
                    owner: Some(account.owner),
                    subaccount: account.subaccount,
                },
            )
            .await
    }

    /// Fees the minter would deduct from a withdrawal of `amount` satoshi.
    pub async fn estimate_withdrawal_fee<C: CallCanisters>(
        &self,
        agent: &C,
        amount: Option<u64>,
    ) -> Result<WithdrawalFee, C::Error> {
        agent
            .call(self.canister_id, EstimateFeeArg { amount })
            .await
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CkEthMinterCanister {
    pub canister_id: Principal,
}

impl CkEthMinterCanister {
    pub fn new(canister_id: impl Into<Principal>) -> Self {
        Self {
            canister_id: canister_id.into(),
        }
    }

    pub fn spender(&self) -> Account {
        spender(self.canister_id)
    }

    pub async fn withdraw_eth<C: CallCanisters>(
        &self,
        agent: &C,
        args: WithdrawalArg,
    ) -> Result<Result<RetrieveEthRequest, WithdrawalError>, C::Error> {
        debug!(minter = %self.canister_id, recipient = %args.recipient, amount = %args.amount, "withdrawing ETH");
        agent.call(self.canister_id, args).await
    }

    /// Current price of an ETH withdrawal transaction.
    pub async fn eip_1559_transaction_price<C: CallCanisters>(
        &self,
        agent: &C,
    ) -> Result<Eip1559TransactionPrice, C::Error> {
        agent
            .call(
                self.canister_id,
                Eip1559TransactionPriceRequest { arg: None },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeCanisters;
    use candid::Nat;
    use fintrack_ledger_types::minter::{OutPoint, Utxo};
    use serde_bytes::ByteBuf;

    fn caller() -> Principal {
        Principal::from_slice(&[3; 29])
    }

    #[tokio::test]
    async fn should_retrieve_btc() {
        let minter = CkBtcMinterCanister::new(Principal::from_slice(&[1; 10]));
        let agent = FakeCanisters::new(caller());
        agent.reply(
            minter.canister_id,
            "retrieve_btc_with_approval",
            Ok::<_, RetrieveBtcWithApprovalError>(RetrieveBtcOk { block_index: 77 }),
        );
        let args = RetrieveBtcWithApprovalArgs {
            amount: 50_000,
            address: "tb1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh".to_string(),
            from_subaccount: None,
        };

        let result = minter
            .retrieve_btc_with_approval(&agent, args.clone())
            .await
            .unwrap();

        assert_eq!(result, Ok(RetrieveBtcOk { block_index: 77 }));
        let call = &agent.calls_to("retrieve_btc_with_approval")[0];
        assert!(call.update);
        assert_eq!(call.decode_arg::<RetrieveBtcWithApprovalArgs>(), args);
    }

    #[tokio::test]
    async fn should_pass_minter_rejection_through() {
        let minter = CkEthMinterCanister::new(Principal::from_slice(&[2; 10]));
        let agent = FakeCanisters::new(caller());
        let rejection = WithdrawalError::AmountTooLow {
            min_withdrawal_amount: Nat::from(30_000_000_000_000_000_u64),
        };
        agent.reply(
            minter.canister_id,
            "withdraw_eth",
            Err::<RetrieveEthRequest, _>(rejection.clone()),
        );

        let result = minter
            .withdraw_eth(
                &agent,
                WithdrawalArg {
                    amount: Nat::from(1_u64),
                    recipient: "0xb44B5e756A894775FC32EDdf3314Bb1B1944dC34".to_string(),
                    from_subaccount: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(result, Err(rejection));
    }

    #[tokio::test]
    async fn should_ask_for_btc_address_of_account() {
        let minter = CkBtcMinterCanister::new(Principal::from_slice(&[1; 10]));
        let agent = FakeCanisters::new(caller());
        let address = "tb1q0qjq4e3d5l9zr7jn3u2hx8l6kfl2v9ln5hkt8y".to_string();
        agent.reply(minter.canister_id, "get_btc_address", address.clone());
        let account = Account {
            owner: caller(),
            subaccount: Some([5; 32]),
        };

        assert_eq!(
            minter.get_btc_address(&agent, account).await.unwrap(),
            address
        );
        let call = &agent.calls_to("get_btc_address")[0];
        assert!(call.update);
        assert_eq!(
            call.decode_arg::<GetBtcAddressArgs>(),
            GetBtcAddressArgs {
                owner: Some(caller()),
                subaccount: Some([5; 32]),
            }
        );
    }

    #[tokio::test]
    async fn should_report_minted_and_pending_utxos() {
        let minter = CkBtcMinterCanister::new(Principal::from_slice(&[1; 10]));
        let agent = FakeCanisters::new(caller());
        let utxo = Utxo {
            outpoint: OutPoint {
                txid: ByteBuf::from(vec![7; 32]),
                vout: 0,
            },
            value: 100_000,
            height: 2_500_000,
        };
        let minted = UtxoStatus::Minted {
            block_index: 9,
            minted_amount: 99_500,
            utxo,
        };
        agent.reply(
            minter.canister_id,
            "update_balance",
            Ok::<_, UpdateBalanceError>(vec![minted.clone()]),
        );
        let no_new_utxos = UpdateBalanceError::NoNewUtxos {
            current_confirmations: Some(1),
            required_confirmations: 4,
            pending_utxos: None,
            suspended_utxos: None,
        };
        agent.reply(
            minter.canister_id,
            "update_balance",
            Err::<Vec<UtxoStatus>, _>(no_new_utxos.clone()),
        );
        let account = Account::from(caller());

        assert_eq!(
            minter.update_balance(&agent, account).await.unwrap(),
            Ok(vec![minted])
        );
        assert_eq!(
            minter.update_balance(&agent, account).await.unwrap(),
            Err(no_new_utxos)
        );
        let calls = agent.calls_to("update_balance");
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|call| call.update));
        assert_eq!(
            calls[0].decode_arg::<UpdateBalanceArgs>().owner,
            Some(caller())
        );
    }

    #[tokio::test]
    async fn should_query_withdrawal_fees() {
        let ckbtc = CkBtcMinterCanister::new(Principal::from_slice(&[1; 10]));
        let cketh = CkEthMinterCanister::new(Principal::from_slice(&[2; 10]));
        let agent = FakeCanisters::new(caller());
        let fee = WithdrawalFee {
            minter_fee: 246,
            bitcoin_fee: 1_400,
        };
        agent.reply(ckbtc.canister_id, "estimate_withdrawal_fee", fee);
        let price = Eip1559TransactionPrice {
            gas_limit: Nat::from(21_000_u32),
            max_fee_per_gas: Nat::from(3_000_000_000_u64),
            max_priority_fee_per_gas: Nat::from(1_500_000_000_u64),
            max_transaction_fee: Nat::from(63_000_000_000_000_u64),
            timestamp: Some(1_700_000_000_000_000_000),
        };
        agent.reply(cketh.canister_id, "eip_1559_transaction_price", price.clone());

        assert_eq!(
            ckbtc
                .estimate_withdrawal_fee(&agent, Some(50_000))
                .await
                .unwrap(),
            fee
        );
        assert_eq!(
            cketh.eip_1559_transaction_price(&agent).await.unwrap(),
            price
        );

        let fee_call = &agent.calls_to("estimate_withdrawal_fee")[0];
        assert!(!fee_call.update);
        assert_eq!(
            fee_call.decode_arg::<EstimateFeeArg>(),
            EstimateFeeArg {
                amount: Some(50_000)
            }
        );
        let price_call = &agent.calls_to("eip_1559_transaction_price")[0];
        assert!(!price_call.update);
        assert_eq!(
            price_call.decode_arg::<Option<Eip1559TransactionPriceArg>>(),
            None
        );
    }

    #[test]
    fn should_use_minter_default_account_as_spender() {
        let minter = CkEthMinterCanister::new(Principal::from_slice(&[2; 10]));
        assert_eq!(minter.spender(), Account::from(minter.canister_id));
        assert_eq!(minter.spender().subaccount, None);
    }
}
