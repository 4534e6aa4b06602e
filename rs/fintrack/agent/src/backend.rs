use crate::{CallCanisters, Request};
use candid::Principal;
use serde::{Deserialize, Serialize};

/// `principal_to_bytes32` argument: the principal in its textual form.
pub struct PrincipalToBytes32 {
    pub principal_text: String,
}

impl Request for PrincipalToBytes32 {
    fn method(&self) -> &'static str {
        "principal_to_bytes32"
    }

    fn update(&self) -> bool {
        false
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(&self.principal_text)
    }

    type Response = Result<String, String>;
}

/// `eth_get_deposit_address` argument.
pub struct EthGetDepositAddress {
    pub subaccount: Option<Vec<u8>>,
}

impl Request for EthGetDepositAddress {
    fn method(&self) -> &'static str {
        "eth_get_deposit_address"
    }

    fn update(&self) -> bool {
        true
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_one(&self.subaccount)
    }

    type Response = Result<String, String>;
}

/// The FinTrack backend canister.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendCanister {
    pub canister_id: Principal,
}

impl BackendCanister {
    pub fn new(canister_id: impl Into<Principal>) -> Self {
        Self {
            canister_id: canister_id.into(),
        }
    }

    /// Returns `0x`-prefixed hex of `[len, principal bytes.., zero padding]`, the tag the
    /// ckETH helper contract expects.
    pub async fn principal_to_bytes32<C: CallCanisters>(
        &self,
        agent: &C,
        principal_text: impl Into<String>,
    ) -> Result<Result<String, String>, C::Error> {
        let request = PrincipalToBytes32 {
            principal_text: principal_text.into(),
        };
        agent.call(self.canister_id, request).await
    }

    /// Returns the helper contract address that ETH deposits must be sent to.
    pub async fn eth_get_deposit_address<C: CallCanisters>(
        &self,
        agent: &C,
        subaccount: Option<Vec<u8>>,
    ) -> Result<Result<String, String>, C::Error> {
        agent
            .call(self.canister_id, EthGetDepositAddress { subaccount })
            .await
    }
}
