use crate::{CallCanisters, Request};
use candid::Principal;
use ic_agent::{Agent, AgentError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AgentCallError {
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),
    #[error("canister request could not be encoded: {0}")]
    CandidEncode(candid::Error),
    #[error("canister did not respond with the expected response type: {0}")]
    CandidDecode(candid::Error),
    #[error("agent identity has no principal: {0}")]
    Identity(String),
}

impl CallCanisters for Agent {
    type Error = AgentCallError;

    async fn call<R: Request>(
        &self,
        canister_id: impl Into<Principal> + Send,
        request: R,
    ) -> Result<R::Response, Self::Error> {
        let canister_id = canister_id.into();
        let payload = request.payload().map_err(AgentCallError::CandidEncode)?;
        debug!(
            canister_id = %canister_id,
            method = request.method(),
            update = request.update(),
            "calling canister"
        );

        let response = if request.update() {
            self.update(&canister_id, request.method())
                .with_arg(payload)
                .call_and_wait()
                .await?
        } else {
            self.query(&canister_id, request.method())
                .with_arg(payload)
                .call()
                .await?
        };

        candid::decode_one(response.as_slice()).map_err(AgentCallError::CandidDecode)
    }

    fn caller(&self) -> Result<Principal, Self::Error> {
        self.get_principal().map_err(AgentCallError::Identity)
    }
}
