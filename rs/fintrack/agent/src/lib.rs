//! Clients for the canisters FinTrack talks to.
//!
//! Every client is a thin value holding a canister id. The channel is passed explicitly to each
//! call as any type implementing [`CallCanisters`], so the same client code runs against a real
//! [`ic_agent::Agent`] or an in-memory fake.

use candid::{CandidType, Principal};
use serde::de::DeserializeOwned;
use std::future::Future;

mod agent_impl;
pub mod backend;
pub mod identity;
pub mod ledger;
pub mod minter;
pub mod null_request;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use agent_impl::AgentCallError;

/// A candid request to a canister method.
pub trait Request: Send {
    fn method(&self) -> &'static str;
    fn update(&self) -> bool;
    fn payload(&self) -> Result<Vec<u8>, candid::Error>;

    type Response: CandidType + DeserializeOwned + Send;
}

/// A channel able to deliver [`Request`]s on behalf of a fixed caller.
pub trait CallCanisters: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn call<R: Request>(
        &self,
        canister_id: impl Into<Principal> + Send,
        request: R,
    ) -> impl Future<Output = Result<R::Response, Self::Error>> + Send;

    /// The principal the channel signs requests as.
    fn caller(&self) -> Result<Principal, Self::Error>;
}
