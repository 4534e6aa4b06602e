//! An in-memory [`CallCanisters`] that replays queued candid replies and records every call.

use crate::{CallCanisters, Request};
use candid::{CandidType, Principal};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub canister_id: Principal,
    pub method: &'static str,
    pub update: bool,
    pub payload: Vec<u8>,
}

impl RecordedCall {
    pub fn decode_arg<T: CandidType + for<'de> serde::Deserialize<'de>>(&self) -> T {
        candid::decode_one(&self.payload).expect("failed to decode recorded payload")
    }
}

#[derive(Debug, Error)]
pub enum FakeCallError {
    #[error("no reply queued for {method} on {canister_id}")]
    NoReply {
        canister_id: Principal,
        method: String,
    },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("candid error: {0}")]
    Candid(candid::Error),
}

type Reply = Result<Vec<u8>, String>;

pub struct FakeCanisters {
    caller: Principal,
    replies: Mutex<BTreeMap<(Principal, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeCanisters {
    pub fn new(caller: Principal) -> Self {
        Self {
            caller,
            replies: Mutex::default(),
            calls: Mutex::default(),
        }
    }

    /// Queues `response` as the next reply of `method` on `canister_id`.
    pub fn reply<T: CandidType>(&self, canister_id: Principal, method: &str, response: T) {
        let bytes = candid::encode_one(response).expect("failed to encode reply");
        self.push(canister_id, method, Ok(bytes));
    }

    /// Queues a transport failure as the next reply of `method` on `canister_id`.
    pub fn fail(&self, canister_id: Principal, method: &str, message: &str) {
        self.push(canister_id, method, Err(message.to_string()));
    }

    fn push(&self, canister_id: Principal, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((canister_id, method.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }
}

impl CallCanisters for FakeCanisters {
    type Error = FakeCallError;

    async fn call<R: Request>(
        &self,
        canister_id: impl Into<Principal> + Send,
        request: R,
    ) -> Result<R::Response, Self::Error> {
        let canister_id = canister_id.into();
        let payload = request.payload().map_err(FakeCallError::Candid)?;
        self.calls.lock().unwrap().push(RecordedCall {
            canister_id,
            method: request.method(),
            update: request.update(),
            payload,
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(canister_id, request.method().to_string()))
            .and_then(VecDeque::pop_front);
        match reply {
            None => Err(FakeCallError::NoReply {
                canister_id,
                method: request.method().to_string(),
            }),
            Some(Err(message)) => Err(FakeCallError::Transport(message)),
            Some(Ok(bytes)) => candid::decode_one(&bytes).map_err(FakeCallError::Candid),
        }
    }

    fn caller(&self) -> Result<Principal, Self::Error> {
        Ok(self.caller)
    }
}
