use crate::Request;
use candid::CandidType;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// A request to a method that takes no argument.
pub struct NullRequest<T> {
    method: &'static str,
    update: bool,
    _response: PhantomData<fn() -> T>,
}

impl<T> NullRequest<T> {
    pub fn new(method: &'static str, update: bool) -> Self {
        Self {
            method,
            update,
            _response: PhantomData,
        }
    }
}

impl<T: CandidType + DeserializeOwned + Send> Request for NullRequest<T> {
    fn method(&self) -> &'static str {
        self.method
    }

    fn update(&self) -> bool {
        self.update
    }

    fn payload(&self) -> Result<Vec<u8>, candid::Error> {
        candid::encode_args(())
    }

    type Response = T;
}
