//! The 32-byte tag identifying the depositor in a helper contract `deposit` call.
//!
//! The canonical tag is `[len, principal bytes.., zero padding]` as computed by the backend.
//! When the backend is unreachable the tag falls back to a keccak256 hash of the principal
//! text. The minter does not recognize that hash, so funds deposited with a fallback tag are
//! not credited to the principal. Callers must surface [`IdentityTagSource::LocalFallback`].

use candid::Principal;
use fintrack_agent::backend::BackendCanister;
use fintrack_agent::CallCanisters;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

pub const TAG_LEN: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityTag([u8; TAG_LEN]);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IdentityTagParseError {
    #[error("identity tag must start with 0x")]
    MissingPrefix,
    #[error("identity tag must be {TAG_LEN} bytes of hex: {0}")]
    InvalidHex(String),
    #[error("principal is {0} bytes long, at most 29 fit in a tag")]
    PrincipalTooLong(usize),
}

impl IdentityTag {
    pub fn new(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// The canonical encoding: principal length, principal bytes, then zeros.
    pub fn from_principal(principal: &Principal) -> Result<Self, IdentityTagParseError> {
        let bytes = principal.as_slice();
        if bytes.len() > TAG_LEN - 3 {
            return Err(IdentityTagParseError::PrincipalTooLong(bytes.len()));
        }
        let mut tag = [0u8; TAG_LEN];
        tag[0] = bytes.len() as u8;
        tag[1..=bytes.len()].copy_from_slice(bytes);
        Ok(Self(tag))
    }

    /// keccak256 of the UTF-8 bytes of `identity`. Deterministic, but not canonical.
    pub fn local_fallback(identity: &str) -> Self {
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&Keccak256::digest(identity.as_bytes()));
        Self(tag)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

impl fmt::Display for IdentityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for IdentityTag {
    type Err = IdentityTagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or(IdentityTagParseError::MissingPrefix)?;
        let mut tag = [0u8; TAG_LEN];
        hex::decode_to_slice(digits, &mut tag)
            .map_err(|e| IdentityTagParseError::InvalidHex(e.to_string()))?;
        Ok(Self(tag))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum IdentityTagSource {
    /// Computed by the backend's `principal_to_bytes32`.
    Backend,
    /// Computed locally after the backend failed; not recognized by the minter.
    LocalFallback,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentityTag {
    pub tag: IdentityTag,
    pub source: IdentityTagSource,
}

impl ResolvedIdentityTag {
    pub fn is_degraded(&self) -> bool {
        self.source == IdentityTagSource::LocalFallback
    }
}

/// Asks the backend for the tag of `identity`, falling back to [`IdentityTag::local_fallback`]
/// on any failure.
pub async fn resolve_identity_tag<C: CallCanisters>(
    backend: &BackendCanister,
    agent: &C,
    identity: &str,
) -> ResolvedIdentityTag {
    let failure = match backend.principal_to_bytes32(agent, identity).await {
        Ok(Ok(text)) => match IdentityTag::from_str(&text) {
            Ok(tag) => {
                debug!(%identity, %tag, "backend resolved identity tag");
                return ResolvedIdentityTag {
                    tag,
                    source: IdentityTagSource::Backend,
                };
            }
            Err(err) => format!("backend returned malformed tag {text:?}: {err}"),
        },
        Ok(Err(reason)) => format!("backend rejected conversion: {reason}"),
        Err(err) => format!("backend unreachable: {err}"),
    };
    let tag = IdentityTag::local_fallback(identity);
    warn!(
        %identity,
        %tag,
        %failure,
        "using a locally hashed identity tag, the minter will not credit deposits made with it to the principal"
    );
    ResolvedIdentityTag {
        tag,
        source: IdentityTagSource::LocalFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_agent::fake::FakeCanisters;
    use proptest::prelude::*;

    const PRINCIPAL: &str = "k2t6j-2nvnp-4zjm3-25dtz-6xhaa-c7boj-5gayf-oj3xs-i43lp-teztq-6ae";

    fn backend() -> BackendCanister {
        BackendCanister::new(Principal::from_slice(&[4; 10]))
    }

    #[test]
    fn should_encode_principal_with_length_prefix() {
        let principal = Principal::from_text(PRINCIPAL).unwrap();
        let tag = IdentityTag::from_principal(&principal).unwrap();
        let bytes = tag.as_bytes();
        assert_eq!(bytes[0] as usize, principal.as_slice().len());
        assert_eq!(&bytes[1..=principal.as_slice().len()], principal.as_slice());
        assert!(bytes[principal.as_slice().len() + 1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn should_parse_what_it_displays() {
        let tag = IdentityTag::local_fallback(PRINCIPAL);
        assert_eq!(IdentityTag::from_str(&tag.to_string()), Ok(tag));
        assert_eq!(
            IdentityTag::from_str("00ff"),
            Err(IdentityTagParseError::MissingPrefix)
        );
        assert!(matches!(
            IdentityTag::from_str("0x00ff"),
            Err(IdentityTagParseError::InvalidHex(_))
        ));
    }

    #[tokio::test]
    async fn should_use_backend_tag() {
        let principal = Principal::from_text(PRINCIPAL).unwrap();
        let canonical = IdentityTag::from_principal(&principal).unwrap();
        let agent = FakeCanisters::new(principal);
        agent.reply(
            backend().canister_id,
            "principal_to_bytes32",
            Ok::<String, String>(canonical.to_string()),
        );

        let resolved = resolve_identity_tag(&backend(), &agent, PRINCIPAL).await;

        assert_eq!(resolved.tag, canonical);
        assert_eq!(resolved.source, IdentityTagSource::Backend);
        assert!(!resolved.is_degraded());
    }

    #[tokio::test]
    async fn should_flag_fallback_when_backend_is_unreachable() {
        let agent = FakeCanisters::new(Principal::anonymous());
        agent.fail(backend().canister_id, "principal_to_bytes32", "timeout");

        let resolved = resolve_identity_tag(&backend(), &agent, PRINCIPAL).await;

        assert_eq!(resolved.tag, IdentityTag::local_fallback(PRINCIPAL));
        assert!(resolved.is_degraded());
    }

    #[tokio::test]
    async fn should_flag_fallback_when_backend_rejects_or_returns_garbage() {
        let agent = FakeCanisters::new(Principal::anonymous());
        agent.reply(
            backend().canister_id,
            "principal_to_bytes32",
            Err::<String, String>("Failed to parse principal".to_string()),
        );
        agent.reply(
            backend().canister_id,
            "principal_to_bytes32",
            Ok::<String, String>("0x1234".to_string()),
        );

        let rejected = resolve_identity_tag(&backend(), &agent, "not a principal").await;
        let garbage = resolve_identity_tag(&backend(), &agent, "not a principal").await;

        assert_eq!(rejected.source, IdentityTagSource::LocalFallback);
        assert_eq!(garbage, rejected);
    }

    proptest! {
        #[test]
        fn should_compute_deterministic_fallback(identity in ".*") {
            let first = IdentityTag::local_fallback(&identity);
            let second = IdentityTag::local_fallback(&identity);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.as_bytes().len(), TAG_LEN);
        }
    }
}
