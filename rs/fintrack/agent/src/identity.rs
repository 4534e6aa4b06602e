//! Choosing the identity a channel signs with, and building agents for it.

use ic_agent::identity::{AnonymousIdentity, BasicIdentity, PemError, Secp256k1Identity};
use ic_agent::{Agent, AgentError, Identity};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Source of the identity of the currently logged-in user, if any.
pub trait SessionProvider: Send + Sync {
    fn session_identity(&self) -> Option<Arc<dyn Identity>>;
}

/// A session provider for a user that never logged in.
pub struct NoSession;

impl SessionProvider for NoSession {
    fn session_identity(&self) -> Option<Arc<dyn Identity>> {
        None
    }
}

/// A session backed by a PEM-encoded key, as exported by `dfx identity export`.
pub struct PemSession {
    identity: Arc<dyn Identity>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to load identity from {path}: {source}")]
    Pem { path: String, source: PemError },
}

impl PemSession {
    /// Loads a secp256k1 key, falling back to an Ed25519 key for older `dfx` identities.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let path = path.as_ref();
        let identity: Arc<dyn Identity> = match Secp256k1Identity::from_pem_file(path) {
            Ok(identity) => Arc::new(identity),
            Err(_) => Arc::new(BasicIdentity::from_pem_file(path).map_err(|source| {
                IdentityError::Pem {
                    path: path.display().to_string(),
                    source,
                }
            })?),
        };
        Ok(Self { identity })
    }
}

impl SessionProvider for PemSession {
    fn session_identity(&self) -> Option<Arc<dyn Identity>> {
        Some(self.identity.clone())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    Explicit,
    Session,
    Anonymous,
}

#[derive(Clone)]
pub struct ResolvedIdentity {
    pub identity: Arc<dyn Identity>,
    pub source: IdentitySource,
}

impl ResolvedIdentity {
    /// Anonymous callers can query, but ledgers reject their transfers.
    pub fn is_authenticated(&self) -> bool {
        self.source != IdentitySource::Anonymous
    }
}

/// Picks the explicit identity if given, else the session's, else the anonymous identity.
pub fn resolve_identity(
    explicit: Option<Arc<dyn Identity>>,
    session: &dyn SessionProvider,
) -> ResolvedIdentity {
    if let Some(identity) = explicit {
        return ResolvedIdentity {
            identity,
            source: IdentitySource::Explicit,
        };
    }
    match session.session_identity() {
        Some(identity) => ResolvedIdentity {
            identity,
            source: IdentitySource::Session,
        },
        None => {
            warn!("no authenticated session, proceeding with the anonymous identity");
            ResolvedIdentity {
                identity: Arc::new(AnonymousIdentity),
                source: IdentitySource::Anonymous,
            }
        }
    }
}

/// Builds [`Agent`]s pointed at one IC endpoint.
#[derive(Clone, Debug)]
pub struct AgentFactory {
    url: String,
    fetch_root_key: bool,
}

impl AgentFactory {
    pub fn new(url: impl Into<String>, fetch_root_key: bool) -> Self {
        Self {
            url: url.into(),
            fetch_root_key,
        }
    }

    pub async fn build(&self, identity: &ResolvedIdentity) -> Result<Agent, AgentError> {
        let agent = Agent::builder()
            .with_url(self.url.as_str())
            .with_arc_identity(identity.identity.clone())
            .build()?;
        if self.fetch_root_key {
            debug!(url = %self.url, "fetching root key");
            agent.fetch_root_key().await?;
        }
        Ok(agent)
    }
}
