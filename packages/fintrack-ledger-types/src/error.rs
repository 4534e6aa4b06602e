use serde::{Deserialize, Serialize};

/// Coarse classification of every failure surfaced to callers.
///
/// Each public error type in the FinTrack crates maps onto exactly one kind, so a UI can
/// branch on the kind while still showing the error's `Display` text to the user.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad user input, rejected before any call was made.
    Validation,
    /// No wallet or signing capability is installed.
    ProviderUnavailable,
    /// The transport to a canister or an Ethereum node failed.
    Network,
    /// A ledger or minter rejected the request with a structured reason.
    Ledger,
    /// The backend could not be reached or refused to answer.
    BackendUnavailable,
    /// The user declined to sign in their wallet.
    UserRejected,
}

#[cfg(test)]
mod tests {
    use super::ErrorKind;
    use strum::IntoEnumIterator;

    #[test]
    fn should_render_kinds_in_snake_case() {
        let rendered: Vec<String> = ErrorKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "validation",
                "provider_unavailable",
                "network",
                "ledger",
                "backend_unavailable",
                "user_rejected"
            ]
        );
    }
}
