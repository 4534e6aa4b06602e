/// A complete configuration with comments on every field, printed by the `sample-config`
/// command.
///
/// Every value here equals the built-in default, so the tests below break when a field is
/// added, removed or changes its default without this text being updated.
///
/// Options with fixed alternatives list each one in an `EXAMPLE:` comment directly above the
/// value line; every alternative must parse in place of that line.
pub const SAMPLE_CONFIG: &str = r#"
{
  // ============================================
  // Internet Computer connection
  // ============================================
  ic: {
    // Boundary node or local replica that receives the calls.
    url: "https://icp-api.io",

    // Fetch the root key from the replica before the first call. Only for local replicas.
    fetch_root_key: false,

    // PEM file (secp256k1 or Ed25519) of the identity to act as.
    // Without one, calls are anonymous and only queries are useful.
    // EXAMPLE: identity_pem: "/home/user/.config/dfx/identity/default/identity.pem",
    identity_pem: null,
  },

  // ============================================
  // Canister ids
  // ============================================
  canisters: {
    ckbtc_ledger: "mc6ru-gyaaa-aaaar-qaaaq-cai",
    ckbtc_minter: "ml52i-qqaaa-aaaar-qaaba-cai",
    cketh_ledger: "apia6-jaaaa-aaaar-qabma-cai",
    cketh_minter: "jzenf-aiaaa-aaaar-qaa7q-cai",

    // Application backend that derives deposit identity tags and addresses.
    // Without one, identity tags are derived locally.
    // EXAMPLE: backend: "rrkah-fqaaa-aaaaa-aaaaq-cai",
    backend: null,
  },

  // ============================================
  // Ethereum deposits
  // ============================================
  ethereum: {
    // JSON-RPC endpoint of the wallet that signs and sends deposit transactions.
    // EXAMPLE: wallet_url: "http://127.0.0.1:8545/",
    wallet_url: null,

    // Gas limit attached to every deposit transaction.
    gas_limit: 100000,

    // How long to wait for a deposit receipt before giving up.
    receipt_timeout_secs: 300,

    // Delay between two receipt lookups. Values below 100 are raised to 100.
    receipt_poll_interval_millis: 2000,
  },

  // ============================================
  // Logging
  // ============================================
  logger: {
    // Overridden by the RUST_LOG environment variable when it is set.
    // EXAMPLE: level: "error",
    // EXAMPLE: level: "warn",
    // EXAMPLE: level: "debug",
    // EXAMPLE: level: "trace",
    level: "info",

    // EXAMPLE: format: "json",
    format: "text_full",
  },
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn sample_config_is_deserializable() {
        let _ =
            json5::from_str::<Config>(SAMPLE_CONFIG).expect("sample config cannot be deserialized");
    }

    #[test]
    fn sample_config_matches_defaults() {
        let config = json5::from_str::<Config>(SAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn check_all_alternatives_parse() {
        const EXAMPLE_MARKER: &str = "EXAMPLE:";

        let lines: Vec<&str> = SAMPLE_CONFIG.lines().collect();
        let mut alternatives: Vec<&str> = Vec::new();
        let mut checked = 0;

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                if let Some(pos) = line.find(EXAMPLE_MARKER) {
                    alternatives.push(line[pos + EXAMPLE_MARKER.len()..].trim());
                }
                continue;
            }
            for alternative in alternatives.drain(..) {
                let mut variant = lines.clone();
                variant[i] = alternative;
                let full_config = variant.join("\n");
                if let Err(err) = json5::from_str::<Config>(&full_config) {
                    panic!("Failed to parse config variant {full_config}: {err}");
                }
                checked += 1;
            }
        }

        assert_eq!(checked, 8);
    }
}
