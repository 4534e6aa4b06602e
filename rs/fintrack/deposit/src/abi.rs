use crate::identity_tag::IdentityTag;
use sha3::{Digest, Keccak256};

/// Signature of the ckETH helper contract entry point.
pub const DEPOSIT_SIGNATURE: &str = "deposit(bytes32)";

/// First four bytes of the keccak256 hash of a Solidity function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI-encoded call of `deposit(bytes32)` with `tag` as its only argument.
pub fn deposit_call_data(tag: &IdentityTag) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&selector(DEPOSIT_SIGNATURE));
    data.extend_from_slice(tag.as_bytes());
    data
}

/// Checks that `address` is a `0x`-prefixed 20-byte hex string. The checksum casing is not
/// verified.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(digits) => digits.len() == 40 && digits.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
