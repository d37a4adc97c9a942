//! Unsalted SHA-256 fingerprints
//!
//! Meant for equality checks against a stored digest (password reset
//! tokens, verification codes). Not suitable for password storage.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-256 digest of the UTF-8 bytes of `value`
pub fn hash(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Check `value` against a stored hex digest without early exit on mismatch
///
/// A malformed stored digest never matches.
pub fn verify_hash(value: &str, expected_digest: &str) -> bool {
    let Ok(expected) = hex::decode(expected_digest) else {
        return false;
    };
    let actual = Sha256::digest(value.as_bytes());
    if actual.len() != expected.len() {
        return false;
    }
    actual.as_slice().ct_eq(&expected).into()
}
