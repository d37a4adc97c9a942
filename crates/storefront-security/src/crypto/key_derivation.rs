//! Master secret to symmetric key derivation

use sha2::{Digest, Sha256};
use tracing::debug;

use super::DerivedKey;
use crate::error::{Result, SecurityError};

/// Derive the 256-bit symmetric key from the configured master secret
///
/// The key is the SHA-256 digest of the secret's UTF-8 bytes, so equal
/// secrets always yield bit-identical keys. Callers recompute it per
/// operation; nothing is cached.
///
/// # Errors
/// `ConfigurationError` if the secret is empty.
pub fn derive_key(master_secret: &str) -> Result<DerivedKey> {
    if master_secret.is_empty() {
        return Err(SecurityError::ConfigurationError(
            "master secret is empty".to_string(),
        ));
    }

    let digest = Sha256::digest(master_secret.as_bytes());

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&digest);

    debug!("Derived symmetric key from master secret");
    Ok(DerivedKey::new(key_bytes))
}
