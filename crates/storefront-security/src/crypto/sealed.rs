//! AES-256-GCM authenticated field encryption
//!
//! Opt-in alternative to the CBC [`Cipher`](super::Cipher) for fields where
//! tampering must be detected. Uses the same key derivation.
//!
//! Text format: `{iv_hex}:{auth_tag_hex}:{ciphertext_hex}`
//! - IV: 12 bytes (96 bits) - standard for GCM
//! - Auth tag: 16 bytes (128 bits)

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::derive_key;
use crate::config::SecurityConfig;
use crate::error::{Result, SecurityError};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Hex-encoded GCM output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedPayload {
    pub ciphertext: String,
    pub iv: String,
    pub auth_tag: String,
}

impl std::fmt::Display for SealedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.iv, self.auth_tag, self.ciphertext)
    }
}

impl FromStr for SealedPayload {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(iv), Some(auth_tag), Some(ciphertext), None) => Ok(Self {
                ciphertext: ciphertext.to_string(),
                iv: iv.to_string(),
                auth_tag: auth_tag.to_string(),
            }),
            _ => Err(SecurityError::DecryptionError),
        }
    }
}

/// Authenticated field cipher keyed from the configured master secret
#[derive(Debug, Clone, Copy)]
pub struct SealedCipher<'a> {
    config: &'a SecurityConfig,
}

impl<'a> SealedCipher<'a> {
    pub fn new(config: &'a SecurityConfig) -> Self {
        Self { config }
    }

    fn aead(&self) -> Result<Aes256Gcm> {
        let key = derive_key(self.config.master_secret()?.expose())?;
        Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| SecurityError::EncryptionError(e.to_string()))
    }

    /// Encrypt and authenticate a UTF-8 string
    pub fn seal(&self, plaintext: &str) -> Result<SealedPayload> {
        let aead = self.aead()?;

        let mut iv = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        // aes-gcm appends the tag to the ciphertext
        let mut ciphertext = aead
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| SecurityError::EncryptionError(e.to_string()))?;

        let tag_start = ciphertext
            .len()
            .checked_sub(TAG_LEN)
            .ok_or_else(|| SecurityError::EncryptionError("Ciphertext too short".to_string()))?;
        let auth_tag = ciphertext.split_off(tag_start);

        Ok(SealedPayload {
            ciphertext: hex::encode(ciphertext),
            iv: hex::encode(iv),
            auth_tag: hex::encode(auth_tag),
        })
    }

    /// Verify and decrypt; any modification of the payload is a `DecryptionError`
    pub fn open(&self, payload: &SealedPayload) -> Result<String> {
        let aead = self.aead()?;

        let iv = hex::decode(&payload.iv).map_err(|_| SecurityError::DecryptionError)?;
        let auth_tag = hex::decode(&payload.auth_tag).map_err(|_| SecurityError::DecryptionError)?;
        let mut ciphertext =
            hex::decode(&payload.ciphertext).map_err(|_| SecurityError::DecryptionError)?;

        if iv.len() != NONCE_LEN || auth_tag.len() != TAG_LEN {
            return Err(SecurityError::DecryptionError);
        }

        ciphertext.extend_from_slice(&auth_tag);
        let plaintext = aead
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| SecurityError::DecryptionError)?;

        String::from_utf8(plaintext).map_err(|_| SecurityError::DecryptionError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentMode;

    fn test_config() -> SecurityConfig {
        SecurityConfig::new(DeploymentMode::Development).with_master_secret("test-master-secret")
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let config = test_config();
        let cipher = SealedCipher::new(&config);

        let sealed = cipher.seal("sk-live-abc123").unwrap();
        assert_eq!(cipher.open(&sealed).unwrap(), "sk-live-abc123");
    }

    #[test]
    fn test_text_format_roundtrip() {
        let config = test_config();
        let cipher = SealedCipher::new(&config);

        let sealed = cipher.seal("gift card 0042").unwrap();
        let parsed: SealedPayload = sealed.to_string().parse().unwrap();

        assert_eq!(parsed, sealed);
        assert_eq!(cipher.open(&parsed).unwrap(), "gift card 0042");
    }

    #[test]
    fn test_tampering_always_rejected() {
        let config = test_config();
        let cipher = SealedCipher::new(&config);
        let sealed = cipher.seal("secret data").unwrap();

        let mut ciphertext = hex::decode(&sealed.ciphertext).unwrap();
        ciphertext[0] ^= 0x01;
        let tampered = SealedPayload {
            ciphertext: hex::encode(ciphertext),
            ..sealed.clone()
        };
        assert!(matches!(
            cipher.open(&tampered),
            Err(SecurityError::DecryptionError)
        ));

        let mut auth_tag = hex::decode(&sealed.auth_tag).unwrap();
        auth_tag[0] ^= 0xFF;
        let tampered = SealedPayload {
            auth_tag: hex::encode(auth_tag),
            ..sealed
        };
        assert!(matches!(
            cipher.open(&tampered),
            Err(SecurityError::DecryptionError)
        ));
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let config = SecurityConfig::new(DeploymentMode::Development);
        let cipher = SealedCipher::new(&config);

        assert!(matches!(
            cipher.seal("secret"),
            Err(SecurityError::ConfigurationError(_))
        ));
        let garbage: SealedPayload = "zz:zz:zz".parse().unwrap();
        assert!(matches!(
            cipher.open(&garbage),
            Err(SecurityError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let config = test_config();
        let other = SecurityConfig::new(DeploymentMode::Development).with_master_secret("other");

        let sealed = SealedCipher::new(&config).seal("secret").unwrap();
        assert!(SealedCipher::new(&other).open(&sealed).is_err());
    }

    #[test]
    fn test_invalid_format_parsing() {
        assert!("invalid".parse::<SealedPayload>().is_err());
        assert!("a:b".parse::<SealedPayload>().is_err());
        assert!("a:b:c:d".parse::<SealedPayload>().is_err());

        let config = test_config();
        let garbage: SealedPayload = "not_hex:not_hex:not_hex".parse().unwrap();
        assert!(SealedCipher::new(&config).open(&garbage).is_err());
    }
}
