//! AES-256-CBC field encryption
//!
//! Each call to [`Cipher::encrypt`] draws a fresh 16-byte IV, so identical
//! plaintexts never produce identical payloads. The stored form is the hex
//! pair `(ciphertext, iv)`; both halves are needed to decrypt.
//!
//! CBC carries no integrity tag. A corrupted ciphertext is not guaranteed to
//! be rejected and may decrypt to garbage. Use [`SealedCipher`] where
//! tampering must be detected.
//!
//! [`SealedCipher`]: super::SealedCipher

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::derive_key;
use crate::config::SecurityConfig;
use crate::error::{Result, SecurityError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// IV length in bytes (one AES block)
pub const IV_LEN: usize = 16;

/// Ciphertext and IV as persisted by record collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Hex-encoded ciphertext
    pub ciphertext: String,
    /// Hex-encoded 16-byte IV
    pub iv: String,
}

/// Field cipher keyed from the configured master secret
#[derive(Debug, Clone, Copy)]
pub struct Cipher<'a> {
    config: &'a SecurityConfig,
}

impl<'a> Cipher<'a> {
    pub fn new(config: &'a SecurityConfig) -> Self {
        Self { config }
    }

    /// Encrypt a UTF-8 string under a fresh random IV
    ///
    /// # Errors
    /// `ConfigurationError` when no master secret is configured. There is no
    /// fallback key.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedPayload> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let key = derive_key(self.config.master_secret()?.expose())?;

        let ciphertext = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|e| SecurityError::EncryptionError(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        Ok(EncryptedPayload {
            ciphertext: hex::encode(ciphertext),
            iv: hex::encode(iv),
        })
    }

    /// Decrypt a hex ciphertext with its hex IV
    ///
    /// # Errors
    /// `ConfigurationError` when no master secret is configured;
    /// `DecryptionError` for malformed hex, an IV that is not 16 bytes, bad
    /// padding or non-UTF-8 output.
    pub fn decrypt(&self, ciphertext: &str, iv: &str) -> Result<String> {
        // A missing secret is fatal, never a per-record failure
        let key = derive_key(self.config.master_secret()?.expose())?;

        let ciphertext = hex::decode(ciphertext).map_err(|_| SecurityError::DecryptionError)?;
        let iv: [u8; IV_LEN] = hex::decode(iv)
            .map_err(|_| SecurityError::DecryptionError)?
            .try_into()
            .map_err(|_| SecurityError::DecryptionError)?;

        let plaintext = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
            .map_err(|_| SecurityError::DecryptionError)?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| SecurityError::DecryptionError)?;

        String::from_utf8(plaintext).map_err(|_| SecurityError::DecryptionError)
    }

    /// Decrypt a persisted payload
    pub fn decrypt_payload(&self, payload: &EncryptedPayload) -> Result<String> {
        self.decrypt(&payload.ciphertext, &payload.iv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentMode;
    use proptest::prelude::*;

    fn test_config() -> SecurityConfig {
        SecurityConfig::new(DeploymentMode::Development).with_master_secret("test-master-secret")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let config = test_config();
        let cipher = Cipher::new(&config);
        let plaintext = "4111 1111 1111 1111";

        let payload = cipher.encrypt(plaintext).unwrap();
        let decrypted = cipher.decrypt(&payload.ciphertext, &payload.iv).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_payload_shape() {
        let config = test_config();
        let payload = Cipher::new(&config).encrypt("hello").unwrap();

        assert_eq!(payload.iv.len(), IV_LEN * 2);
        // One padded block
        assert_eq!(payload.ciphertext.len(), 32);
        assert!(payload.ciphertext.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_empty_and_multibyte_roundtrip() {
        let config = test_config();
        let cipher = Cipher::new(&config);

        for plaintext in ["", "naïve café ☕", "日本語のテキスト"] {
            let payload = cipher.encrypt(plaintext).unwrap();
            assert_eq!(cipher.decrypt_payload(&payload).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_different_ivs_produce_different_ciphertext() {
        let config = test_config();
        let cipher = Cipher::new(&config);
        let plaintext = "same plaintext";

        let first = cipher.encrypt(plaintext).unwrap();
        let second = cipher.encrypt(plaintext).unwrap();

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_eq!(cipher.decrypt_payload(&first).unwrap(), plaintext);
        assert_eq!(cipher.decrypt_payload(&second).unwrap(), plaintext);
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let config = SecurityConfig::new(DeploymentMode::Development);
        let cipher = Cipher::new(&config);

        assert!(matches!(
            cipher.encrypt("secret"),
            Err(SecurityError::ConfigurationError(_))
        ));
        assert!(matches!(
            cipher.decrypt("00", &"00".repeat(IV_LEN)),
            Err(SecurityError::ConfigurationError(_))
        ));

        // Malformed input must not mask the missing secret
        for (ciphertext, iv) in [("zz", "00"), ("", ""), ("00", "not hex")] {
            assert!(matches!(
                cipher.decrypt(ciphertext, iv),
                Err(SecurityError::ConfigurationError(_))
            ));
        }
    }

    #[test]
    fn test_wrong_key_does_not_return_plaintext() {
        let config = test_config();
        let other = SecurityConfig::new(DeploymentMode::Development).with_master_secret("other");
        let plaintext = "secret data";

        let payload = Cipher::new(&config).encrypt(plaintext).unwrap();
        match Cipher::new(&other).decrypt_payload(&payload) {
            Ok(decrypted) => assert_ne!(decrypted, plaintext),
            Err(e) => assert!(matches!(e, SecurityError::DecryptionError)),
        }
    }

    #[test]
    fn test_tampered_ciphertext_never_returns_original() {
        let config = test_config();
        let cipher = Cipher::new(&config);
        let plaintext = "a secret spanning more than a single AES block";

        let payload = cipher.encrypt(plaintext).unwrap();
        let bytes = hex::decode(&payload.ciphertext).unwrap();

        for bit in [0usize, 7, 64, bytes.len() * 8 - 1] {
            let mut tampered = bytes.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);

            match cipher.decrypt(&hex::encode(&tampered), &payload.iv) {
                Ok(decrypted) => assert_ne!(decrypted, plaintext),
                Err(e) => assert!(matches!(e, SecurityError::DecryptionError)),
            }
        }
    }

    #[test]
    fn test_malformed_input_is_decryption_error() {
        let config = test_config();
        let cipher = Cipher::new(&config);
        let payload = cipher.encrypt("value").unwrap();

        let cases = [
            ("not hex".to_string(), payload.iv.clone()),
            (payload.ciphertext.clone(), "zz".repeat(IV_LEN)),
            // IV of the wrong length
            (payload.ciphertext.clone(), "00".repeat(8)),
            // Not a whole number of blocks
            (payload.ciphertext[..30].to_string(), payload.iv.clone()),
            (String::new(), payload.iv.clone()),
        ];

        for (ciphertext, iv) in cases {
            assert!(matches!(
                cipher.decrypt(&ciphertext, &iv),
                Err(SecurityError::DecryptionError)
            ));
        }
    }

    #[test]
    fn test_payload_serialization() {
        let payload = EncryptedPayload {
            ciphertext: "abcd".to_string(),
            iv: "0011".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"ciphertext":"abcd","iv":"0011"}"#);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn proptest_round_trip(plaintext in ".{0,2000}") {
            let config = test_config();
            let cipher = Cipher::new(&config);
            let payload = cipher.encrypt(&plaintext).unwrap();
            prop_assert_eq!(cipher.decrypt_payload(&payload).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_concurrent_use() {
        let config = test_config();
        let cipher = Cipher::new(&config);

        let ivs: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    scope.spawn(move || {
                        let plaintext = format!("customer-{}", i);
                        let payload = cipher.encrypt(&plaintext).unwrap();
                        assert_eq!(cipher.decrypt_payload(&payload).unwrap(), plaintext);
                        payload.iv
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let unique: std::collections::HashSet<_> = ivs.iter().collect();
        assert_eq!(unique.len(), ivs.len());
    }

    #[test]
    fn test_roundtrip_large_plaintext() {
        let config = test_config();
        let cipher = Cipher::new(&config);
        let plaintext = "é".repeat(5_000);

        let payload = cipher.encrypt(&plaintext).unwrap();
        assert_eq!(cipher.decrypt_payload(&payload).unwrap(), plaintext);
    }
}
