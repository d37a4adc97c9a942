//! Cryptographic primitives for sensitive record fields
//!
//! This module provides:
//! - SHA-256 key derivation from the configured master secret
//! - Unsalted SHA-256 fingerprints
//! - AES-256-CBC field encryption with a fresh IV per call
//! - AES-256-GCM authenticated encryption (opt-in)
//! - Secret wrappers with zeroize

mod encryption;
mod hashing;
mod key_derivation;
mod sealed;
mod secure_memory;

pub use encryption::{Cipher, EncryptedPayload, IV_LEN};
pub use hashing::{hash, verify_hash};
pub use key_derivation::derive_key;
pub use sealed::{SealedCipher, SealedPayload};
pub use secure_memory::{DerivedKey, MasterSecret};
