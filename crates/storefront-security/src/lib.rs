//! # storefront-security
//!
//! Security primitives for the storefront's record and session layers:
//! - AES-256-CBC field encryption keyed from a configured master secret
//! - Opt-in AES-256-GCM authenticated encryption
//! - SHA-256 fingerprints for token comparison
//! - Cosmetic display masking
//! - Session cookie policy derived from deployment mode
//!
//! Everything hangs off a [`SecurityConfig`] built once at startup.

pub mod config;
pub mod crypto;
pub mod duration;
pub mod error;
pub mod mask;
pub mod session;

pub use config::{DeploymentMode, SecurityConfig, DEFAULT_SESSION_DURATION};
pub use crypto::{
    derive_key, hash, verify_hash, Cipher, DerivedKey, EncryptedPayload, MasterSecret,
    SealedCipher, SealedPayload,
};
pub use duration::parse_duration;
pub use error::{Result, SecurityError};
pub use mask::{mask, mask_string, mask_value};
pub use session::{
    invalidate_session, CookiePolicy, SameSite, SessionHandle, SessionPolicy,
    SessionPolicyFactory, SESSION_COOKIE_NAME,
};
