//! Error types for storefront-security

use thiserror::Error;

/// Result type alias for security operations
pub type Result<T> = std::result::Result<T, SecurityError>;

/// Security error types
#[derive(Error, Debug)]
pub enum SecurityError {
    /// Missing secret, bad duration, unreadable config. Fatal at startup.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    /// Deliberately carries no detail: callers must not learn whether the
    /// ciphertext, the IV or the key was at fault.
    #[error("Decryption failed")]
    DecryptionError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SecurityError {
    /// Whether the process should refuse to serve until the operator
    /// corrects the configuration
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SecurityError::ConfigurationError(_)
                | SecurityError::IoError(_)
                | SecurityError::SerializationError(_)
        )
    }
}
