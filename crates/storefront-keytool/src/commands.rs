//! Keytool subcommands
//!
//! Each command runs against a [`SecurityConfig`] loaded once by the binary
//! and writes its result to `out`; diagnostics go through `tracing`.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::io::Write;
use tracing::info;

use storefront_security::{
    hash, mask_string, Cipher, SealedCipher, SealedPayload, SecurityConfig, SessionPolicyFactory,
};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate configuration; fails when the service must not start
    Check,

    /// Encrypt a value and print the payload as JSON
    Encrypt {
        plaintext: String,

        /// Use authenticated AES-256-GCM instead of AES-256-CBC
        #[arg(long)]
        sealed: bool,
    },

    /// Decrypt a stored (ciphertext, iv) pair
    Decrypt {
        #[arg(long)]
        ciphertext: String,

        #[arg(long)]
        iv: String,
    },

    /// Open an authenticated payload in `iv:tag:ciphertext` form
    Open { payload: String },

    /// Print the SHA-256 fingerprint of a value
    Hash { value: String },

    /// Print a value masked for display
    Mask {
        value: String,

        #[arg(long, default_value_t = storefront_security::mask::DEFAULT_VISIBLE_START)]
        start: usize,

        #[arg(long, default_value_t = storefront_security::mask::DEFAULT_VISIBLE_END)]
        end: usize,
    },

    /// Print the derived session policy as JSON (secret omitted)
    Policy,
}

/// Execute `command`, writing its output to `out`
pub fn run<W: Write>(command: &Command, config: &SecurityConfig, out: &mut W) -> Result<()> {
    match command {
        Command::Check => {
            config.validate().context("configuration is not usable")?;
            let policy = SessionPolicyFactory::new(config).session_options()?;
            info!(
                mode = ?config.mode(),
                placeholder_secret = policy.placeholder_secret,
                "Configuration OK"
            );
            writeln!(out, "ok")?;
        }
        Command::Encrypt { plaintext, sealed } => {
            let json = if *sealed {
                serde_json::to_string_pretty(&SealedCipher::new(config).seal(plaintext)?)?
            } else {
                serde_json::to_string_pretty(&Cipher::new(config).encrypt(plaintext)?)?
            };
            writeln!(out, "{}", json)?;
        }
        Command::Decrypt { ciphertext, iv } => {
            let plaintext = Cipher::new(config).decrypt(ciphertext, iv)?;
            writeln!(out, "{}", plaintext)?;
        }
        Command::Open { payload } => {
            let payload: SealedPayload = payload.parse()?;
            let plaintext = SealedCipher::new(config).open(&payload)?;
            writeln!(out, "{}", plaintext)?;
        }
        Command::Hash { value } => {
            writeln!(out, "{}", hash(value))?;
        }
        Command::Mask { value, start, end } => {
            writeln!(out, "{}", mask_string(value, *start, *end))?;
        }
        Command::Policy => {
            let policy = SessionPolicyFactory::new(config).session_options()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&policy)?)?;
        }
    }
    Ok(())
}
