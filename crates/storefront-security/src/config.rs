//! Process configuration for the security primitives
//!
//! Built exactly once at startup, from environment variables or a JSON file,
//! and then passed by reference into [`Cipher`](crate::Cipher) and
//! [`SessionPolicyFactory`](crate::SessionPolicyFactory). Nothing in this
//! crate reads the environment after that point.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::crypto::MasterSecret;
use crate::duration::parse_duration;
use crate::error::{Result, SecurityError};

/// Session duration used when none is configured
pub const DEFAULT_SESSION_DURATION: &str = "4h";

pub const ENV_ENCRYPTION_KEY: &str = "STOREFRONT_ENCRYPTION_KEY";
pub const ENV_SESSION_SECRET: &str = "STOREFRONT_SESSION_SECRET";
pub const ENV_SESSION_DURATION: &str = "STOREFRONT_SESSION_DURATION";
pub const ENV_ENVIRONMENT: &str = "STOREFRONT_ENV";

/// Deployment mode driving the cookie `Secure` and `SameSite` attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Production,
    #[default]
    Development,
}

impl FromStr for DeploymentMode {
    type Err = std::convert::Infallible;

    /// `production` (any case) selects production; anything else does not
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("production") {
            Ok(Self::Production)
        } else {
            Ok(Self::Development)
        }
    }
}

/// Non-production mode names accepted without a warning
const KNOWN_NON_PRODUCTION_MODES: &[&str] = &["development", "dev", "test", "staging", "local"];

impl DeploymentMode {
    /// Whether `value` names a mode this crate knows about
    pub fn is_recognised(value: &str) -> bool {
        let value = value.trim();
        value.eq_ignore_ascii_case("production")
            || KNOWN_NON_PRODUCTION_MODES
                .iter()
                .any(|known| value.eq_ignore_ascii_case(known))
    }
}

/// Parse a configured mode, warning when it looks like a typo
fn resolve_mode(value: &str) -> DeploymentMode {
    if !value.trim().is_empty() && !DeploymentMode::is_recognised(value) {
        warn!(
            value,
            "Unrecognised deployment mode; falling back to development cookies"
        );
    }
    value.parse().unwrap_or_default()
}

/// On-disk configuration format
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigFile {
    encryption_key: Option<String>,
    session_secret: Option<String>,
    session_duration: Option<String>,
    environment: Option<String>,
}

/// Read-only security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    master_secret: Option<MasterSecret>,
    session_secret: Option<MasterSecret>,
    session_duration: String,
    mode: DeploymentMode,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::new(DeploymentMode::default())
    }
}

impl SecurityConfig {
    /// Configuration with no secrets and the default session duration
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            master_secret: None,
            session_secret: None,
            session_duration: DEFAULT_SESSION_DURATION.to_string(),
            mode,
        }
    }

    pub fn with_master_secret(mut self, secret: impl Into<String>) -> Self {
        self.master_secret = Some(MasterSecret::new(secret));
        self
    }

    pub fn with_session_secret(mut self, secret: impl Into<String>) -> Self {
        self.session_secret = Some(MasterSecret::new(secret));
        self
    }

    pub fn with_session_duration(mut self, duration: impl Into<String>) -> Self {
        self.session_duration = duration.into();
        self
    }

    /// Load from the `STOREFRONT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup (used by `from_env` and tests)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let mode = non_empty(ENV_ENVIRONMENT)
            .map(|v| resolve_mode(&v))
            .unwrap_or_default();

        let config = Self {
            master_secret: non_empty(ENV_ENCRYPTION_KEY).map(MasterSecret::new),
            session_secret: non_empty(ENV_SESSION_SECRET).map(MasterSecret::new),
            session_duration: non_empty(ENV_SESSION_DURATION)
                .unwrap_or_else(|| DEFAULT_SESSION_DURATION.to_string()),
            mode,
        };

        debug!(mode = ?config.mode, "Loaded security configuration from environment");
        config
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&contents)?;

        let mode = file
            .environment
            .as_deref()
            .map(resolve_mode)
            .unwrap_or_default();

        let config = Self {
            master_secret: file
                .encryption_key
                .filter(|v| !v.is_empty())
                .map(MasterSecret::new),
            session_secret: file
                .session_secret
                .filter(|v| !v.is_empty())
                .map(MasterSecret::new),
            session_duration: file
                .session_duration
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_DURATION.to_string()),
            mode,
        };

        debug!(mode = ?config.mode, "Loaded security configuration from {:?}", path);
        Ok(config)
    }

    /// Startup checks; any error here means the process must not serve
    /// encryption- or session-dependent traffic
    pub fn validate(&self) -> Result<()> {
        self.master_secret()?;
        self.session_duration_ms()?;

        if self.is_production() && self.session_secret.is_none() {
            return Err(SecurityError::ConfigurationError(format!(
                "{} must be set in production",
                ENV_SESSION_SECRET
            )));
        }

        Ok(())
    }

    /// The master secret, or `ConfigurationError` when absent or empty
    pub fn master_secret(&self) -> Result<&MasterSecret> {
        match &self.master_secret {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(SecurityError::ConfigurationError(format!(
                "{} is not configured",
                ENV_ENCRYPTION_KEY
            ))),
        }
    }

    pub fn session_secret(&self) -> Option<&MasterSecret> {
        self.session_secret.as_ref()
    }

    pub fn session_duration(&self) -> &str {
        &self.session_duration
    }

    /// Configured session duration resolved to milliseconds
    pub fn session_duration_ms(&self) -> Result<u64> {
        parse_duration(&self.session_duration)
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn is_production(&self) -> bool {
        self.mode == DeploymentMode::Production
    }
}
