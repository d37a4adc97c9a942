//! Session and cookie policy for the request-handling layer
//!
//! The policy is derived from [`SecurityConfig`] on demand and never mutated.
//! Production deployments get `Secure` + `SameSite=Strict` cookies;
//! everything else gets `SameSite=Lax` without `Secure` so local HTTP works.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Once;
use tracing::{debug, warn};

use crate::config::SecurityConfig;
use crate::crypto::MasterSecret;
use crate::error::{Result, SecurityError};

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "storefront-session";

/// Substituted outside production when no session secret is configured.
/// Publicly known, so it never signs anything in production.
pub const PLACEHOLDER_SESSION_SECRET: &str = "storefront-insecure-development-secret";

static PLACEHOLDER_WARNING: Once = Once::new();

/// Cookie `SameSite` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
        }
    }
}

/// Cookie attributes applied to the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiePolicy {
    /// Lifetime in milliseconds
    pub max_age: u64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl CookiePolicy {
    /// Expiry instant for a cookie issued at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        add_millis(now, self.max_age)
    }

    /// `Set-Cookie` header value issuing `name=value` at `now`
    ///
    /// # Errors
    /// `ConfigurationError` if `name` is not an RFC 6265 token or `value`
    /// contains anything outside cookie-octets.
    pub fn set_cookie_header(
        &self,
        name: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        validate_cookie_name(name)?;
        validate_cookie_value(value)?;
        Ok(format!(
            "{}={}; {}",
            name,
            value,
            self.attributes(self.max_age / 1000, self.expires_at(now))
        ))
    }

    /// `Set-Cookie` header value that makes the browser drop `name`
    pub fn clear_cookie_header(&self, name: &str) -> Result<String> {
        validate_cookie_name(name)?;
        Ok(format!(
            "{}=; {}",
            name,
            self.attributes(0, DateTime::<Utc>::default())
        ))
    }

    fn attributes(&self, max_age_secs: u64, expires: DateTime<Utc>) -> String {
        let mut attrs = format!(
            "Path={}; Max-Age={}; Expires={}",
            self.path,
            max_age_secs,
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        );
        if self.http_only {
            attrs.push_str("; HttpOnly");
        }
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs.push_str(&format!("; SameSite={}", self.same_site));
        attrs
    }
}

/// Full session configuration handed to the session middleware
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPolicy {
    pub name: String,
    pub cookies: CookiePolicy,
    #[serde(skip_serializing)]
    secret: MasterSecret,
    /// Trust `X-Forwarded-Proto` from the reverse proxy
    pub secure_proxy: bool,
    /// Session lifetime in milliseconds
    pub expires: u64,
    /// True when the placeholder secret was substituted
    pub placeholder_secret: bool,
}

impl SessionPolicy {
    /// Secret used to sign session identifiers (use carefully)
    pub fn secret(&self) -> &MasterSecret {
        &self.secret
    }

    /// Expiry instant for a session started at `started`
    pub fn expires_at(&self, started: DateTime<Utc>) -> DateTime<Utc> {
        add_millis(started, self.expires)
    }
}

fn validate_cookie_name(name: &str) -> Result<()> {
    let is_token_char = |b: u8| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b);
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(SecurityError::ConfigurationError(format!(
            "invalid cookie name {:?}",
            name
        )));
    }
    Ok(())
}

fn validate_cookie_value(value: &str) -> Result<()> {
    // cookie-octet: visible ASCII minus DQUOTE, comma, semicolon, backslash
    let is_cookie_octet = |b: u8| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\');
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    if !inner.bytes().all(is_cookie_octet) {
        return Err(SecurityError::ConfigurationError(
            "cookie value contains characters outside cookie-octet".to_string(),
        ));
    }
    Ok(())
}

fn add_millis(start: DateTime<Utc>, millis: u64) -> DateTime<Utc> {
    i64::try_from(millis)
        .ok()
        .and_then(|ms| start.checked_add_signed(chrono::Duration::milliseconds(ms)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Derives cookie and session policy from configuration
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicyFactory<'a> {
    config: &'a SecurityConfig,
}

impl<'a> SessionPolicyFactory<'a> {
    pub fn new(config: &'a SecurityConfig) -> Self {
        Self { config }
    }

    /// Cookie attributes for the current deployment mode
    ///
    /// # Errors
    /// `ConfigurationError` if the configured duration does not parse.
    pub fn cookie_options(&self) -> Result<CookiePolicy> {
        let production = self.config.is_production();

        Ok(CookiePolicy {
            max_age: self.config.session_duration_ms()?,
            secure: production,
            http_only: true,
            same_site: if production {
                SameSite::Strict
            } else {
                SameSite::Lax
            },
            path: "/".to_string(),
        })
    }

    /// Complete session configuration
    ///
    /// # Errors
    /// `ConfigurationError` if the duration does not parse, or if no session
    /// secret is configured in production.
    pub fn session_options(&self) -> Result<SessionPolicy> {
        let cookies = self.cookie_options()?;
        let production = self.config.is_production();

        let (secret, placeholder_secret) = match self.config.session_secret() {
            Some(secret) => (secret.clone(), false),
            None if production => {
                return Err(SecurityError::ConfigurationError(
                    "session secret is required in production".to_string(),
                ));
            }
            None => {
                PLACEHOLDER_WARNING.call_once(|| {
                    warn!(
                        "No session secret configured; using the insecure placeholder. \
                         Never deploy like this."
                    );
                });
                (MasterSecret::new(PLACEHOLDER_SESSION_SECRET), true)
            }
        };

        debug!(
            mode = ?self.config.mode(),
            max_age = cookies.max_age,
            "Resolved session policy"
        );

        Ok(SessionPolicy {
            name: SESSION_COOKIE_NAME.to_string(),
            expires: cookies.max_age,
            cookies,
            secret,
            secure_proxy: production,
            placeholder_secret,
        })
    }
}

/// In-memory session state owned by the session middleware
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    created_at: DateTime<Utc>,
    data: BTreeMap<String, Value>,
    destroyed: bool,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at,
            data: BTreeMap::new(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Store a value; returns false (and stores nothing) once destroyed
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        if self.destroyed {
            debug!("Ignoring write to destroyed session {}", self.id);
            return false;
        }
        self.data.insert(key.into(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the session outlived the policy's lifetime at `now`
    pub fn is_expired(&self, policy: &SessionPolicy, now: DateTime<Utc>) -> bool {
        now >= policy.expires_at(self.created_at)
    }
}

/// Destroy a session; absent or already destroyed sessions are left alone
pub fn invalidate_session(session: Option<&mut SessionHandle>) {
    let Some(session) = session else {
        return;
    };
    if session.destroyed {
        return;
    }

    session.data.clear();
    session.destroyed = true;
    debug!("Invalidated session {}", session.id);
}
