//! Signed session tokens for the HTTP API.
//!
//! Tokens are HMAC-SHA256 based, scoped to a user and an expiry instant.
//! Format: `ap_sess_<user_id>_<expires_unix>_<hmac_hex>`

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Token prefix used to identify session tokens.
const TOKEN_PREFIX: &str = "ap_sess_";

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "autoplan_session";

/// Default lifetime of an issued session.
pub const DEFAULT_TTL_HOURS: i64 = 24 * 7;

/// Errors that can occur while issuing or validating a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session token format: {0}")]
    InvalidFormat(String),

    #[error("invalid user ID in session token: {0}")]
    InvalidUserId(String),

    #[error("invalid expiry in session token: {0}")]
    InvalidExpiry(String),

    #[error("session token HMAC verification failed")]
    HmacMismatch,

    #[error("session expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("session secret is missing or empty")]
    MissingSecret,
}

/// Key material for signing sessions.
#[derive(Clone)]
pub struct SessionConfig {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl SessionConfig {
    pub fn new(secret: Vec<u8>) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }
        Ok(Self { secret })
    }

    /// Build from a hex-encoded secret, as stored in the config file.
    pub fn from_hex(secret_hex: &str) -> Result<Self, SessionError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| {
            SessionError::InvalidFormat(format!("session secret is not valid hex: {e}"))
        })?;
        Self::new(secret)
    }
}

/// Claims extracted from a validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issue a session token for `user_id` valid for `ttl` from `now`.
pub fn issue_session(
    config: &SessionConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<String, SessionError> {
    let expires = (now + ttl).timestamp();
    let message = format!("{user_id}:{expires}");
    let mac = compute_hmac(&config.secret, message.as_bytes())?;
    Ok(format!("{TOKEN_PREFIX}{user_id}_{expires}_{}", hex::encode(mac)))
}

/// Validate a session token at `now` and extract its claims.
pub fn validate_session(
    config: &SessionConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<SessionClaims, SessionError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
        SessionError::InvalidFormat(format!("token must start with '{TOKEN_PREFIX}'"))
    })?;

    // <user_id> is a 36-char hyphenated UUID.
    if rest.len() < 36 || !rest.is_char_boundary(36) {
        return Err(SessionError::InvalidFormat(
            "token too short to contain a valid UUID".to_string(),
        ));
    }
    let (user_id_str, after_user) = rest.split_at(36);
    let user_id =
        Uuid::parse_str(user_id_str).map_err(|e| SessionError::InvalidUserId(e.to_string()))?;

    let after_underscore = after_user.strip_prefix('_').ok_or_else(|| {
        SessionError::InvalidFormat("expected underscore after user ID".to_string())
    })?;
    let (expires_str, hmac_hex) = after_underscore.split_once('_').ok_or_else(|| {
        SessionError::InvalidFormat("expected underscore between expiry and hmac".to_string())
    })?;
    let expires: i64 = expires_str
        .parse()
        .map_err(|e: std::num::ParseIntError| SessionError::InvalidExpiry(e.to_string()))?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| SessionError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;
    let message = format!("{user_id}:{expires}");
    verify_hmac(&config.secret, message.as_bytes(), &provided_mac)?;

    let expires_at = DateTime::<Utc>::from_timestamp(expires, 0)
        .ok_or_else(|| SessionError::InvalidExpiry(format!("{expires} is out of range")))?;
    if expires_at <= now {
        return Err(SessionError::Expired(expires_at));
    }

    Ok(SessionClaims {
        user_id,
        expires_at,
    })
}

/// Find the session token in a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name.trim() == SESSION_COOKIE)
            .then(|| value.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    })
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Result<Vec<u8>, SessionError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::MissingSecret)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time HMAC check via `verify_slice`.
fn verify_hmac(key: &[u8], message: &[u8], expected_mac: &[u8]) -> Result<(), SessionError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::MissingSecret)?;
    mac.update(message);
    mac.verify_slice(expected_mac)
        .map_err(|_| SessionError::HmacMismatch)
}
