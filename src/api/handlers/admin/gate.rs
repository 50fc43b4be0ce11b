//! Admin session gate.
//!
//! The credential token is `hex(sha256("{secret}:{salt}"))`. A successful
//! login issues the token derived from the configured password as the
//! `admin` cookie; every privileged request recomputes it and compares in
//! constant time. Nothing is persisted server side.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const ADMIN_COOKIE_NAME: &str = "admin";
pub const SESSION_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 7;

pub const PASSWORD_VAR: &str = "ADMIN_PASSWORD";
pub const SALT_VAR: &str = "ADMIN_TOKEN_SALT";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GateError {
    /// A required secret is missing; names the variable.
    #[error("{0} is not set")]
    Configuration(&'static str),
    #[error("invalid admin password")]
    AuthFailure,
}

/// Token handed to the client after a successful login.
pub struct SessionArtifact(SecretString);

impl SessionArtifact {
    #[must_use]
    pub fn token(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for SessionArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionArtifact([REDACTED])")
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    password: Option<SecretString>,
    salt: Option<SecretString>,
}

impl AdminGate {
    /// Empty values are treated as unset.
    #[must_use]
    pub fn new(password: Option<SecretString>, salt: Option<SecretString>) -> Self {
        let present = |value: Option<SecretString>| value.filter(|v| !v.expose_secret().is_empty());
        Self {
            password: present(password),
            salt: present(salt),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.password.is_some() && self.salt.is_some()
    }

    fn salt(&self) -> Result<&str, GateError> {
        self.salt
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or(GateError::Configuration(SALT_VAR))
    }

    fn expected_token(&self) -> Result<String, GateError> {
        let password = self
            .password
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or(GateError::Configuration(PASSWORD_VAR))?;
        Ok(compute_token(password, self.salt()?))
    }

    /// Checks a submitted password.
    ///
    /// # Errors
    /// `GateError::Configuration` when the password or salt is unset,
    /// `GateError::AuthFailure` when the password does not match.
    pub fn login(&self, submitted: &str) -> Result<SessionArtifact, GateError> {
        let expected = self.expected_token()?;
        let candidate = compute_token(submitted, self.salt()?);
        if tokens_match(&candidate, &expected) {
            Ok(SessionArtifact(SecretString::from(expected)))
        } else {
            Err(GateError::AuthFailure)
        }
    }

    /// `true` only when an artifact is presented and matches the expected
    /// token. Missing configuration reads as unauthenticated.
    #[must_use]
    pub fn is_authenticated(&self, presented: Option<&str>) -> bool {
        let Some(presented) = presented.filter(|token| !token.is_empty()) else {
            return false;
        };
        self.expected_token()
            .is_ok_and(|expected| tokens_match(presented, &expected))
    }
}

/// One-way credential digest, lowercase hex of SHA-256 over `secret:salt`.
#[must_use]
pub fn compute_token(secret: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

fn tokens_match(left: &str, right: &str) -> bool {
    left.as_bytes().ct_eq(right.as_bytes()).into()
}

pub(crate) fn session_cookie(artifact: &SessionArtifact) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{ADMIN_COOKIE_NAME}={}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={SESSION_MAX_AGE_SECONDS}",
        artifact.token()
    ))
}

pub(crate) fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("admin=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0")
}

pub(crate) fn extract_admin_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == ADMIN_COOKIE_NAME {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}
