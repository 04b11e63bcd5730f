//! Identity claims carried by the session token.
//!
//! The backend issues HS256 JWTs. The console cannot verify the signature and
//! does not try to: the payload is decoded only to learn who is signed in and
//! when the token stops being worth sending. The server stays the authority.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while decoding a token payload.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    #[error("token is not a JWT")]
    Malformed,

    /// The payload segment is not base64url.
    #[error("token payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload is not the expected JSON object.
    #[error("token payload is not valid claims JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoded identity claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject; the signed-in user's email.
    pub sub: String,
    /// Expiry as a Unix timestamp in seconds.
    pub exp: i64,
    /// Issue time as a Unix timestamp in seconds.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Granted scopes/roles.
    #[serde(default, alias = "roles")]
    pub scopes: Vec<String>,
}

impl Claims {
    /// Decode the payload of a compact JWT without verifying it.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError` if the token is not a well-formed JWT or its
    /// payload lacks `sub`/`exp`.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let mut segments = token.trim().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ClaimsError::Malformed);
        };

        if payload.is_empty() {
            return Err(ClaimsError::Malformed);
        }

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Whether the token is still valid at `now` (Unix seconds).
    ///
    /// Valid means the expiry is strictly after `now`.
    #[must_use]
    pub const fn is_live_at(&self, now: i64) -> bool {
        self.exp > now
    }

    /// Whether the token has expired as of the current time.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        !self.is_live_at(Utc::now().timestamp())
    }

    /// Expiry as a timestamp, if representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Time left before expiry, or `None` if already expired.
    #[must_use]
    pub fn time_remaining(&self) -> Option<std::time::Duration> {
        let remaining_ms = self
            .exp
            .saturating_mul(1000)
            .saturating_sub(Utc::now().timestamp_millis());
        u64::try_from(remaining_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(std::time::Duration::from_millis)
    }

    /// Whether the token grants `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.scopes.iter().any(|scope| scope == role)
    }
}
