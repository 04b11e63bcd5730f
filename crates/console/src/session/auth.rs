//! Password login against the backend.
//!
//! Exchanges an email/password pair for a bearer token.

use customer_console_core::Customer;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::claims::Claims;
use crate::error::{ApiErrorBody, ConsoleError};

/// Login credentials.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials; the username is the account email.
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token and identity obtained from a successful login.
#[derive(Clone)]
pub struct IssuedToken {
    /// Bearer credential.
    pub token: SecretString,
    /// Claims decoded from the token payload.
    pub claims: Claims,
    /// Profile of the signed-in user, when the backend returned one.
    pub profile: Option<Customer>,
}

/// Request body for the login endpoint.
#[derive(Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response from the login endpoint. Every field is optional, and a body
/// that is empty or not JSON reads as the default.
#[derive(Deserialize, Default)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "customerDTO")]
    customer: Option<Customer>,
}

/// Authenticate with email and password.
///
/// # Errors
///
/// - `ConsoleError::Auth` with the server's message (or "Invalid credentials")
///   if the credentials are rejected, or if the issued token is already expired.
/// - `ConsoleError::Network` on transport failure or an unusable response.
#[instrument(skip(client, credentials), fields(username = %credentials.username()))]
pub async fn authenticate(
    client: &reqwest::Client,
    login_url: Url,
    credentials: &Credentials,
) -> Result<IssuedToken, ConsoleError> {
    let response = client
        .post(login_url)
        .json(&AuthRequest {
            username: &credentials.username,
            password: credentials.password.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let header_token = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start_matches("Bearer ").trim().to_string())
            .filter(|v| !v.is_empty());

        let bytes = response.bytes().await?;
        let body: AuthResponse = serde_json::from_slice(&bytes).unwrap_or_default();

        let token = body
            .token
            .filter(|t| !t.trim().is_empty())
            .or(header_token)
            .ok_or_else(|| ConsoleError::Network("login response did not include a token".to_string()))?;

        let claims = Claims::decode(&token)
            .map_err(|e| ConsoleError::Network(format!("login returned an unreadable token: {e}")))?;

        if claims.is_expired() {
            return Err(ConsoleError::Auth("Session token is already expired".to_string()));
        }

        Ok(IssuedToken {
            token: SecretString::from(token),
            claims,
            profile: body.customer,
        })
    } else if status == reqwest::StatusCode::BAD_REQUEST
        || status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        let body = response.bytes().await.unwrap_or_default();
        let message = ApiErrorBody::parse(&body)
            .and_then(|e| e.message())
            .unwrap_or_else(|| "Invalid credentials".to_string());

        Err(ConsoleError::Auth(message))
    } else {
        let body = response.bytes().await.unwrap_or_default();
        let err = ConsoleError::from_response(status, &body);

        Err(ConsoleError::Network(err.detail().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("ana@x.com", SecretString::from("hunter2"));
        let debug = format!("{credentials:?}");
        assert!(debug.contains("ana@x.com"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_auth_response_reads_backend_shape() {
        let json = r#"{
            "token": "a.b.c",
            "customerDTO": {
                "id": 1, "name": "Ana", "email": "ana@x.com", "gender": "FEMALE",
                "age": 30, "roles": ["ROLE_USER"], "username": "ana@x.com",
                "profileImageId": null
            }
        }"#;
        let response: AuthResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.token.as_deref(), Some("a.b.c"));
        assert_eq!(response.customer.map(|c| c.name), Some("Ana".to_string()));
    }
}
