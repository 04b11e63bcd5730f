//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CONSOLE_API_URL` - Base URL of the customer API (default: <http://localhost:8080>)
//! - `CONSOLE_HTTP_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `CONSOLE_USERNAME` - Login email used by non-interactive front ends
//! - `CONSOLE_PASSWORD` - Login password used by non-interactive front ends
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (0.0 to 1.0, default: 1.0)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::session::Credentials;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Customer console configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the customer API; endpoints are resolved against it
    pub api_url: Url,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Login email for non-interactive use (optional)
    pub username: Option<String>,
    /// Login password for non-interactive use (optional)
    pub password: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

impl ConsoleConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = parse_api_url(
            &get("CONSOLE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;

        let timeout_secs = match get("CONSOLE_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "CONSOLE_HTTP_TIMEOUT_SECS".to_string(),
                        format!("expected a positive number of seconds, got {raw:?}"),
                    )
                })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let sentry_sample_rate = get("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            api_url,
            http_timeout: Duration::from_secs(timeout_secs),
            username: get("CONSOLE_USERNAME").map(|u| u.trim().to_string()),
            password: get("CONSOLE_PASSWORD").map(SecretString::from),
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }

    /// Configuration pointing at `api_url` with defaults for everything else.
    #[must_use]
    pub fn for_api(api_url: Url) -> Self {
        Self {
            api_url,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            username: None,
            password: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
        }
    }

    /// Login credentials, with `username` taking precedence over
    /// `CONSOLE_USERNAME`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no username or no password is
    /// available.
    pub fn credentials(&self, username: Option<&str>) -> Result<Credentials, ConfigError> {
        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .or(self.username.as_deref())
            .ok_or_else(|| ConfigError::MissingEnvVar("CONSOLE_USERNAME".to_string()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("CONSOLE_PASSWORD".to_string()))?;
        Ok(Credentials::new(username, password))
    }

    /// Build the HTTP client shared by the session store and the repository.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("customer-console/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

/// Parse the API base URL, normalising it to end with `/` so joins append.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid =
        |reason: String| ConfigError::InvalidEnvVar("CONSOLE_API_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
