//! Backend endpoint layout.

use customer_console_core::CustomerId;
use url::Url;

use crate::config::ConfigError;

/// Builds absolute URLs for the backend's REST endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    /// Wrap a base URL such as `http://localhost:8080/`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot carry a path
    /// (e.g. `mailto:`).
    pub fn new(base: Url) -> Result<Self, ConfigError> {
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "CONSOLE_API_URL".to_string(),
                format!("{base} cannot be used as a base URL"),
            ));
        }
        Ok(Self { base })
    }

    /// `POST` target for password login.
    #[must_use]
    pub fn login(&self) -> Url {
        self.endpoint(&["api", "v1", "auth", "login"])
    }

    /// Customer collection.
    #[must_use]
    pub fn customers(&self) -> Url {
        self.endpoint(&["api", "v1", "customers"])
    }

    /// A single customer.
    #[must_use]
    pub fn customer(&self, id: CustomerId) -> Url {
        self.endpoint(&["api", "v1", "customers", &id.to_string()])
    }

    /// A customer's profile picture (upload target and image source).
    #[must_use]
    pub fn profile_image(&self, id: CustomerId) -> Url {
        self.endpoint(&["api", "v1", "customers", &id.to_string(), "profile-image"])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
