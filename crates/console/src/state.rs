//! Console context shared by every screen.

use std::sync::Arc;

use crate::api::ApiEndpoints;
use crate::collection::CustomerCollection;
use crate::config::{ConfigError, ConsoleConfig};
use crate::coordinator::MutationCoordinator;
use crate::customers::CustomerRepository;
use crate::guard::RouteGuard;
use crate::notify::NotificationSink;
use crate::session::SessionStore;

/// Session, repository, customer list and notifier, wired together.
///
/// Cheap to clone. Each form should get its own coordinator from
/// [`Console::coordinator`].
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    config: ConsoleConfig,
    session: SessionStore,
    repository: CustomerRepository,
    collection: CustomerCollection,
    notifier: Arc<dyn NotificationSink>,
}

impl Console {
    /// Build the context from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API URL is unusable or the HTTP client
    /// cannot be created.
    pub fn new(
        config: ConsoleConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        let endpoints = ApiEndpoints::new(config.api_url.clone())?;
        let session = SessionStore::new(config.http_client()?, endpoints);
        let repository = CustomerRepository::new(session.clone());

        Ok(Self {
            inner: Arc::new(ConsoleInner {
                config,
                session,
                repository,
                collection: CustomerCollection::new(),
                notifier,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn repository(&self) -> &CustomerRepository {
        &self.inner.repository
    }

    #[must_use]
    pub fn collection(&self) -> &CustomerCollection {
        &self.inner.collection
    }

    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.inner.notifier
    }

    /// A guard backed by this console's session.
    #[must_use]
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.inner.session.clone())
    }

    /// A fresh coordinator for one form.
    #[must_use]
    pub fn coordinator(&self) -> MutationCoordinator {
        MutationCoordinator::new(
            self.inner.repository.clone(),
            self.inner.collection.clone(),
            Arc::clone(&self.inner.notifier),
        )
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}
