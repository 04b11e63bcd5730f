//! Authentication session.
//!
//! `SessionStore` is the only owner of the bearer token. Every other component
//! holds a cloned handle and reads the token at call time.
//!
//! # Generations
//!
//! Each session change (login, logout, restore, teardown) bumps a generation
//! counter. Requests remember the generation of the token they were sent with,
//! and an authorization failure only tears the session down if that generation
//! is still current. Concurrent failures from one stale session therefore
//! cause exactly one transition, and a failure from an old session can never
//! sign out a newer one.

mod auth;
mod claims;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use customer_console_core::Customer;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

pub use auth::{Credentials, IssuedToken, authenticate};
pub use claims::{Claims, ClaimsError};

use crate::api::ApiEndpoints;
use crate::busy::BusyGuard;
use crate::error::ConsoleError;

/// Whether a usable session is held, as broadcast to subscribers.
///
/// A login in progress is reported separately by
/// [`SessionStore::is_authenticating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No session, or the session was torn down.
    Anonymous,
    /// A session was established or restored.
    Authenticated,
}

/// Bearer credential captured for a single request.
#[derive(Clone)]
pub struct Bearer {
    token: SecretString,
    generation: u64,
}

impl Bearer {
    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }

    /// Generation of the session that issued this token.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for Bearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bearer")
            .field("token", &"[REDACTED]")
            .field("generation", &self.generation)
            .finish()
    }
}

struct Session {
    token: SecretString,
    claims: Claims,
    profile: Option<Customer>,
}

impl Session {
    fn is_live(&self) -> bool {
        !self.claims.is_expired()
    }
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    generation: u64,
}

/// Shared handle to the authentication session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    client: reqwest::Client,
    endpoints: ApiEndpoints,
    state: RwLock<SessionState>,
    authenticating: AtomicBool,
    changes: watch::Sender<AuthState>,
}

impl SessionStore {
    /// Create an anonymous store that logs in through `endpoints`.
    #[must_use]
    pub fn new(client: reqwest::Client, endpoints: ApiEndpoints) -> Self {
        let (changes, _) = watch::channel(AuthState::Anonymous);
        Self {
            inner: Arc::new(SessionStoreInner {
                client,
                endpoints,
                state: RwLock::new(SessionState::default()),
                authenticating: AtomicBool::new(false),
                changes,
            }),
        }
    }

    /// Log in and replace the current session.
    ///
    /// On failure the previous session (if any) is left untouched.
    ///
    /// # Errors
    ///
    /// - `ConsoleError::Auth` if the credentials are rejected, the issued
    ///   token is already expired, or another login is still running.
    /// - `ConsoleError::Network` if the backend could not be reached.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Claims, ConsoleError> {
        let Some(_busy) = BusyGuard::acquire(&self.inner.authenticating) else {
            return Err(ConsoleError::Auth(
                "A login is already in progress".to_string(),
            ));
        };

        let issued =
            authenticate(&self.inner.client, self.inner.endpoints.login(), credentials).await?;
        let claims = issued.claims.clone();
        self.install(issued);

        info!(subject = %claims.sub, expires_at = ?claims.expires_at(), "Signed in");
        Ok(claims)
    }

    /// Resume a session from a previously issued token.
    ///
    /// The token is installed even if it has already expired; such a session
    /// reports as unauthenticated and is torn down by the first request that
    /// observes it.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError` if the token payload cannot be decoded.
    pub fn restore(&self, token: SecretString) -> Result<Claims, ClaimsError> {
        let claims = Claims::decode(token.expose_secret())?;
        self.install(IssuedToken {
            token,
            claims: claims.clone(),
            profile: None,
        });
        info!(subject = %claims.sub, live = !claims.is_expired(), "Session restored");
        Ok(claims)
    }

    fn install(&self, issued: IssuedToken) {
        let live = !issued.claims.is_expired();
        let mut state = self.write();
        state.session = Some(Session {
            token: issued.token,
            claims: issued.claims,
            profile: issued.profile,
        });
        state.generation += 1;
        self.inner.changes.send_replace(if live {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        });
    }

    /// Drop the session unconditionally.
    pub fn logout(&self) {
        let mut state = self.write();
        if let Some(session) = state.session.take() {
            state.generation += 1;
            info!(subject = %session.claims.sub, "Signed out");
        }
        self.inner.changes.send_replace(AuthState::Anonymous);
    }

    /// Whether a session is held and its token has not expired.
    ///
    /// Evaluated on every call; never sends a request or changes state.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().session.as_ref().is_some_and(Session::is_live)
    }

    /// Whether a login is currently running.
    #[must_use]
    pub fn is_authenticating(&self) -> bool {
        self.inner.authenticating.load(Ordering::Acquire)
    }

    /// Claims of the signed-in user, if authenticated.
    #[must_use]
    pub fn current_identity(&self) -> Option<Claims> {
        self.read()
            .session
            .as_ref()
            .filter(|s| s.is_live())
            .map(|s| s.claims.clone())
    }

    /// Profile returned by the login call, if authenticated.
    #[must_use]
    pub fn current_profile(&self) -> Option<Customer> {
        self.read()
            .session
            .as_ref()
            .filter(|s| s.is_live())
            .and_then(|s| s.profile.clone())
    }

    /// Time left before the current session expires.
    #[must_use]
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.read()
            .session
            .as_ref()
            .and_then(|s| s.claims.time_remaining())
    }

    /// Token to send with a request, tagged with its session generation.
    ///
    /// An expired session is torn down here.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Auth` if there is no live session.
    pub fn bearer_token(&self) -> Result<Bearer, ConsoleError> {
        let expired_generation = {
            let state = self.read();
            match &state.session {
                None => return Err(ConsoleError::Auth("Not signed in".to_string())),
                Some(session) if session.is_live() => {
                    return Ok(Bearer {
                        token: session.token.clone(),
                        generation: state.generation,
                    });
                }
                Some(_) => state.generation,
            }
        };

        self.invalidate(expired_generation);
        Err(ConsoleError::Auth("Session expired".to_string()))
    }

    /// Tear down the held session if its token has expired.
    ///
    /// Returns `true` if this call performed the teardown, in which case
    /// subscribers are sent `AuthState::Anonymous`.
    pub fn expire_if_stale(&self) -> bool {
        let generation = {
            let state = self.read();
            match &state.session {
                Some(session) if !session.is_live() => state.generation,
                _ => return false,
            }
        };
        self.invalidate(generation)
    }

    /// Tear down the session if it is still the one from `generation`.
    ///
    /// Returns `true` if this call performed the teardown.
    pub fn invalidate(&self, generation: u64) -> bool {
        let mut state = self.write();
        if state.generation != generation {
            return false;
        }
        let Some(session) = state.session.take() else {
            return false;
        };
        state.generation += 1;
        warn!(subject = %session.claims.sub, "Session is no longer authorized; signing out");
        self.inner.changes.send_replace(AuthState::Anonymous);
        true
    }

    /// Current session generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Receive a notification on every session change.
    ///
    /// Expiry is not timed here: an expired session keeps reading as
    /// `Authenticated` on the channel until it is observed, either by a
    /// request through [`bearer_token`](Self::bearer_token), by
    /// [`expire_if_stale`](Self::expire_if_stale), or by a
    /// [`RouteGuard`](crate::RouteGuard) waiting in `until_redirect`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.changes.subscribe()
    }

    /// URL builder shared with the repository.
    #[must_use]
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.inner.endpoints
    }

    /// HTTP client shared with the repository.
    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("subject", &state.session.as_ref().map(|s| s.claims.sub.as_str()))
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}
