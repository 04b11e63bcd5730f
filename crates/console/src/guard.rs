//! Access control for console screens.

use std::time::Duration;

use tracing::debug;

use crate::session::SessionStore;

/// Upper bound on how long [`RouteGuard::until_redirect`] sleeps between checks.
const RECHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Screens of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in screen.
    Login,
    /// Landing screen after sign-in.
    Dashboard,
    /// Customer list and forms.
    Customers,
}

impl Route {
    /// URL path the screen is served at.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::Dashboard => "/dashboard",
            Self::Customers => "/dashboard/customers",
        }
    }

    /// Whether the screen is only for signed-in users.
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Self::Login)
    }

    /// Route served at `path`, ignoring a trailing slash.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Self::Login),
            "/dashboard" => Some(Self::Dashboard),
            "/dashboard/customers" => Some(Self::Customers),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Result of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the requested screen.
    Proceed,
    /// Show this screen instead.
    Redirect(Route),
}

/// Decides whether a screen may be shown.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionStore,
}

impl RouteGuard {
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Whether a screen with the given requirement may be entered right now.
    #[must_use]
    pub fn can_enter(&self, requires_auth: bool) -> bool {
        !requires_auth || self.session.is_authenticated()
    }

    /// Check navigation to `route`.
    ///
    /// Protected screens send anonymous users to [`Route::Login`]; the login
    /// screen sends signed-in users to [`Route::Dashboard`].
    #[must_use]
    pub fn check(&self, route: Route) -> Navigation {
        let authenticated = self.session.is_authenticated();
        match (route.requires_auth(), authenticated) {
            (true, false) => Navigation::Redirect(Route::Login),
            (false, true) => Navigation::Redirect(Route::Dashboard),
            _ => Navigation::Proceed,
        }
    }

    /// Wait until the screen at `route` must be left, and return where to go.
    ///
    /// Re-checks whenever the session changes and when the current token
    /// reaches its expiry. An expired session found here is torn down, so
    /// other subscribers see it end too. Returns immediately if `route` is
    /// not allowed now.
    pub async fn until_redirect(&self, route: Route) -> Route {
        let mut changes = self.session.subscribe();
        loop {
            self.session.expire_if_stale();
            if let Navigation::Redirect(to) = self.check(route) {
                debug!(from = %route, to = %to, "Leaving screen");
                return to;
            }

            let wait = self
                .session
                .time_until_expiry()
                .map_or(RECHECK_INTERVAL, |left| left.min(RECHECK_INTERVAL));

            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        tokio::time::sleep(wait).await;
                    }
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Utc;
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::api::ApiEndpoints;

    fn token(exp: i64) -> SecretString {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"ana@x.com","exp":{exp}}}"#));
        SecretString::from(format!("e30.{payload}.sig"))
    }

    fn guard() -> (RouteGuard, SessionStore) {
        let endpoints = ApiEndpoints::new(Url::parse("http://localhost:8080/").unwrap()).unwrap();
        let session = SessionStore::new(reqwest::Client::new(), endpoints);
        (RouteGuard::new(session.clone()), session)
    }

    #[test]
    fn test_anonymous_is_sent_to_login() {
        let (guard, _) = guard();
        assert!(guard.can_enter(false));
        assert!(!guard.can_enter(true));
        assert_eq!(guard.check(Route::Customers), Navigation::Redirect(Route::Login));
        assert_eq!(guard.check(Route::Dashboard), Navigation::Redirect(Route::Login));
        assert_eq!(guard.check(Route::Login), Navigation::Proceed);
    }

    #[test]
    fn test_signed_in_user_proceeds() {
        let (guard, session) = guard();
        session.restore(token(Utc::now().timestamp() + 3600)).unwrap();
        assert!(guard.can_enter(true));
        assert_eq!(guard.check(Route::Customers), Navigation::Proceed);
        assert_eq!(guard.check(Route::Login), Navigation::Redirect(Route::Dashboard));
    }

    #[test]
    fn test_expired_session_is_redirected_without_teardown() {
        let (guard, session) = guard();
        session.restore(token(Utc::now().timestamp() - 10)).unwrap();
        let generation = session.generation();

        assert_eq!(guard.check(Route::Customers), Navigation::Redirect(Route::Login));
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::from_path("/"), Some(Route::Login));
        assert_eq!(Route::from_path("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(Route::from_path("/dashboard/customers"), Some(Route::Customers));
        assert_eq!(Route::from_path("/admin"), None);
        assert_eq!(Route::Customers.to_string(), "/dashboard/customers");
    }

    #[tokio::test]
    async fn test_until_redirect_follows_logout() {
        let (guard, session) = guard();
        session.restore(token(Utc::now().timestamp() + 3600)).unwrap();

        let waiting = tokio::spawn({
            let guard = guard.clone();
            async move { guard.until_redirect(Route::Customers).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.logout();

        let to = tokio::time::timeout(Duration::from_secs(2), waiting)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(to, Route::Login);
    }

    #[tokio::test]
    async fn test_until_redirect_follows_expiry() {
        let (guard, session) = guard();
        session.restore(token(Utc::now().timestamp() + 1)).unwrap();

        let to = tokio::time::timeout(Duration::from_secs(5), guard.until_redirect(Route::Dashboard))
            .await
            .unwrap();
        assert_eq!(to, Route::Login);
    }

    #[tokio::test]
    async fn test_expiry_wakeup_is_broadcast() {
        let (guard, session) = guard();
        session.restore(token(Utc::now().timestamp() + 1)).unwrap();
        let mut changes = session.subscribe();
        changes.borrow_and_update();
        let generation = session.generation();

        let to = tokio::time::timeout(Duration::from_secs(5), guard.until_redirect(Route::Customers))
            .await
            .unwrap();

        assert_eq!(to, Route::Login);
        assert_eq!(session.generation(), generation + 1);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), crate::AuthState::Anonymous);
    }
}
