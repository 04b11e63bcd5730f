//! Integration test support for the customer console.
//!
//! The backend is replaced by a `wiremock` server speaking the same JSON as
//! the real customer API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p customer-console-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use customer_console::{Console, ConsoleConfig, Credentials, NotificationSink};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build an unsigned HS256-shaped JWT for `subject` expiring at `exp`.
#[must_use]
pub fn jwt(subject: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "sub": subject,
        "iss": "https://amigoscode.com",
        "iat": Utc::now().timestamp(),
        "exp": exp,
        "scopes": ["ROLE_USER"],
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// A token valid for the next hour.
#[must_use]
pub fn live_token(subject: &str) -> String {
    jwt(subject, Utc::now().timestamp() + 3600)
}

/// A token that expired a minute ago.
#[must_use]
pub fn expired_token(subject: &str) -> String {
    jwt(subject, Utc::now().timestamp() - 60)
}

/// A customer as the backend serializes it.
#[must_use]
pub fn customer_json(id: i32, name: &str, email: &str, age: i32, gender: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": email,
        "gender": gender,
        "age": age,
        "roles": ["ROLE_USER"],
        "username": email,
        "profileImageId": null,
    })
}

/// Backend error envelope.
#[must_use]
pub fn api_error(path: &str, message: &str, status: u16) -> Value {
    json!({
        "path": path,
        "message": message,
        "statusCode": status,
        "localDateTime": "2026-10-19T10:00:00",
    })
}

/// Credentials used against the mock backend.
#[must_use]
pub fn admin_credentials() -> Credentials {
    Credentials::new("admin@x.com", SecretString::from("password"))
}

/// One notification as seen by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success { title: String, message: String },
    Failure { title: String, message: String },
}

/// Notification sink that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Everything received so far, in order.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notes.lock().unwrap().clone()
    }

    #[must_use]
    pub fn successes(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::Success { .. }))
            .count()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::Failure { .. }))
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify_success(&self, title: &str, message: &str) {
        self.notes.lock().unwrap().push(Notification::Success {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn notify_failure(&self, title: &str, message: &str) {
        self.notes.lock().unwrap().push(Notification::Failure {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// A mock backend with a console pointed at it.
pub struct TestContext {
    pub server: MockServer,
    pub console: Console,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    /// Start a mock backend; the console is not signed in.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let config = ConsoleConfig::for_api(Url::parse(&format!("{}/", server.uri())).unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let console = Console::new(config, notifier.clone()).unwrap();
        Self {
            server,
            console,
            notifier,
        }
    }

    /// Start a mock backend with a live session already restored.
    pub async fn signed_in() -> Self {
        let ctx = Self::new().await;
        ctx.console
            .session()
            .restore(SecretString::from(live_token("admin@x.com")))
            .unwrap();
        ctx
    }

    /// Answer logins with `token` and an admin profile.
    pub async fn mount_login(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Authorization", token)
                    .set_body_json(json!({
                        "token": token,
                        "customerDTO": customer_json(1, "Admin", "admin@x.com", 40, "MALE"),
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /api/v1/customers` with `customers`, expecting exactly
    /// `calls` requests.
    pub async fn mount_list(&self, customers: Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/api/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(customers))
            .expect(calls)
            .named("list customers")
            .mount(&self.server)
            .await;
    }

    /// Number of requests the backend has received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
