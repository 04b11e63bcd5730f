//! Login, expiry and authorization teardown against a mock backend.

#![allow(clippy::unwrap_used)]

use customer_console::{AuthState, ErrorKind};
use customer_console_integration_tests::{
    TestContext, admin_credentials, api_error, expired_token, live_token,
};
use secrecy::SecretString;
use tokio::task::JoinSet;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_login_then_logout() {
    let ctx = TestContext::new().await;
    ctx.mount_login(&live_token("admin@x.com")).await;
    let session = ctx.console.session();

    let claims = session.login(&admin_credentials()).await.unwrap();
    assert_eq!(claims.sub, "admin@x.com");
    assert!(session.is_authenticated());
    assert_eq!(session.current_profile().unwrap().name, "Admin");

    session.logout();
    assert!(!session.is_authenticated());
    assert!(session.current_identity().is_none());
    assert_eq!(*session.subscribe().borrow(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_rejected_login_stays_anonymous() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(api_error("/api/v1/auth/login", "Bad credentials", 401)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx
        .console
        .session()
        .login(&admin_credentials())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.detail(), "Bad credentials");
    assert!(!ctx.console.session().is_authenticated());
    assert_eq!(ctx.console.session().generation(), 0);
}

#[tokio::test]
async fn test_failed_login_keeps_previous_session() {
    let ctx = TestContext::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let err = ctx
        .console
        .session()
        .login(&admin_credentials())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(ctx.console.session().is_authenticated());
}

#[tokio::test]
async fn test_expired_token_is_checked_without_network() {
    let ctx = TestContext::new().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let session = ctx.console.session();
    session
        .restore(SecretString::from(expired_token("admin@x.com")))
        .unwrap();

    assert!(!session.is_authenticated());
    assert!(!ctx.console.guard().can_enter(true));
    assert_eq!(ctx.request_count().await, 0);
}

#[tokio::test]
async fn test_expired_session_sends_nothing_and_is_torn_down() {
    let ctx = TestContext::new().await;
    ctx.mount_list(serde_json::json!([]), 0).await;

    let session = ctx.console.session();
    session
        .restore(SecretString::from(expired_token("admin@x.com")))
        .unwrap();
    let before = session.generation();

    let err = ctx.console.repository().list().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(session.generation(), before + 1);
}

#[tokio::test]
async fn test_concurrent_auth_errors_end_session_once() {
    let ctx = TestContext::signed_in().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(api_error("/api/v1/customers", "Token expired", 401))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .mount(&ctx.server)
        .await;

    let session = ctx.console.session();
    let before = session.generation();
    let mut changes = session.subscribe();
    changes.borrow_and_update();

    let mut calls = JoinSet::new();
    for _ in 0..8 {
        let repository = ctx.console.repository().clone();
        calls.spawn(async move { repository.list().await });
    }

    let mut auth_errors = 0;
    while let Some(result) = calls.join_next().await {
        if result.unwrap().is_err_and(|e| e.is_auth()) {
            auth_errors += 1;
        }
    }

    assert_eq!(auth_errors, 8);
    assert_eq!(session.generation(), before + 1);
    assert!(!session.is_authenticated());
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_auth_error_from_old_session_spares_new_one() {
    let ctx = TestContext::signed_in().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_delay(std::time::Duration::from_millis(200)))
        .mount(&ctx.server)
        .await;

    let repository = ctx.console.repository().clone();
    let stale_call = tokio::spawn(async move { repository.list().await });

    // Sign in again while the old request is still pending.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    ctx.console
        .session()
        .restore(SecretString::from(live_token("other@x.com")))
        .unwrap();

    assert!(stale_call.await.unwrap().unwrap_err().is_auth());
    assert!(ctx.console.session().is_authenticated());
    assert_eq!(
        ctx.console.session().current_identity().unwrap().sub,
        "other@x.com"
    );
}
