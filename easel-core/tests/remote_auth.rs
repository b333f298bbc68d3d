//! Remote login and OTP against an in-process academy backend

mod common;

use std::sync::Arc;
use std::time::Duration;

use easel_core::{
    AuthError, Credentials, MemoryStorage, OtpError, SessionKind, SessionState, SessionStore,
    Storage,
};

use common::{PASSWORD, VALID_OTP, remote_config, spawn_backend};

async fn remote_store() -> (Arc<SessionStore>, Arc<MemoryStorage>) {
    let addr = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::from_config(storage.clone(), remote_config(addr)).unwrap();
    (Arc::new(store), storage)
}

#[tokio::test]
async fn remote_login_persists_identity_and_token() {
    let (store, storage) = remote_store().await;

    let session = store
        .login(&Credentials::new("admin@academy.org", PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::AuthenticatedAdmin);
    assert!(!session.loading());
    let identity = session.identity().unwrap();
    assert_eq!(identity.email, "admin@academy.org");
    assert_eq!(identity.id.as_deref(), Some("7"));
    assert_eq!(identity.name.as_deref(), Some("Ada Palette"));
    assert_eq!(identity.username.as_deref(), Some("admin"));
    assert_eq!(identity.role.as_deref(), Some("admin"));

    assert_eq!(
        storage.get_item("token").unwrap().as_deref(),
        Some("opaque-token-for-admin@academy.org")
    );
    assert!(store.stored_identity(SessionKind::Admin).is_some());
}

#[tokio::test]
async fn non_admin_roles_map_to_user() {
    let (store, _storage) = remote_store().await;
    let session = store
        .login(&Credentials::new("teacher@academy.org", PASSWORD))
        .await
        .unwrap();
    assert_eq!(session.identity().unwrap().role.as_deref(), Some("user"));
}

#[tokio::test]
async fn rejected_login_uses_server_message() {
    let (store, storage) = remote_store().await;

    let err = store
        .login(&Credentials::new("admin@academy.org", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Rejected { status: 401, .. }));
    assert_eq!(err.to_string(), "Bad credentials");
    assert!(storage.get_item("adminUser").unwrap().is_none());
    assert!(storage.get_item("token").unwrap().is_none());
    assert!(!store.session().loading());
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let (store, storage) = remote_store().await;
    let err = store
        .login(&Credentials::new("broken@academy.org", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::MalformedResponse(_)));
    assert!(storage.get_item("adminUser").unwrap().is_none());
}

#[tokio::test]
async fn status_without_body_gets_generic_message() {
    let (store, _storage) = remote_store().await;
    let err = store
        .login(&Credentials::new("down@academy.org", PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Login failed (HTTP 503)");
}

#[tokio::test]
async fn loading_is_set_while_login_is_in_flight() {
    let (store, _storage) = remote_store().await;
    let mut rx = store.subscribe();
    rx.mark_unchanged();

    let login = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .login(&Credentials::new("slow@academy.org", PASSWORD))
                .await
        })
    };

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().loading());

    login.await.unwrap().unwrap();
    assert!(!store.session().loading());
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn loading_stays_set_until_every_login_finishes() {
    let (store, _storage) = remote_store().await;
    let mut rx = store.subscribe();
    rx.mark_unchanged();

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .login(&Credentials::new("slow@academy.org", PASSWORD))
                .await
        })
    };
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().loading());

    store
        .login(&Credentials::new("admin@academy.org", PASSWORD))
        .await
        .unwrap();
    assert!(store.session().loading(), "slow login is still in flight");

    slow.await.unwrap().unwrap();
    assert!(!store.session().loading());
}

#[tokio::test]
async fn cancelled_login_clears_loading() {
    let (store, storage) = remote_store().await;

    let attempt = tokio::time::timeout(
        Duration::from_millis(20),
        store.login(&Credentials::new("slow@academy.org", PASSWORD)),
    )
    .await;

    assert!(attempt.is_err(), "login should still be waiting on the backend");
    assert!(!store.session().loading());
    assert!(storage.get_item("adminUser").unwrap().is_none());
}

#[tokio::test]
async fn overlapping_logins_last_finisher_wins() {
    let (store, storage) = remote_store().await;

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .login(&Credentials::new("slow@academy.org", PASSWORD))
                .await
        })
    };
    let fast = store
        .login(&Credentials::new("admin@academy.org", PASSWORD))
        .await
        .unwrap();
    assert_eq!(fast.identity().unwrap().email, "admin@academy.org");

    slow.await.unwrap().unwrap();

    // No in-flight guard: the slower call overwrote the faster one everywhere
    let session = store.session();
    assert_eq!(session.identity().unwrap().email, "slow@academy.org");
    assert_eq!(
        store.stored_identity(SessionKind::Admin).unwrap().email,
        "slow@academy.org"
    );
    assert_eq!(
        storage.get_item("token").unwrap().as_deref(),
        Some("opaque-token-for-slow@academy.org")
    );
}

#[tokio::test]
async fn otp_flow_passes_through() {
    let (store, _storage) = remote_store().await;

    let reply = store.request_otp("mia@academy.org").await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("OTP sent to mia@academy.org"));

    store.verify_otp("mia@academy.org", VALID_OTP).await.unwrap();

    let reply = store
        .reset_password("mia@academy.org", VALID_OTP, "n3w-pass")
        .await
        .unwrap();
    assert_eq!(reply.message.as_deref(), Some("Password updated"));
}

#[tokio::test]
async fn otp_rejections_carry_server_message() {
    let (store, _storage) = remote_store().await;

    let err = store.verify_otp("mia@academy.org", "000000").await.unwrap_err();
    assert!(matches!(err, OtpError::Rejected(_)));
    assert_eq!(err.to_string(), "Invalid OTP");

    let err = store
        .reset_password("mia@academy.org", "999999", "n3w-pass")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "OTP expired");
}

#[tokio::test]
async fn otp_validates_locally() {
    let (store, _storage) = remote_store().await;
    let err = store.request_otp("mia@").await.unwrap_err();
    assert!(matches!(err, OtpError::Validation(_)));
}
