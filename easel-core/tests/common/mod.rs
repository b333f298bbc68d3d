//! Shared test utilities for easel-core integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use easel_core::{AuthConfig, DemoAuthBackend, MemoryStorage, SessionConfig, SessionStore, Storage};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Password the fake backend accepts for every known user
pub const PASSWORD: &str = "secret";

/// OTP the fake backend accepts
pub const VALID_OTP: &str = "123456";

/// Store with the demo backend on its own private storage
#[allow(dead_code)]
pub fn demo_store(storage: Arc<dyn Storage>) -> SessionStore {
    SessionStore::new(
        storage,
        Arc::new(DemoAuthBackend::new("admin@123gmail.com", "admin123")),
        SessionConfig::default(),
    )
}

/// Store with a fresh in-memory storage, returning both
#[allow(dead_code)]
pub fn fresh_demo_store() -> (SessionStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (demo_store(storage.clone()), storage)
}

/// Session config pointing both login and OTP at `addr`
#[allow(dead_code)]
pub fn remote_config(addr: SocketAddr) -> SessionConfig {
    let base = Url::parse(&format!("http://{}", addr)).unwrap();
    let mut config = SessionConfig {
        auth: AuthConfig::remote(base),
        ..SessionConfig::default()
    };
    config.otp.enabled = true;
    config
}

fn token_for(email: &str) -> String {
    format!("opaque-token-for-{}", email)
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if password != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Bad credentials"})),
        )
            .into_response();
    }

    match email {
        "broken@academy.org" => (StatusCode::OK, "<html>oops</html>").into_response(),
        "down@academy.org" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => {
            if email.starts_with("slow") {
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            let roles = if email.starts_with("admin") || email.starts_with("slow") {
                json!(["ROLE_USER", "ROLE_ADMIN"])
            } else {
                json!(["ROLE_USER"])
            };
            Json(json!({
                "accessToken": token_for(email),
                "userId": 7,
                "username": email.split('@').next().unwrap_or_default(),
                "firstName": "Ada",
                "lastName": "Palette",
                "email": email,
                "roles": roles,
            }))
            .into_response()
        }
    }
}

async fn otp_request(Json(body): Json<Value>) -> Json<Value> {
    let email = body["email"].as_str().unwrap_or_default();
    Json(json!({"success": true, "message": format!("OTP sent to {}", email)}))
}

async fn otp_verify(Json(body): Json<Value>) -> Response {
    if body["otp"] == VALID_OTP {
        Json(json!({"success": true})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "Invalid OTP"})),
        )
            .into_response()
    }
}

async fn otp_reset(Json(body): Json<Value>) -> Json<Value> {
    if body["otp"] == VALID_OTP && body["newPassword"].as_str().is_some() {
        Json(json!({"success": true, "message": "Password updated"}))
    } else {
        Json(json!({"success": false, "message": "OTP expired"}))
    }
}

/// Spawns the fake academy backend, returns its bound address
#[allow(dead_code)]
pub async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/otp/request", post(otp_request))
        .route("/api/otp/verify", post(otp_verify))
        .route("/api/otp/reset-password", post(otp_reset));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}
