//!
//! DogScan API HTTP server
//! -----------------------
//! Axum-based HTTP surface for the DogScanAI backend.
//!
//! Responsibilities:
//! - Session authentication with a `token` cookie + bearer-header fallback.
//! - Register/login/me/logout endpoints backed by the credential store.
//! - Scan-count lookup consumed by the frontend dashboard.
//! - CORS for the browser client and a request timeout on every route.
//! - Diagnostic endpoints used during device bring-up on the LAN.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::ApiError;
use crate::identity::{require_session, Identity, TokenCodec, TOKEN_COOKIE};
use crate::security;
use crate::store::{CredentialStore, PgStore};

/// Cookie lifetime matches the token expiry: 30 days.
const TOKEN_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared server state injected into all handlers.
///
/// The credential store and token codec are constructed once at startup and
/// handed in here; handlers own no globals and open no connections themselves.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub tokens: TokenCodec,
    /// Set the Secure cookie attribute (production deployments only).
    pub secure_cookies: bool,
}

/// Build the full route table over the given state. Kept separate from `run`
/// so tests can drive the router in-process.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/test", get(api_test))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/scan-count/{email}", get(scan_count))
        .merge(protected)
        .with_state(state)
}

fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    let configured = client_url.map(|s| s.to_string());
    // Requests without an Origin header (mobile apps, curl) bypass CORS
    // entirely; the predicate only has to admit the browser origins.
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let Ok(origin) = origin.to_str() else { return false };
            if configured.as_deref() == Some(origin) {
                return true;
            }
            origin.starts_with("http://localhost") || origin.starts_with("http://127.0.0.1")
        }))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(target: "startup", "shutdown signal received");
}

/// Start the DogScan API bound to 0.0.0.0 so devices on the LAN can reach it.
/// Opens the Postgres pool up front, serves until ctrl-c, then closes the pool.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.database_url).await?;
    let pool = store.pool();
    let state = AppState {
        store: Arc::new(store),
        tokens: TokenCodec::new(&config.jwt_secret),
        secure_cookies: config.production,
    };
    let app = router(state)
        .layer(cors_layer(config.client_url.as_deref()))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "startup", "dogscan-api listening on {}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    pool.close().await;
    info!(target: "startup", "dogscan-api stopped; pool closed");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn session_cookie(token: &str, secure: bool) -> HeaderValue {
    let mut v = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE, token, TOKEN_MAX_AGE_SECS
    );
    if secure {
        v.push_str("; Secure");
    }
    HeaderValue::from_str(&v).unwrap()
}

fn clear_session_cookie(secure: bool) -> HeaderValue {
    let mut v = format!(
        "{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/",
        TOKEN_COOKIE
    );
    if secure {
        v.push_str("; Secure");
    }
    HeaderValue::from_str(&v).unwrap()
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let RegisterPayload { name, email, password } = payload;
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::validation("Please provide all required fields"));
    }

    let server_error = |e: anyhow::Error| {
        error!("registration failed: {e}");
        ApiError::internal("Server error during registration")
    };

    if state.store.find_by_email(&email).await.map_err(server_error)?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    // Argon2 is deliberately slow; keep it off the async workers.
    let hash = tokio::task::spawn_blocking({
        let password = password.clone();
        move || security::hash_password(&password)
    })
    .await
    .map_err(|e| server_error(e.into()))?
    .map_err(server_error)?;

    let user = state
        .store
        .insert_user(&name, &email, &hash)
        .await
        .map_err(server_error)?;
    let token = state.tokens.issue(user.id).map_err(server_error)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, state.secure_cookies));
    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({
            "success": true,
            "message": "Registration successful",
            "user": user,
            "token": token,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let LoginPayload { email, password } = payload;
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::validation("Please provide all required fields"));
    }

    let server_error = |e: anyhow::Error| {
        error!("login failed: {e}");
        ApiError::internal("Server error during login")
    };

    // Unknown email and wrong password produce the identical response below.
    let Some(record) = state.store.find_by_email(&email).await.map_err(server_error)? else {
        return Err(ApiError::InvalidCredentials);
    };

    let matched = tokio::task::spawn_blocking({
        let hash = record.password_hash.clone();
        move || security::verify_password(&hash, &password)
    })
    .await
    .map_err(|e| server_error(e.into()))?;
    if !matched {
        return Err(ApiError::InvalidCredentials);
    }

    let user = record.identity();
    let token = state.tokens.issue(user.id).map_err(server_error)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, state.secure_cookies));
    Ok((
        StatusCode::OK,
        headers,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "user": user,
            "token": token,
        })),
    ))
}

/// Echo the identity the session gate attached. The gate guarantees this
/// extension is present on every request that reaches here.
async fn me(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(json!({ "success": true, "user": identity }))
}

/// Stateless tokens have no server-side session to destroy; logout just
/// overwrites the cookie with an already-expired empty value. Works the same
/// whether or not a valid session existed.
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie(state.secure_cookies));
    (
        StatusCode::OK,
        headers,
        Json(json!({ "success": true, "message": "Logged out successfully" })),
    )
}

async fn scan_count(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let total = state.store.scan_count(&email).await.map_err(|e| {
        error!("scan count failed: {e}");
        ApiError::internal("Internal server error")
    })?;
    Ok(Json(json!({ "success": true, "total": total })))
}

async fn api_test() -> impl IntoResponse {
    Json(json!({ "success": true, "message": "Server is working!" }))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "dogscan-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "dogscan-api",
        "status": "ok",
        "endpoints": ["/api/auth", "/api/scan-count/{email}", "/api/test", "/health"],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let v = session_cookie("tok123", false);
        let s = v.to_str().unwrap();
        assert!(s.starts_with("token=tok123;"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Lax"));
        assert!(s.contains("Max-Age=2592000"));
        assert!(!s.contains("Secure"));
        assert!(session_cookie("tok123", true).to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn cleared_cookie_is_empty_and_expired() {
        let s = clear_session_cookie(false).to_str().unwrap().to_string();
        assert!(s.starts_with("token=;"));
        assert!(s.contains("Expires=Thu, 01 Jan 1970"));
    }
}
