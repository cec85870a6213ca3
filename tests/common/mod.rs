#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use statuswatch_client::auth::{StorageTokenStore, TokenStore};
use statuswatch_client::config::ApiConfig;
use statuswatch_client::storage::MemoryStorage;

pub const PASSWORD: &str = "correct horse";
pub const INITIAL_ACCESS: &str = "access-1";
pub const INITIAL_REFRESH: &str = "refresh-1";
pub const REFRESHED_ACCESS: &str = "access-2";

/// Backend double: fixed accounts, a single valid access token at a time.
pub struct BackendState {
    pub valid_access: Mutex<String>,
    pub valid_refresh: Mutex<String>,
    pub endpoints: Mutex<Vec<Value>>,
    pub refresh_calls: AtomicUsize,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            valid_access: Mutex::new(INITIAL_ACCESS.to_string()),
            valid_refresh: Mutex::new(INITIAL_REFRESH.to_string()),
            endpoints: Mutex::new(vec![json!({
                "id": 1,
                "name": "Marketing site",
                "url": "https://acme.test/",
                "interval_minutes": 5,
                "is_active": true,
                "last_status": "up",
                "last_checked_at": "2026-10-18T09:00:00Z"
            })]),
            refresh_calls: AtomicUsize::new(0),
        }
    }
}

impl BackendState {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Pretend the access token expired.
    pub fn expire_access(&self) {
        *self.valid_access.lock().unwrap() = "expired-on-server".to_string();
    }

    pub fn revoke_refresh(&self) {
        *self.valid_refresh.lock().unwrap() = "revoked-on-server".to_string();
    }
}

pub struct StubBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl StubBackend {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind stub backend on {port}"))?;

        let state = Arc::new(BackendState::default());
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
        }
    }
}

pub fn memory_tokens() -> Arc<dyn TokenStore> {
    Arc::new(StorageTokenStore::new(MemoryStorage::new()))
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/endpoints/", axum::routing::get(list_endpoints).post(create_endpoint))
        .route("/api/endpoints/:id/", delete(delete_endpoint))
        .route("/api/billing/create-checkout-session/", post(checkout))
        .with_state(state)
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        })),
    )
}

fn is_authorized(state: &BackendState, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", state.valid_access.lock().unwrap());
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        );
    }

    let tokens = json!({"access": INITIAL_ACCESS, "refresh": INITIAL_REFRESH});
    let mut response = match body["email"].as_str().unwrap_or_default() {
        "ops@acme.test" => json!({
            "tenant_schema": "acme",
            "tenant_name": "Acme",
            "tenant_domain": "acme.example.com"
        }),
        "dev@local.test" => json!({
            "tenant_schema": "dev",
            "tenant_name": "Local Dev",
            "tenant_domain": "localhost:5173"
        }),
        "multi@corp.test" => json!({
            "multiple_tenants": true,
            "tenants": [
                {
                    "tenant_schema": "acme",
                    "tenant_name": "Acme",
                    "tenant_domain": "acme.example.com"
                },
                {
                    "tenant_schema": "globex",
                    "tenant_name": "Globex",
                    "tenant_domain": "globex.example.com"
                }
            ]
        }),
        _ => json!({}),
    };

    if let (Some(target), Some(extra)) = (response.as_object_mut(), tokens.as_object()) {
        target.extend(extra.clone());
    }
    (StatusCode::OK, Json(response))
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "ops@acme.test" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"email": ["A user with this email already exists."]})),
        );
    }

    let slug = body["organization_name"]
        .as_str()
        .unwrap_or("tenant")
        .to_ascii_lowercase()
        .replace(' ', "-");
    (
        StatusCode::CREATED,
        Json(json!({
            "access": INITIAL_ACCESS,
            "refresh": INITIAL_REFRESH,
            "tenant_schema": slug,
            "tenant_name": body["organization_name"],
            "tenant_domain": format!("{slug}.example.com")
        })),
    )
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let valid = state.valid_refresh.lock().unwrap().clone();
    if body["refresh"] != valid.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        );
    }

    *state.valid_access.lock().unwrap() = REFRESHED_ACCESS.to_string();
    (StatusCode::OK, Json(json!({"access": REFRESHED_ACCESS})))
}

async fn list_endpoints(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !is_authorized(&state, &headers) {
        return unauthorized();
    }
    let endpoints = state.endpoints.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({
            "count": endpoints.len(),
            "next": null,
            "previous": null,
            "results": endpoints
        })),
    )
}

async fn create_endpoint(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !is_authorized(&state, &headers) {
        return unauthorized();
    }
    let mut endpoints = state.endpoints.lock().unwrap();
    let id = endpoints.len() as i64 + 1;
    let created = json!({
        "id": id,
        "name": body["name"],
        "url": body["url"],
        "interval_minutes": body["interval_minutes"],
        "is_active": true,
        "last_status": null
    });
    endpoints.push(created.clone());
    (StatusCode::CREATED, Json(created))
}

async fn delete_endpoint(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !is_authorized(&state, &headers) {
        return unauthorized().into_response();
    }
    let mut endpoints = state.endpoints.lock().unwrap();
    let before = endpoints.len();
    endpoints.retain(|e| e["id"] != id);
    if endpoints.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn checkout(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !is_authorized(&state, &headers) {
        return unauthorized();
    }
    if body["plan"] != "pro" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Unknown plan"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "checkout_url": "https://checkout.payments.test/c/pay/cs_test_123",
            "session_id": "cs_test_123"
        })),
    )
}
