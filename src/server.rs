//! HTTP read API.
//!
//! Serves stored items and aggregate stats, and the ask operation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/items` | Items by `min_score`, `source`, `limit`, newest first |
//! | `GET`  | `/api/items/today` | Today's qualified items, best first (max 50) |
//! | `GET`  | `/api/items/{id}` | One item |
//! | `POST` | `/api/items/{id}/ask` | Ask a question about an item |
//! | `GET`  | `/api/stats` | Totals, average score, per-source counts, pass rate |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "item not found: 42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error` (502),
//! `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::ask::{ask_about_item, AskResponse};
use crate::error::{AskError, StoreError};
use crate::models::{Stats, StoredItem};
use crate::store::{ItemQuery, ItemStore};
use crate::traits::Scorer;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;
const TODAY_LIMIT: i64 = 50;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub scorer: Arc<dyn Scorer>,
    /// Qualification threshold used for defaults, today's view, and stats.
    pub threshold: i64,
}

/// Build the router (without binding), for embedding and tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/items", get(handle_list_items))
        .route("/api/items/today", get(handle_today_items))
        .route("/api/items/{id}", get(handle_get_item))
        .route("/api/items/{id}/ask", post(handle_ask))
        .route("/api/stats", get(handle_stats))
        .layer(cors)
        .with_state(state)
}

/// Bind `bind_addr` and serve until `shutdown` reads `true`.
pub async fn run_server(
    bind_addr: &str,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("HTTP server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    // Sender gone: keep serving until the process exits.
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "store error");
        internal(err.to_string())
    }
}

impl From<AskError> for AppError {
    fn from(err: AskError) -> Self {
        match err {
            AskError::EmptyQuestion => bad_request(err.to_string()),
            AskError::NotFound(_) => not_found(err.to_string()),
            AskError::Scoring(e) => upstream_error(format!("AI error: {}", e)),
            AskError::Store(e) => e.into(),
        }
    }
}

fn parse_i64(params: &HashMap<String, String>, key: &str) -> Result<Option<i64>, AppError> {
    match params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| bad_request(format!("{} must be an integer", key))),
    }
}

fn parse_item_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| bad_request("invalid item id"))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "info-sieve",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /api/items ============

#[derive(Serialize)]
struct ItemListResponse {
    items: Vec<StoredItem>,
    count: usize,
}

impl From<Vec<StoredItem>> for ItemListResponse {
    fn from(items: Vec<StoredItem>) -> Self {
        let count = items.len();
        Self { items, count }
    }
}

/// Query: `min_score` (default: threshold), `source`, `limit` (default 50).
async fn handle_list_items(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ItemListResponse>, AppError> {
    let min_score = parse_i64(&params, "min_score")?.unwrap_or(state.threshold);
    let limit = parse_i64(&params, "limit")?
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);
    let source = params
        .get("source")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let items = state
        .store
        .list_items(&ItemQuery {
            min_score,
            source,
            limit,
        })
        .await?;

    Ok(Json(items.into()))
}

// ============ GET /api/items/today ============

async fn handle_today_items(
    State(state): State<AppState>,
) -> Result<Json<ItemListResponse>, AppError> {
    let items = state.store.today_items(state.threshold, TODAY_LIMIT).await?;
    Ok(Json(items.into()))
}

// ============ GET /api/items/{id} ============

async fn handle_get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredItem>, AppError> {
    let id = parse_item_id(&id)?;
    state
        .store
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("item not found: {}", id)))
}

// ============ POST /api/items/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let id = parse_item_id(&id)?;
    let Json(req) = body.map_err(|_| bad_request("question is required"))?;

    let response =
        ask_about_item(state.store.as_ref(), state.scorer.as_ref(), id, &req.question).await?;
    Ok(Json(response))
}

// ============ GET /api/stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.store.stats(state.threshold).await?))
}
