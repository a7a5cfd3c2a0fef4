//! HTTP API surface
//!
//! The protected routes are deliberately thin; they exist as hosts
//! for the audit layer. The audit read endpoint is the one route with
//! real behavior, exposing the store's query path.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use vigil_common::event::EventType;
use vigil_store::EventQuery;

use crate::audit::AuditLayer;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Build the application router with the full middleware stack
pub fn create_router(state: AppState) -> Router {
    let audit_layer =
        AuditLayer::new(state.store.clone(), state.audit_config.clone());

    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
        .route("/api/v1/query/natural", post(query_natural))
        .route("/api/v1/query/sql", post(query_sql))
        .route("/api/v1/query/semantic", post(query_semantic))
        .route("/api/v1/data/upload", post(data_upload))
        .route("/api/v1/data/:table", get(data_view).delete(data_delete))
        .route("/api/v1/schema", get(schema_view))
        .route("/api/v1/knowledge", get(knowledge_view).post(knowledge_update))
        .route("/api/v1/audit/events", get(list_audit_events))
        .with_state(state)
        // Applied outermost so every routed request is intercepted
        .layer(TraceLayer::new_for_http())
        .layer(audit_layer)
}

/// Health check handler (excluded from auditing)
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    match state.store.count(&EventQuery::default().with_limit(1)).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": "available"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Store health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

async fn version() -> impl IntoResponse {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

async fn query_natural(Json(request): Json<QueryRequest>) -> impl IntoResponse {
    Json(json!({
        "status": "accepted",
        "mode": "natural",
        "query_length": request.query.len(),
    }))
}

async fn query_sql(Json(request): Json<QueryRequest>) -> impl IntoResponse {
    Json(json!({
        "status": "accepted",
        "mode": "sql",
        "query_length": request.query.len(),
    }))
}

async fn query_semantic(Json(request): Json<QueryRequest>) -> impl IntoResponse {
    Json(json!({
        "status": "accepted",
        "mode": "semantic",
        "query_length": request.query.len(),
    }))
}

async fn data_upload(body: Bytes) -> impl IntoResponse {
    Json(json!({
        "status": "accepted",
        "bytes_received": body.len(),
    }))
}

async fn data_view(Path(table): Path<String>) -> impl IntoResponse {
    Json(json!({
        "table": table,
        "rows": [],
    }))
}

async fn data_delete(Path(table): Path<String>) -> impl IntoResponse {
    Json(json!({
        "status": "deleted",
        "table": table,
    }))
}

async fn schema_view() -> impl IntoResponse {
    Json(json!({ "tables": [] }))
}

async fn knowledge_view() -> impl IntoResponse {
    Json(json!({ "entries": [] }))
}

async fn knowledge_update(body: Bytes) -> impl IntoResponse {
    Json(json!({
        "status": "accepted",
        "bytes_received": body.len(),
    }))
}

const DEFAULT_EVENTS_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct AuditEventsParams {
    limit: Option<usize>,
    event_type: Option<String>,
    user_id: Option<String>,
}

/// Query recent audit events
async fn list_audit_events(
    State(state): State<AppState>,
    Query(params): Query<AuditEventsParams>,
) -> AppResult<Response> {
    let mut query = EventQuery::default().with_limit(params.limit.unwrap_or(DEFAULT_EVENTS_LIMIT));

    if let Some(ref raw) = params.event_type {
        let event_type: EventType = raw
            .parse()
            .map_err(|e: String| AppError::Validation(e))?;
        query = query.with_event_type(event_type);
    }

    if let Some(user_id) = params.user_id {
        query = query.with_user(user_id);
    }

    let events = state.store.query(&query).await?;

    Ok((StatusCode::OK, Json(json!({ "data": events }))).into_response())
}
