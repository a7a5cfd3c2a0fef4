//! Audit enrichment middleware
//!
//! Tower layer that wraps every routed handler:
//! - Derives caller identity, session, and network origin from
//!   request headers, with sentinel defaults for appliance mode
//! - Buffers and hashes the request body, then reconstructs the
//!   request bit-identically for the inner handler
//! - Buffers and hashes the response body, then re-emits it
//! - Records exactly one event per request attempt, including
//!   cancelled and failed attempts
//! - Adds X-Request-ID and X-Audit-Timestamp response headers

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value as JsonValue};
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{debug, error, warn};
use uuid::Uuid;
use vigil_common::config::{AuditConfig, FailurePolicy};
use vigil_common::digest::sha256_hex;
use vigil_common::event::{AuditEvent, DEFAULT_USER_ID};
use vigil_store::AuditStore;

use super::classify;

/// Audit enrichment layer
#[derive(Clone)]
pub struct AuditLayer {
    store: Arc<dyn AuditStore>,
    config: Arc<AuditConfig>,
}

impl AuditLayer {
    pub fn new(store: Arc<dyn AuditStore>, config: Arc<AuditConfig>) -> Self {
        Self { store, config }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

/// Audit middleware service
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    store: Arc<dyn AuditStore>,
    config: Arc<AuditConfig>,
}

/// Records an abandonment event if the request future is dropped
/// before the normal recording path runs. Disarmed only once the
/// append has been dispatched, so exactly one of the two paths fires
/// per request attempt.
struct AbandonGuard {
    store: Arc<dyn AuditStore>,
    event: Option<AuditEvent>,
}

impl AbandonGuard {
    fn new(store: Arc<dyn AuditStore>, event: AuditEvent) -> Self {
        Self { store, event: Some(event) }
    }

    /// Replace the held event with a more complete snapshot
    fn update(&mut self, event: AuditEvent) {
        self.event = Some(event);
    }

    fn disarm(&mut self) {
        self.event = None;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if let Some(mut event) = self.event.take() {
            if let Some(obj) = event.details.as_object_mut() {
                obj.insert("outcome".to_string(), json!("cancelled"));
            }
            event.set_outcome(false, Some("request abandoned before completion"));

            let store = Arc::clone(&self.store);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = store.append(event).await {
                        error!(error = %e, "Failed to record abandonment event");
                    }
                });
            }
        }
    }
}

impl<S> Service<Request> for AuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let store = Arc::clone(&self.store);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            if !config.enabled || classify::is_excluded(&path) {
                return inner.call(request).await;
            }

            let headers = request.headers().clone();
            let user_id = header_value(&headers, "x-user-id")
                .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
            let session_id =
                header_value(&headers, "x-session-id").unwrap_or_else(|| Uuid::new_v4().to_string());
            let source_ip = client_ip(&headers, &request);

            let timestamp = Utc::now();
            let request_id = Uuid::new_v4().to_string();
            let started = Instant::now();

            // Buffer the request body so it can be hashed and replayed
            let (parts, body) = request.into_parts();
            let request_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(method = %method, path = %path, error = %e,
                        "Failed to buffer request body");
                    Bytes::new()
                },
            };

            let request_truncated = request_bytes.len() > config.max_capture_bytes;
            let request_hashed = &request_bytes[..request_bytes.len().min(config.max_capture_bytes)];
            let request_hash = sha256_hex(request_hashed);

            let request = Request::from_parts(parts, Body::from(request_bytes.clone()));

            let mut details = serde_json::Map::new();
            details.insert("method".to_string(), json!(method.to_string()));
            details.insert("path".to_string(), json!(path));
            details.insert("request_id".to_string(), json!(request_id));
            if request_truncated {
                details.insert("request_truncated".to_string(), json!(true));
            }
            if config.debug_capture {
                details.insert(
                    "request_body".to_string(),
                    json!(String::from_utf8_lossy(&request_bytes).to_string()),
                );
            }

            let mut event = AuditEvent::new(classify::classify(&method, &path))
                .with_timestamp(timestamp)
                .with_user(user_id)
                .with_session(session_id)
                .with_source_ip(source_ip)
                .with_request_hash(request_hash)
                .with_details(JsonValue::Object(details));

            // One event per attempt: if this future is cancelled
            // anywhere before the append is dispatched, the guard
            // records the attempt instead.
            let mut guard = AbandonGuard::new(Arc::clone(&store), event.clone());
            let response = inner.call(request).await?;

            let status = response.status();
            event.event_type = classify::refine_with_status(event.event_type, status);

            // Buffer the response body the same way
            let (mut parts, body) = response.into_parts();
            let response_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(method = %method, path = %path, error = %e,
                        "Failed to buffer response body");
                    Bytes::new()
                },
            };

            let response_truncated = response_bytes.len() > config.max_capture_bytes;
            let response_hashed =
                &response_bytes[..response_bytes.len().min(config.max_capture_bytes)];
            event.response_hash = sha256_hex(response_hashed);
            event.duration_ms = started.elapsed().as_secs_f64() * 1000.0;

            if let Some(obj) = event.details.as_object_mut() {
                obj.insert("status".to_string(), json!(status.as_u16()));
                if response_truncated {
                    obj.insert("response_truncated".to_string(), json!(true));
                }
                if config.debug_capture {
                    obj.insert(
                        "response_body".to_string(),
                        json!(String::from_utf8_lossy(&response_bytes).to_string()),
                    );
                }
            }

            let success = !(status.is_client_error() || status.is_server_error());
            let error_message = (!success).then(|| format!("HTTP {}", status.as_u16()));
            event.set_outcome(success, error_message.as_deref());

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                parts.headers.insert("x-request-id", value);
            }
            if let Ok(value) = HeaderValue::from_str(&timestamp.to_rfc3339()) {
                parts.headers.insert("x-audit-timestamp", value);
            }

            let response = Response::from_parts(parts, Body::from(response_bytes));

            // A cancellation from here on still records the enriched
            // snapshot rather than the request-only one.
            guard.update(event.clone());

            let result = match config.failure_policy {
                FailurePolicy::FailOpen => {
                    // Non-blocking, fire and forget
                    tokio::spawn(async move {
                        match store.append(event).await {
                            Ok(id) => {
                                debug!(audit_id = id, method = %method, path = %path,
                                    "Audit event recorded");
                            },
                            Err(e) => {
                                error!(error = %e, method = %method, path = %path,
                                    "Failed to record audit event");
                            },
                        }
                    });
                    Ok(response)
                },
                FailurePolicy::FailClosed => match store.append(event).await {
                    Ok(id) => {
                        debug!(audit_id = id, method = %method, path = %path,
                            "Audit event recorded");
                        Ok(response)
                    },
                    Err(e) => {
                        error!(error = %e, method = %method, path = %path,
                            "Failed to record audit event, failing request");
                        Ok((
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({
                                "error": {
                                    "message": "Audit store unavailable",
                                    "status": 500,
                                }
                            })),
                        )
                            .into_response())
                    },
                },
            };

            guard.disarm();
            result
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Best-effort client address: first X-Forwarded-For hop, then
/// X-Real-IP, then the socket peer address.
fn client_ip(headers: &HeaderMap, request: &Request) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return real_ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        http::Request as HttpRequest,
        routing::{get, post},
        Router,
    };
    use chrono::{DateTime, Utc};
    use tower::ServiceExt;
    use vigil_common::error::AuditError;
    use vigil_common::event::EventType;
    use vigil_store::{EventQuery, SqliteAuditStore};

    /// Store that rejects every operation
    struct FailingStore;

    #[async_trait]
    impl AuditStore for FailingStore {
        async fn append(&self, _event: AuditEvent) -> vigil_common::Result<i64> {
            Err(AuditError::storage("disk full"))
        }

        async fn query(&self, _query: &EventQuery) -> vigil_common::Result<Vec<AuditEvent>> {
            Err(AuditError::storage("disk full"))
        }

        async fn count(&self, _query: &EventQuery) -> vigil_common::Result<u64> {
            Err(AuditError::storage("disk full"))
        }

        async fn purge_older_than(&self, _cutoff: DateTime<Utc>) -> vigil_common::Result<u64> {
            Err(AuditError::storage("disk full"))
        }
    }

    async fn echo_handler(body: String) -> String {
        format!("echo:{}", body)
    }

    async fn forbidden_handler() -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn test_config() -> AuditConfig {
        // FailClosed makes the append synchronous with the response,
        // so tests can assert on the store without sleeping.
        AuditConfig { failure_policy: FailurePolicy::FailClosed, ..AuditConfig::default() }
    }

    fn test_router(store: Arc<dyn AuditStore>, config: AuditConfig) -> Router {
        Router::new()
            .route("/api/v1/query/sql", post(echo_handler))
            .route("/api/v1/data/upload", post(echo_handler))
            .route("/api/v1/data/forbidden", get(forbidden_handler))
            .route("/health", get(|| async { "ok" }))
            .layer(AuditLayer::new(store, Arc::new(config)))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_one_event_per_request() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::QuerySql);
    }

    #[tokio::test]
    async fn test_abandoned_request_records_cancellation() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = Router::new()
            .route(
                "/api/v1/query/sql",
                post(|| async {
                    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                    "late"
                }),
            )
            .layer(AuditLayer::new(
                store.clone() as Arc<dyn AuditStore>,
                Arc::new(test_config()),
            ));

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), app.oneshot(request))
                .await;
        assert!(result.is_err(), "request should have been abandoned");

        // The drop path appends from a spawned task; give it a moment
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::QuerySql);
        assert_eq!(events[0].details["outcome"], json!("cancelled"));
        assert_eq!(events[0].details["success"], json!(false));
    }

    #[tokio::test]
    async fn test_hashes_match_known_bodies() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request_body = "SELECT * FROM patients";
        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from(request_body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let response_body = body_string(response).await;
        assert_eq!(response_body, "echo:SELECT * FROM patients");

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events[0].request_hash, sha256_hex(request_body.as_bytes()));
        assert_eq!(events[0].response_hash, sha256_hex(response_body.as_bytes()));
    }

    #[tokio::test]
    async fn test_response_passes_through_bit_identical() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request = HttpRequest::post("/api/v1/data/upload")
            .body(Body::from("col1,col2\n1,2\n"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-audit-timestamp"));
        assert_eq!(body_string(response).await, "echo:col1,col2\n1,2\n");
    }

    #[tokio::test]
    async fn test_excluded_route_records_nothing() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request = HttpRequest::get("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-request-id"));

        assert_eq!(store.count(&EventQuery::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disabled_records_nothing() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let config = AuditConfig { enabled: false, ..test_config() };
        let app = test_router(store.clone(), config);

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        app.oneshot(request).await.unwrap();

        assert_eq!(store.count(&EventQuery::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_request_still_recorded() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request =
            HttpRequest::get("/api/v1/data/forbidden").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::AccessDenied);
        assert_eq!(events[0].details["success"], json!(false));
        assert_eq!(events[0].details["status"], json!(403));
    }

    #[tokio::test]
    async fn test_header_context_extraction() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request = HttpRequest::post("/api/v1/query/sql")
            .header("x-user-id", "analyst-9")
            .header("x-session-id", "sess-abc")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::from("SELECT 1"))
            .unwrap();
        app.oneshot(request).await.unwrap();

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events[0].user_id, "analyst-9");
        assert_eq!(events[0].session_id, "sess-abc");
        assert_eq!(events[0].source_ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_missing_headers_use_defaults() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        app.oneshot(request).await.unwrap();

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events[0].user_id, DEFAULT_USER_ID);
        // Generated session correlator is a UUID
        assert!(Uuid::parse_str(&events[0].session_id).is_ok());
    }

    #[tokio::test]
    async fn test_debug_capture_gates_raw_bodies() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let app = test_router(store.clone(), test_config());

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        app.oneshot(request).await.unwrap();

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert!(events[0].details.get("request_body").is_none());
        assert!(events[0].details.get("response_body").is_none());

        let store2 = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let config = AuditConfig { debug_capture: true, ..test_config() };
        let app = test_router(store2.clone(), config);

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        app.oneshot(request).await.unwrap();

        let events = store2.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events[0].details["request_body"], json!("SELECT 1"));
        assert_eq!(events[0].details["response_body"], json!("echo:SELECT 1"));
    }

    #[tokio::test]
    async fn test_oversized_body_hashes_capped_prefix() {
        let store = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
        let config = AuditConfig { max_capture_bytes: 8, ..test_config() };
        let app = test_router(store.clone(), config);

        let body = "0123456789abcdef";
        let request =
            HttpRequest::post("/api/v1/query/sql").body(Body::from(body)).unwrap();
        let response = app.oneshot(request).await.unwrap();

        // Handler still sees the full body
        assert_eq!(body_string(response).await, format!("echo:{}", body));

        let events = store.query(&EventQuery::default()).await.unwrap();
        assert_eq!(events[0].request_hash, sha256_hex(&body.as_bytes()[..8]));
        assert_eq!(events[0].details["request_truncated"], json!(true));
    }

    #[tokio::test]
    async fn test_fail_open_store_failure_does_not_fail_request() {
        let store: Arc<dyn AuditStore> = Arc::new(FailingStore);
        let config = AuditConfig { failure_policy: FailurePolicy::FailOpen, ..AuditConfig::default() };
        let app = test_router(store, config);

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "echo:SELECT 1");
    }

    #[tokio::test]
    async fn test_fail_closed_store_failure_returns_500() {
        let store: Arc<dyn AuditStore> = Arc::new(FailingStore);
        let app = test_router(store, test_config());

        let request = HttpRequest::post("/api/v1/query/sql")
            .body(Body::from("SELECT 1"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
