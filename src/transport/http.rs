//! Streamable HTTP transport
//!
//! A single `/mcp` endpoint:
//! - `POST` carries JSON-RPC messages; `initialize` opens a session whose id
//!   comes back in the `mcp-session-id` header, later requests must send it
//! - `DELETE` ends a session
//! - `GET` is not offered; this server sends no unsolicited messages
//!
//! Idle sessions expire after a TTL and are swept in the background.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::sync::RwLock;
use tower_mcp::McpRouter;
use tower_mcp::error::JsonRpcError;
use tower_mcp::protocol::{JsonRpcResponse, SUPPORTED_PROTOCOL_VERSIONS};

use super::{RouterFactory, dispatch, is_initialize, new_session_router};
use crate::config::STREAMABLE_HTTP_PATH;

/// Header name for MCP session ID
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

/// Header name for MCP protocol version
pub const MCP_PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Default session TTL: 30 minutes
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Default maximum number of sessions
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct Session {
    id: String,
    router: McpRouter,
    /// Last activity, milliseconds since UNIX epoch
    last_accessed: AtomicU64,
}

impl Session {
    fn new(router: McpRouter) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            router,
            last_accessed: AtomicU64::new(current_timestamp_ms()),
        }
    }

    fn touch(&self) {
        self.last_accessed
            .store(current_timestamp_ms(), Ordering::Relaxed);
    }

    fn is_expired(&self, ttl_ms: u64) -> bool {
        let last = self.last_accessed.load(Ordering::Relaxed);
        current_timestamp_ms().saturating_sub(last) > ttl_ms
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug)]
struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    ttl_ms: u64,
    max_sessions: usize,
}

impl SessionStore {
    fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl_ms: ttl.as_millis() as u64,
            max_sessions,
        }
    }

    async fn create(&self, router: McpRouter) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            tracing::warn!(
                max = self.max_sessions,
                "Session limit reached, rejecting new session"
            );
            return None;
        }
        let session = Arc::new(Session::new(router));
        sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, total = sessions.len(), "Created session");
        Some(session)
    }

    async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id)?;
        if session.is_expired(self.ttl_ms) {
            tracing::debug!(session_id = %id, "Session expired on access");
            return None;
        }
        session.touch();
        Some(session.clone())
    }

    async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Removed session");
        }
        removed
    }

    async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.ttl_ms));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(
                removed = removed,
                remaining = sessions.len(),
                "Cleaned up expired sessions"
            );
        }
        removed
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

struct HttpState {
    factory: RouterFactory,
    sessions: SessionStore,
}

/// Streamable HTTP transport over per-session routers
pub struct StreamableHttp {
    factory: RouterFactory,
    session_ttl: Duration,
    max_sessions: usize,
}

impl StreamableHttp {
    pub fn new(factory: RouterFactory) -> Self {
        Self {
            factory,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Build the axum router and start the session sweeper.
    pub fn into_router(self) -> Router {
        let state = Arc::new(HttpState {
            factory: self.factory,
            sessions: SessionStore::new(self.session_ttl, self.max_sessions),
        });

        let cleanup_state = state.clone();
        let cleanup_interval = (self.session_ttl / 2).max(Duration::from_secs(60));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            loop {
                interval.tick().await;
                cleanup_state.sessions.cleanup_expired().await;
            }
        });

        Router::new()
            .route(
                STREAMABLE_HTTP_PATH,
                post(handle_post).get(handle_get).delete(handle_delete),
            )
            .with_state(state)
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let parsed: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return json_rpc_error_response(JsonRpcError::parse_error(format!(
                "Invalid JSON: {}",
                e
            )));
        }
    };

    let is_init = is_initialize(&parsed);
    let session = if is_init {
        let Some(router) = new_session_router(&state.factory) else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        match state.sessions.create(router).await {
            Some(s) => s,
            None => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Server at capacity, try again later",
                )
                    .into_response();
            }
        }
    } else {
        let Some(session_id) = header_text(&headers, MCP_SESSION_ID_HEADER) else {
            return (StatusCode::BAD_REQUEST, "Missing MCP-Session-Id header").into_response();
        };
        match state.sessions.get(&session_id).await {
            Some(s) => s,
            None => {
                return (StatusCode::NOT_FOUND, "Session not found or expired").into_response();
            }
        }
    };

    if !is_init
        && let Some(version) = header_text(&headers, MCP_PROTOCOL_VERSION_HEADER)
        && !SUPPORTED_PROTOCOL_VERSIONS.contains(&version.as_str())
    {
        return (
            StatusCode::BAD_REQUEST,
            format!("Unsupported protocol version: {}", version),
        )
            .into_response();
    }

    let Some(response) = dispatch(&session.router, parsed).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut resp = axum::Json(response).into_response();
    if is_init && let Ok(value) = HeaderValue::from_str(&session.id) {
        resp.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
    }
    resp
}

async fn handle_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "This server does not open server-to-client streams",
    )
        .into_response()
}

async fn handle_delete(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> Response {
    let Some(session_id) = header_text(&headers, MCP_SESSION_ID_HEADER) else {
        return (StatusCode::BAD_REQUEST, "Missing MCP-Session-Id header").into_response();
    };
    if state.sessions.remove(&session_id).await {
        tracing::info!(session_id = %session_id, "Session terminated");
        StatusCode::OK.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Session not found").into_response()
    }
}

fn json_rpc_error_response(error: JsonRpcError) -> Response {
    axum::Json(JsonRpcResponse::error(None, error)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn factory() -> RouterFactory {
        Arc::new(|| Ok::<_, tower_mcp::Error>(McpRouter::new().server_info("test-server", "1.0.0")))
    }

    fn post_json(body: serde_json::Value, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(STREAMABLE_HTTP_PATH)
            .header("Content-Type", "application/json");
        if let Some(id) = session {
            builder = builder.header(MCP_SESSION_ID_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn initialize() -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            }
        })
    }

    #[tokio::test]
    async fn test_initialize_creates_session() {
        let app = StreamableHttp::new(factory()).into_router();
        let response = app.oneshot(post_json(initialize(), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(MCP_SESSION_ID_HEADER));
    }

    #[tokio::test]
    async fn test_request_without_session_fails() {
        let app = StreamableHttp::new(factory()).into_router();
        let request = post_json(
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
            None,
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = StreamableHttp::new(factory()).into_router();
        let request = post_json(
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
            Some("no-such-session"),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let app = StreamableHttp::new(factory()).into_router();
        let request = Request::builder()
            .method("POST")
            .uri(STREAMABLE_HTTP_PATH)
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_notification_is_accepted_and_delete_ends_session() {
        let app = StreamableHttp::new(factory()).into_router();
        let response = app.clone().oneshot(post_json(initialize(), None)).await.unwrap();
        let session_id = response.headers()[MCP_SESSION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();

        let notification = post_json(
            serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            Some(&session_id),
        );
        let response = app.clone().oneshot(notification).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let delete = Request::builder()
            .method("DELETE")
            .uri(STREAMABLE_HTTP_PATH)
            .header(MCP_SESSION_ID_HEADER, &session_id)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = post_json(
            serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            Some(&session_id),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_batch_is_invalid_request() {
        let app = StreamableHttp::new(factory()).into_router();
        let response = app.clone().oneshot(post_json(initialize(), None)).await.unwrap();
        let session_id = response.headers()[MCP_SESSION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();

        let batch = post_json(
            serde_json::json!([
                {"jsonrpc": "2.0", "id": 2, "method": "ping"},
                {"jsonrpc": "2.0", "id": 3, "method": "tools/list"}
            ]),
            Some(&session_id),
        );
        let response = app.oneshot(batch).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let app = StreamableHttp::new(factory()).into_router();
        let request = Request::builder()
            .method("GET")
            .uri(STREAMABLE_HTTP_PATH)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(Duration::from_secs(60), 10);
        let make = factory();
        let a = store.create(make().unwrap()).await.unwrap();
        let b = store.create(make().unwrap()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let store = SessionStore::new(Duration::from_secs(60), 1);
        assert!(store.create(factory()().unwrap()).await.is_some());
        assert!(store.create(factory()().unwrap()).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_swept() {
        let store = SessionStore::new(Duration::from_millis(0), 10);
        let session = store.create(factory()().unwrap()).await.unwrap();
        session.last_accessed.store(0, Ordering::Relaxed);
        assert!(store.get(&session.id).await.is_none());
        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 0);
    }
}
