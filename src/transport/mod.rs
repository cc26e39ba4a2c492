//! Network transports: Streamable HTTP and SSE, served by one axum app.
//!
//! stdio is served by tower-mcp's own `StdioTransport`. The network
//! transports live here because each request must run inside its own
//! credential scope (see [`guard`]).
//!
//! Every MCP session gets a fresh [`McpRouter`] from a [`RouterFactory`]:
//! router clones share their session state, so one client's `initialize`
//! must never be visible to another.

pub mod guard;
pub mod http;
pub mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde_json::Value;
use tower_mcp::error::JsonRpcError;
use tower_mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpNotification};
use tower_mcp::{JsonRpcService, McpRouter};

use crate::auth::Authenticator;
use crate::config::{Settings, TransportKind};
use crate::error::{Error, Result};
use guard::GuardState;

/// Builds a router for a new MCP session
pub type RouterFactory = Arc<dyn Fn() -> tower_mcp::Result<McpRouter> + Send + Sync>;

/// Build a session router, logging failures.
pub(crate) fn new_session_router(factory: &RouterFactory) -> Option<McpRouter> {
    match factory() {
        Ok(router) => Some(router),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build session router");
            None
        }
    }
}

/// Run one parsed JSON-RPC message through a session router.
///
/// Notifications produce no response. Batches are rejected.
pub(crate) async fn dispatch(router: &McpRouter, message: Value) -> Option<JsonRpcResponse> {
    if !message.is_object() {
        let reason = if message.is_array() {
            "Batch requests are not supported"
        } else {
            "Expected a JSON-RPC message object"
        };
        return Some(JsonRpcResponse::error(None, JsonRpcError::invalid_request(reason)));
    }

    if message.get("id").is_none() {
        if let Ok(notification) = serde_json::from_value::<JsonRpcNotification>(message)
            && let Ok(notification) = McpNotification::from_jsonrpc(&notification)
        {
            router.handle_notification(notification);
        }
        return None;
    }

    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                JsonRpcError::parse_error(format!("Invalid request: {}", e)),
            ));
        }
    };

    let mut service = JsonRpcService::new(router.clone());
    Some(match service.call_single(request).await {
        Ok(response) => response,
        Err(e) => JsonRpcResponse::error(None, JsonRpcError::internal_error(e.to_string())),
    })
}

/// Whether a parsed message is an `initialize` request
pub(crate) fn is_initialize(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some("initialize")
}

/// Build the axum app for the enabled network transports.
///
/// Streamable HTTP answers at `/mcp`; SSE lives under the mount path.
/// Each transport sits behind the credential guard.
pub fn build_app(settings: &Settings, factory: RouterFactory, auth: Arc<Authenticator>) -> Router {
    let mut app = Router::new();

    if settings.transports.contains(&TransportKind::StreamableHttp) {
        let streamable = http::StreamableHttp::new(factory.clone()).into_router();
        app = app.merge(guarded(streamable, TransportKind::StreamableHttp, &auth));
    }

    if settings.transports.contains(&TransportKind::Sse) {
        let sse = sse::SseTransport::new(factory, settings).into_router();
        app = app.merge(guarded(sse, TransportKind::Sse, &auth));
    }

    app
}

fn guarded(router: Router, transport: TransportKind, auth: &Arc<Authenticator>) -> Router {
    router.layer(axum::middleware::from_fn_with_state(
        GuardState {
            transport,
            auth: auth.clone(),
        },
        guard::require_credentials,
    ))
}

/// Serve the network transports until the listener fails.
pub async fn serve(settings: &Settings, factory: RouterFactory, auth: Arc<Authenticator>) -> Result<()> {
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(
        address = %addr,
        transports = ?settings.enabled_transports(),
        streamable_http = %crate::config::STREAMABLE_HTTP_PATH,
        sse = %settings.sse_stream_path(),
        "MCP HTTP server listening"
    );

    let app = build_app(settings, factory, auth);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| Error::Transport(format!("Server error: {}", e)))
}
