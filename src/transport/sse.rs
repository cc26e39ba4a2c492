//! Legacy HTTP+SSE transport
//!
//! - `GET {mount}/sse` opens an event stream. Its first `endpoint` event
//!   names the URL to post messages to, with the session id as a query
//!   parameter.
//! - `POST {mount}/messages/?session_id=…` accepts one JSON-RPC message and
//!   answers `202 Accepted` at once; the message is processed in the
//!   background and its JSON-RPC response arrives on the stream as a
//!   `message` event.
//!
//! A session lives as long as its stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_mcp::McpRouter;

use super::{RouterFactory, dispatch, new_session_router};
use crate::config::Settings;

/// SSE event announcing the message endpoint
const SSE_ENDPOINT_EVENT: &str = "endpoint";

/// SSE event type for JSON-RPC messages
const SSE_MESSAGE_EVENT: &str = "message";

/// Buffered responses per stream
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct SseSession {
    router: McpRouter,
    outbound: mpsc::Sender<String>,
}

struct SseState {
    factory: RouterFactory,
    message_path: String,
    sessions: RwLock<HashMap<String, Arc<SseSession>>>,
}

/// Removes its session from the table when the stream is dropped
struct SessionGuard {
    state: Arc<SseState>,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let state = self.state.clone();
        let id = std::mem::take(&mut self.id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if state.sessions.write().await.remove(&id).is_some() {
                    tracing::debug!(session_id = %id, "SSE stream closed");
                }
            });
        }
    }
}

/// SSE transport under the configured mount path
pub struct SseTransport {
    factory: RouterFactory,
    stream_path: String,
    message_path: String,
}

impl SseTransport {
    pub fn new(factory: RouterFactory, settings: &Settings) -> Self {
        Self {
            factory,
            stream_path: settings.sse_stream_path(),
            message_path: settings.sse_message_path(),
        }
    }

    pub fn into_router(self) -> Router {
        let state = Arc::new(SseState {
            factory: self.factory,
            message_path: self.message_path.clone(),
            sessions: RwLock::new(HashMap::new()),
        });
        Router::new()
            .route(&self.stream_path, get(handle_stream))
            .route(&self.message_path, post(handle_message))
            .with_state(state)
    }
}

async fn handle_stream(State(state): State<Arc<SseState>>) -> Response {
    let Some(router) = new_session_router(&state.factory) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let id = uuid::Uuid::new_v4().simple().to_string();
    let (outbound, inbound) = mpsc::channel(CHANNEL_CAPACITY);
    let session = Arc::new(SseSession { router, outbound });
    state
        .sessions
        .write()
        .await
        .insert(id.clone(), session);
    tracing::debug!(session_id = %id, "SSE stream opened");

    let endpoint = format!("{}?session_id={}", state.message_path, id);
    let guard = SessionGuard { state, id };

    let first = tokio_stream::once(Event::default().event(SSE_ENDPOINT_EVENT).data(endpoint));
    let messages = ReceiverStream::new(inbound)
        .map(|msg| Event::default().event(SSE_MESSAGE_EVENT).data(msg));
    let stream = first.chain(messages).map(move |event| {
        let _session = &guard;
        Ok::<_, Infallible>(event)
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

async fn handle_message(
    State(state): State<Arc<SseState>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Some(session) = state.sessions.read().await.get(&session_id).cloned() else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let parsed: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("Could not parse message: {}", e))
                .into_response();
        }
    };

    // The response travels over the stream; answer the POST right away.
    let auth = crate::auth::current_request();
    tokio::spawn(crate::auth::within(auth, async move {
        let Some(response) = dispatch(&session.router, parsed).await else {
            return;
        };
        let text = match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                return;
            }
        };
        if session.outbound.send(text).await.is_err() {
            tracing::debug!(session_id = %session_id, "SSE stream gone, dropping response");
            state.sessions.write().await.remove(&session_id);
        }
    }));

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
