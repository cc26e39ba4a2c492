//! Server and authentication status tools

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tower_mcp::{CallToolResult, Tool, ToolBuilder};

use crate::config::{STREAMABLE_HTTP_PATH, Settings};
use crate::response::{respond, success};
use crate::state::AppState;

/// Endpoint paths of the network transports
#[derive(Debug, Serialize)]
pub struct TransportPaths {
    pub streamable_http: &'static str,
    pub sse_stream: String,
    pub sse_messages: String,
}

/// Transport summary returned by `server_status`
#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub transports: Vec<&'static str>,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    pub paths: TransportPaths,
}

impl ServerStatus {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            transports: settings.enabled_transports(),
            base_url: settings.base_url(),
            paths: TransportPaths {
                streamable_http: STREAMABLE_HTTP_PATH,
                sse_stream: settings.sse_stream_path(),
                sse_messages: settings.sse_message_path(),
            },
        }
    }
}

/// Input for `auth_status`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AuthStatusInput {
    /// Log in again with the known account and password, replacing the current token
    #[serde(default)]
    pub refresh: bool,
}

pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    Ok(vec![
        build_server_status_tool(state.clone())?,
        build_auth_status_tool(state.clone())?,
    ])
}

fn build_server_status_tool(state: Arc<AppState>) -> tower_mcp::Result<Tool> {
    ToolBuilder::new("server_status")
        .description(
            "Report the enabled transports, base URL, port and endpoint paths of this server",
        )
        .read_only()
        .idempotent()
        .handler_with_state_no_params(state, |state: Arc<AppState>| async move {
            Ok(success(
                ServerStatus::from_settings(&state.settings),
                "Server status loaded",
            ))
        })
}

fn build_auth_status_tool(state: Arc<AppState>) -> tower_mcp::Result<Tool> {
    ToolBuilder::new("auth_status")
        .description(
            "Report the platform credentials in effect for this request. \
             With refresh=true, log in again using the configured (stdio) or \
             header-supplied (HTTP) account and password.",
        )
        .handler_with_state(
            state,
            |state: Arc<AppState>, input: AuthStatusInput| async move {
                Ok(auth_status(&state, input.refresh).await)
            },
        )
        .build()
}

async fn auth_status(state: &AppState, refresh: bool) -> CallToolResult {
    respond(
        state.auth().status(refresh).await,
        "Authentication status loaded",
        "Failed to load or refresh authentication status",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportKind;

    #[test]
    fn test_server_status_paths() {
        let mut settings = Settings::default();
        settings.transports.insert(TransportKind::StreamableHttp);
        settings.transports.insert(TransportKind::Sse);
        settings.mount_path = "/teacher".into();
        settings.port = 9100;

        let value = serde_json::to_value(ServerStatus::from_settings(&settings)).unwrap();
        assert_eq!(
            value["transports"],
            serde_json::json!(["stdio", "sse", "streamable-http"])
        );
        assert_eq!(value["baseUrl"], "http://127.0.0.1:9100");
        assert_eq!(value["paths"]["streamable_http"], "/mcp");
        assert_eq!(value["paths"]["sse_stream"], "/teacher/sse");
        assert_eq!(value["paths"]["sse_messages"], "/teacher/messages/");
    }

    #[test]
    fn test_root_mount_paths() {
        let mut settings = Settings::default();
        settings.mount_path = "/".into();
        let status = ServerStatus::from_settings(&settings);
        assert_eq!(status.transports, vec!["stdio"]);
        assert_eq!(status.paths.sse_stream, "/sse");
        assert_eq!(status.paths.sse_messages, "/messages/");
    }
}
