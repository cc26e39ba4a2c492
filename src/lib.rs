//! # xiaoya-teacher-mcp
//!
//! An MCP server exposing the Xiaoya teaching platform's teacher API
//! (course groups, tasks, questions, attendance, grading and resources) as
//! tools an assistant can call.
//!
//! The server speaks MCP over stdio, and optionally over Streamable HTTP and
//! legacy SSE at the same time. Credentials follow the transport:
//!
//! - stdio uses one process-wide token, from `XIAOYA_AUTH_TOKEN` or a login
//!   with `XIAOYA_ACCOUNT` / `XIAOYA_PASSWORD`
//! - every HTTP request carries its own `Authorization` header, or
//!   `x-xiaoya-account` + `x-xiaoya-password`
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xiaoya_teacher_mcp::{AppState, Settings, build_router};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let state = Arc::new(AppState::new(Settings::default())?);
//! let router = build_router(&state)?;
//! tower_mcp::StdioTransport::new(router).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod response;
pub mod secret;
pub mod state;
pub mod tools;
pub mod transport;
pub mod types;

use std::sync::Arc;

use tower_mcp::McpRouter;

pub use config::{Args, Settings, TransportKind};
pub use error::{Error, Result};
pub use state::AppState;

/// Server name reported during `initialize`
pub const SERVER_NAME: &str = "xiaoya-teacher-mcp";

const INSTRUCTIONS: &str = "\
Tools for teachers on the Xiaoya teaching platform.

Start with query_teacher_groups to find a course group. Its group_id leads to \
classes and students (query_group_classes, query_class_students), tasks \
(query_group_tasks), attendance (query_attendance_sessions) and resources \
(query_course_resources). A task's paper_id and publish_id lead to answer \
sheets (query_test_result, query_preview_student_paper) and questions \
(query_paper_questions).

Every tool answers with {success, message, data}. Use server_status and \
auth_status to check transports and credentials.";

/// Build an MCP router carrying every tool.
///
/// Each call yields an independent router; network transports build one per
/// session.
pub fn build_router(state: &Arc<AppState>) -> tower_mcp::Result<McpRouter> {
    let tools = tools::build_tools(state)?;
    Ok(McpRouter::new()
        .server_info(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .instructions(INSTRUCTIONS)
        .tools(tools))
}
