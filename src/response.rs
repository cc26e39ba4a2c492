//! Uniform result envelope returned by every tool
//!
//! ```json
//! {"success": true, "message": "...", "data": ...}
//! {"success": false, "message": "...: <cause>"}
//! ```

use std::fmt::Display;

use serde::Serialize;
use serde_json::{Value, json};
use tower_mcp::CallToolResult;

/// Successful tool result carrying `data`
pub fn success(data: impl Serialize, message: &str) -> CallToolResult {
    let data = match serde_json::to_value(data) {
        Ok(value) => value,
        Err(e) => return failure(message, Some(e)),
    };
    CallToolResult::json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

/// Failed tool result. The cause, if any, is appended to the message.
pub fn failure(message: &str, cause: Option<impl Display>) -> CallToolResult {
    let message = match cause {
        Some(cause) => format!("{}: {}", message, cause),
        None => message.to_string(),
    };
    tracing::debug!(message = %message, "Tool returned failure");
    let mut result = CallToolResult::json(json!({
        "success": false,
        "message": message,
    }));
    result.is_error = true;
    result
}

/// Map a fallible tool body onto the envelope.
pub fn respond<T: Serialize>(
    result: crate::error::Result<T>,
    ok_message: &str,
    err_message: &str,
) -> CallToolResult {
    match result {
        Ok(data) => success(data, ok_message),
        Err(e) => failure(err_message, Some(e)),
    }
}

/// Parse the JSON payload of an envelope produced by this module.
pub fn envelope_of(result: &CallToolResult) -> Option<Value> {
    result.content.iter().find_map(|content| match content {
        tower_mcp::Content::Text { text, .. } => serde_json::from_str(text).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let result = success(json!({"id": 1}), "loaded");
        assert!(!result.is_error);
        let body = envelope_of(&result).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "loaded");
        assert_eq!(body["data"]["id"], 1);
    }

    #[test]
    fn test_failure_envelope_appends_cause() {
        let result = failure("query failed", Some("timeout"));
        assert!(result.is_error);
        let body = envelope_of(&result).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "query failed: timeout");
    }

    #[test]
    fn test_failure_without_cause() {
        let result = failure("no token", None::<String>);
        let body = envelope_of(&result).unwrap();
        assert_eq!(body["message"], "no token");
    }
}
