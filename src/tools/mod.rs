//! Tool definitions
//!
//! Each module groups the tools of one area of the platform. Handlers never
//! fail the JSON-RPC call: platform and validation errors come back as a
//! `{"success": false, ...}` envelope (see [`crate::response`]).

pub mod attendance;
pub mod group;
pub mod paths;
pub mod question;
pub mod resource;
pub mod status;
pub mod task;

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tower_mcp::Tool;

use crate::state::AppState;

/// Build every tool exposed by the server
pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    let mut tools = Vec::new();
    tools.extend(status::build_tools(state)?);
    tools.extend(group::build_tools(state)?);
    tools.extend(task::build_tools(state)?);
    tools.extend(question::build_tools(state)?);
    tools.extend(attendance::build_tools(state)?);
    tools.extend(resource::build_tools(state)?);
    Ok(tools)
}

/// Deserialize an id the platform may send as a string or a number
pub(crate) fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Deserialize a field the platform may send as `null`, using its default
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a list the platform may return bare or wrapped in a `list`,
/// `records` or `items` field.
pub(crate) fn rows<T: serde::de::DeserializeOwned>(data: Value) -> crate::error::Result<Vec<T>> {
    let list = match data {
        Value::Array(_) => data,
        Value::Object(mut map) => ["list", "records", "items"]
            .iter()
            .find_map(|key| map.remove(*key))
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    Ok(serde_json::from_value(list)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "id_string")]
        id: String,
    }

    #[test]
    fn test_rows_accepts_wrapped_lists() {
        let bare: Vec<Row> = rows(json!([{"id": "a"}])).unwrap();
        assert_eq!(bare[0].id, "a");

        let wrapped: Vec<Row> = rows(json!({"total": 1, "list": [{"id": 7}]})).unwrap();
        assert_eq!(wrapped[0].id, "7");

        let empty: Vec<Row> = rows(Value::Null).unwrap();
        assert!(empty.is_empty());
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct NamedRow {
        #[serde(deserialize_with = "id_string")]
        id: String,
        #[serde(deserialize_with = "or_default")]
        name: String,
        #[serde(deserialize_with = "or_default")]
        status: i64,
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let list: Vec<NamedRow> = rows(json!([
            {"id": 1, "name": "ok", "status": 2},
            {"id": 2, "name": null, "status": null},
            {"id": null}
        ]))
        .unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].name, "ok");
        assert_eq!(list[0].status, 2);
        assert_eq!(list[1].id, "2");
        assert_eq!(list[1].name, "");
        assert_eq!(list[1].status, 0);
        assert_eq!(list[2].id, "");
    }
}
