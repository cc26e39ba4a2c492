//! Course resources: folder tree, visibility/download settings, download links

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tower_mcp::{Tool, ToolBuilder};

use super::{id_string, or_default, paths, rows};
use crate::client::PlatformClient;
use crate::error::{Error, Result};
use crate::response::respond;
use crate::state::AppState;
use crate::types::{DownloadType, ResourceType, VisibilityType};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub parent_id: String,
    #[serde(deserialize_with = "or_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "or_default")]
    pub kind: i64,
    #[serde(deserialize_with = "id_string")]
    pub quote_id: String,
    pub visibility: Option<i64>,
    pub download: Option<i64>,
    pub sort_position: Option<i64>,
}

/// A resource and, for folders, its children
#[derive(Debug, Serialize)]
pub struct ResourceNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub type_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResourceNode>,
}

/// Arrange a flat resource list into folder trees.
///
/// Rows whose parent is missing from the list become roots, as do rows
/// caught in a parent cycle. Siblings keep the platform's sort position,
/// then their original order.
pub fn build_tree(resources: Vec<ResourceRow>) -> Vec<ResourceNode> {
    let ids: HashSet<String> = resources.iter().map(|r| r.id.clone()).collect();
    let mut by_parent: HashMap<String, Vec<ResourceRow>> = HashMap::new();
    let mut roots = Vec::new();
    for row in resources {
        if !row.parent_id.is_empty() && row.parent_id != row.id && ids.contains(&row.parent_id) {
            by_parent.entry(row.parent_id.clone()).or_default().push(row);
        } else {
            roots.push(row);
        }
    }
    let mut visited = HashSet::new();
    let mut tree = attach(roots, &mut by_parent, &mut visited);
    // Rows in parent cycles are unreachable from any root
    while let Some(parent) = by_parent.keys().next().cloned() {
        let rows = by_parent.remove(&parent).unwrap_or_default();
        tree.extend(attach(rows, &mut by_parent, &mut visited));
    }
    tree
}

fn attach(
    mut rows: Vec<ResourceRow>,
    by_parent: &mut HashMap<String, Vec<ResourceRow>>,
    visited: &mut HashSet<String>,
) -> Vec<ResourceNode> {
    rows.sort_by_key(|r| r.sort_position.unwrap_or(i64::MAX));
    let mut nodes = Vec::with_capacity(rows.len());
    for row in rows {
        if !visited.insert(row.id.clone()) {
            continue;
        }
        let children = match by_parent.remove(&row.id) {
            Some(kids) => attach(kids, by_parent, visited),
            None => Vec::new(),
        };
        nodes.push(ResourceNode {
            type_label: ResourceType::label(row.kind),
            quote_id: (!row.quote_id.is_empty()).then_some(row.quote_id),
            visibility: row.visibility.map(VisibilityType::label),
            download: row.download.map(DownloadType::label),
            id: row.id,
            name: row.name,
            kind: row.kind,
            children,
        });
    }
    nodes
}

/// Input identifying a course group
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResourcesInput {
    /// Course group id (from query_teacher_groups)
    pub group_id: String,
}

/// Input for changing resource settings; give at least one setting
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResourceSettingsInput {
    /// Course group id
    pub group_id: String,
    /// Resource id (from query_course_resources)
    pub resource_id: String,
    /// 1=hidden from students, 2=visible to students
    #[serde(default)]
    pub visibility: Option<VisibilityType>,
    /// 1=not downloadable, 2=downloadable
    #[serde(default)]
    pub download: Option<DownloadType>,
}

/// Input identifying a downloadable resource
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadUrlInput {
    /// quote_id of a file resource (from query_course_resources)
    pub quote_id: String,
}

/// Temporary download link of a resource
#[derive(Debug, Serialize)]
pub struct DownloadUrl {
    pub quote_id: String,
    pub url: String,
}

pub async fn course_resources(
    client: &PlatformClient,
    group_id: &str,
) -> Result<Vec<ResourceNode>> {
    let data = client
        .get(&client.api_url(paths::COURSE_RESOURCES), &[("group_id", group_id)])
        .await?;
    Ok(build_tree(rows(data)?))
}

pub async fn update_settings(
    client: &PlatformClient,
    input: &ResourceSettingsInput,
) -> Result<Value> {
    if input.visibility.is_none() && input.download.is_none() {
        return Err(Error::validation("give at least one of visibility or download"));
    }
    let mut body = Map::new();
    body.insert("groupId".into(), json!(input.group_id));
    body.insert("resourceId".into(), json!(input.resource_id));
    if let Some(visibility) = input.visibility {
        body.insert("visibility".into(), json!(visibility));
    }
    if let Some(download) = input.download {
        body.insert("download".into(), json!(download));
    }
    client
        .put(&client.api_url(paths::UPDATE_RESOURCE), &Value::Object(body))
        .await
}

pub async fn download_url(client: &PlatformClient, quote_id: &str) -> Result<DownloadUrl> {
    let data = client
        .get(&client.download_url(paths::DOWNLOAD_URL), &[("quote_id", quote_id)])
        .await?;
    let url = match &data {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };
    let url = url.ok_or_else(|| {
        Error::api(StatusCode::OK, format!("platform returned no download url for {}", quote_id))
    })?;
    Ok(DownloadUrl {
        quote_id: quote_id.to_string(),
        url,
    })
}

pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    let list = ToolBuilder::new("query_course_resources")
        .description(
            "Show the resources of a course group as a folder tree, \
             with type, visibility and download labels",
        )
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: ResourcesInput| async move {
                Ok(respond(
                    course_resources(&state.client, &input.group_id).await,
                    "Course resources loaded",
                    "Failed to query course resources",
                ))
            },
        )
        .build()?;

    let settings = ToolBuilder::new("update_resource_settings")
        .description("Change whether students can see or download a resource")
        .idempotent()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: ResourceSettingsInput| async move {
                Ok(respond(
                    update_settings(&state.client, &input).await,
                    "Resource settings updated",
                    "Failed to update resource settings",
                ))
            },
        )
        .build()?;

    let download = ToolBuilder::new("query_resource_download_url")
        .description("Get a download link for a file resource")
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: DownloadUrlInput| async move {
                Ok(respond(
                    download_url(&state.client, &input.quote_id).await,
                    "Download url loaded",
                    "Failed to query download url",
                ))
            },
        )
        .build()?;

    Ok(vec![list, settings, download])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, parent: &str, name: &str, kind: i64, sort: Option<i64>) -> ResourceRow {
        ResourceRow {
            id: id.into(),
            parent_id: parent.into(),
            name: name.into(),
            kind,
            sort_position: sort,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_tree_nests_children() {
        let tree = build_tree(vec![
            row("f1", "", "Week 1", 1, Some(1)),
            row("n1", "f1", "Notes", 2, Some(2)),
            row("d1", "f1", "Slides", 6, Some(1)),
            row("f2", "f1", "Extra", 1, Some(3)),
            row("a1", "f2", "Homework", 7, None),
            row("t1", "", "Design", 11, Some(0)),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "Design");
        assert_eq!(tree[0].type_label, "教学设计");

        let week = &tree[1];
        let names: Vec<&str> = week.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Slides", "Notes", "Extra"]);
        assert_eq!(week.children[2].children[0].type_label, "作业");
    }

    #[test]
    fn test_orphans_become_roots() {
        let tree = build_tree(vec![row("x", "missing", "Orphan", 6, None)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Orphan");
    }

    #[test]
    fn test_cycles_are_kept() {
        let tree = build_tree(vec![
            row("a", "b", "A", 1, None),
            row("b", "a", "B", 1, None),
            row("r", "", "Root", 1, None),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "Root");
        assert_eq!(tree[1].children.len(), 1);
        assert!(tree[1].children[0].children.is_empty());
    }

    #[test]
    fn test_labels_serialize() {
        let mut file = row("d", "", "Slides", 6, None);
        file.quote_id = "q-1".into();
        file.visibility = Some(2);
        file.download = Some(1);
        let value = serde_json::to_value(build_tree(vec![file])).unwrap();
        assert_eq!(value[0]["quote_id"], "q-1");
        assert_eq!(value[0]["visibility"], "学生可见");
        assert_eq!(value[0]["download"], "不可下载");
        assert!(value[0].get("children").is_none());
    }
}
