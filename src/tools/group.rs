//! Course group, class and student queries

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tower_mcp::{Tool, ToolBuilder};

use super::{id_string, or_default, paths, rows};
use crate::client::PlatformClient;
use crate::error::Result;
use crate::response::respond;
use crate::state::AppState;

/// A course group as returned by the platform
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GroupRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "or_default")]
    name: String,
    course_name: Option<String>,
    term_name: Option<String>,
    member_count: Option<u64>,
}

/// A course group taught by the current teacher
#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub group_id: String,
    pub name: String,
    pub course_name: Option<String>,
    pub term: Option<String>,
    pub member_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClassRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "or_default")]
    name: String,
    student_count: Option<u64>,
}

/// A class within a course group
#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub class_id: String,
    pub name: String,
    pub student_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MemberRow {
    #[serde(deserialize_with = "id_string")]
    user_id: String,
    #[serde(deserialize_with = "or_default")]
    nickname: String,
    student_number: Option<String>,
    class_name: Option<String>,
}

/// A student of a class
#[derive(Debug, Serialize)]
pub struct StudentSummary {
    pub user_id: String,
    pub nickname: String,
    pub student_number: Option<String>,
    pub class_name: Option<String>,
}

/// Input identifying a course group
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GroupInput {
    /// Course group id (from query_teacher_groups)
    pub group_id: String,
}

/// Input identifying a class of a course group
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClassInput {
    /// Course group id (from query_teacher_groups)
    pub group_id: String,
    /// Class id (from query_group_classes)
    pub class_id: String,
}

pub async fn teacher_groups(client: &PlatformClient) -> Result<Vec<GroupSummary>> {
    let data = client.get(&client.api_url(paths::TEACHER_GROUPS), &[]).await?;
    Ok(rows::<GroupRow>(data)?
        .into_iter()
        .map(|g| GroupSummary {
            group_id: g.id,
            name: g.name,
            course_name: g.course_name,
            term: g.term_name,
            member_count: g.member_count,
        })
        .collect())
}

pub async fn group_classes(client: &PlatformClient, group_id: &str) -> Result<Vec<ClassSummary>> {
    let data = client
        .get(&client.api_url(paths::GROUP_CLASSES), &[("group_id", group_id)])
        .await?;
    Ok(rows::<ClassRow>(data)?
        .into_iter()
        .map(|c| ClassSummary {
            class_id: c.id,
            name: c.name,
            student_count: c.student_count,
        })
        .collect())
}

pub async fn class_students(
    client: &PlatformClient,
    group_id: &str,
    class_id: &str,
) -> Result<Vec<StudentSummary>> {
    let data = client
        .get(
            &client.api_url(paths::CLASS_STUDENTS),
            &[("group_id", group_id), ("class_id", class_id)],
        )
        .await?;
    Ok(rows::<MemberRow>(data)?
        .into_iter()
        .map(|m| StudentSummary {
            user_id: m.user_id,
            nickname: m.nickname,
            student_number: m.student_number,
            class_name: m.class_name,
        })
        .collect())
}

pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    let groups = ToolBuilder::new("query_teacher_groups")
        .description("List the course groups taught by the current teacher")
        .read_only()
        .handler_with_state_no_params(state.clone(), |state: Arc<AppState>| async move {
            Ok(respond(
                teacher_groups(&state.client).await,
                "Course groups loaded",
                "Failed to query course groups",
            ))
        })?;

    let classes = ToolBuilder::new("query_group_classes")
        .description("List the classes of a course group")
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: GroupInput| async move {
                Ok(respond(
                    group_classes(&state.client, &input.group_id).await,
                    "Classes loaded",
                    "Failed to query classes",
                ))
            },
        )
        .build()?;

    let students = ToolBuilder::new("query_class_students")
        .description("List the students of one class in a course group")
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: ClassInput| async move {
                Ok(respond(
                    class_students(&state.client, &input.group_id, &input.class_id).await,
                    "Students loaded",
                    "Failed to query students",
                ))
            },
        )
        .build()?;

    Ok(vec![groups, classes, students])
}
