//! Attendance sessions and records

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_mcp::{Tool, ToolBuilder};

use super::{id_string, or_default, paths, rows};
use crate::client::PlatformClient;
use crate::error::{Error, Result};
use crate::response::respond;
use crate::state::AppState;
use crate::types::{AttendanceStatus, AttendanceUser};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "or_default")]
    name: String,
    start_time: Option<String>,
    end_time: Option<String>,
    present_count: Option<u64>,
    total_count: Option<u64>,
}

/// One attendance session of a course group
#[derive(Debug, Serialize)]
pub struct AttendanceSession {
    pub register_id: String,
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub present: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RecordRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "id_string")]
    user_id: String,
    #[serde(deserialize_with = "or_default")]
    nickname: String,
    student_number: Option<String>,
    #[serde(deserialize_with = "or_default")]
    status: i64,
    sign_time: Option<String>,
}

/// One student's attendance in a session
#[derive(Debug, Serialize)]
pub struct AttendanceRecord {
    pub register_user_id: String,
    pub user_id: String,
    pub nickname: String,
    pub student_number: Option<String>,
    pub status: i64,
    pub status_label: &'static str,
    pub sign_time: Option<String>,
}

/// Input identifying a course group
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionsInput {
    /// Course group id (from query_teacher_groups)
    pub group_id: String,
}

/// Input identifying an attendance session
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordsInput {
    /// Course group id
    pub group_id: String,
    /// Attendance session id (from query_attendance_sessions)
    pub register_id: String,
}

/// Input for changing attendance statuses
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateStatusInput {
    /// Course group id
    pub group_id: String,
    /// Attendance session id (from query_attendance_sessions)
    pub register_id: String,
    /// Students and their new status
    pub users: Vec<AttendanceUser>,
}

pub async fn attendance_sessions(
    client: &PlatformClient,
    group_id: &str,
) -> Result<Vec<AttendanceSession>> {
    let data = client
        .get(&client.api_url(paths::ATTENDANCE_SESSIONS), &[("group_id", group_id)])
        .await?;
    Ok(rows::<SessionRow>(data)?
        .into_iter()
        .map(|s| AttendanceSession {
            register_id: s.id,
            name: s.name,
            start_time: s.start_time,
            end_time: s.end_time,
            present: s.present_count,
            total: s.total_count,
        })
        .collect())
}

pub async fn attendance_records(
    client: &PlatformClient,
    group_id: &str,
    register_id: &str,
) -> Result<Vec<AttendanceRecord>> {
    let data = client
        .get(
            &client.api_url(paths::ATTENDANCE_RECORDS),
            &[("group_id", group_id), ("register_id", register_id)],
        )
        .await?;
    Ok(rows::<RecordRow>(data)?
        .into_iter()
        .map(|r| AttendanceRecord {
            register_user_id: r.id,
            user_id: r.user_id,
            nickname: r.nickname,
            student_number: r.student_number,
            status: r.status,
            status_label: AttendanceStatus::label(r.status),
            sign_time: r.sign_time,
        })
        .collect())
}

pub async fn update_status(client: &PlatformClient, input: &UpdateStatusInput) -> Result<Value> {
    if input.users.is_empty() {
        return Err(Error::validation("users must not be empty"));
    }
    if input.users.iter().any(|u| u.register_user_id.trim().is_empty()) {
        return Err(Error::validation("register_user_id must not be empty"));
    }
    let users: Vec<Value> = input
        .users
        .iter()
        .map(|u| json!({"registerUserId": u.register_user_id, "status": u.status}))
        .collect();
    client
        .post(
            &client.api_url(paths::UPDATE_ATTENDANCE),
            &json!({
                "groupId": input.group_id,
                "registerId": input.register_id,
                "users": users,
            }),
        )
        .await
}

pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    let sessions = ToolBuilder::new("query_attendance_sessions")
        .description("List the attendance sessions of a course group")
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: SessionsInput| async move {
                Ok(respond(
                    attendance_sessions(&state.client, &input.group_id).await,
                    "Attendance sessions loaded",
                    "Failed to query attendance sessions",
                ))
            },
        )
        .build()?;

    let records = ToolBuilder::new("query_attendance_records")
        .description("List every student's status in one attendance session")
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: RecordsInput| async move {
                Ok(respond(
                    attendance_records(&state.client, &input.group_id, &input.register_id).await,
                    "Attendance records loaded",
                    "Failed to query attendance records",
                ))
            },
        )
        .build()?;

    let update = ToolBuilder::new("update_attendance_status")
        .description(
            "Change the attendance status of students in a session \
             (1=present, 2=absent, 3=late, 4=left early, 5=personal leave, \
             6=sick leave, 7=official leave, 8=other)",
        )
        .idempotent()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: UpdateStatusInput| async move {
                Ok(respond(
                    update_status(&state.client, &input).await,
                    "Attendance updated",
                    "Failed to update attendance",
                ))
            },
        )
        .build()?;

    Ok(vec![sessions, records, update])
}
