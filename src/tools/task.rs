//! Task (published paper) queries and grading

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
use crate::types::richtext::to_plain;
use crate::types::{AnswerChecked, AnswerStatus, QuestionType};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "or_default")]
    name: String,
    #[serde(deserialize_with = "id_string")]
    paper_id: String,
    #[serde(deserialize_with = "id_string")]
    publish_id: String,
    start_time: Option<String>,
    end_time: Option<String>,
}

/// A task published to a course group
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub name: String,
    pub paper_id: String,
    pub publish_id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TestResultData {
    #[serde(deserialize_with = "id_string")]
    mark_mode_id: String,
    #[serde(deserialize_with = "or_default")]
    answer_records: Vec<RecordRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RecordRow {
    #[serde(deserialize_with = "id_string")]
    record_id: String,
    #[serde(deserialize_with = "id_string")]
    user_id: String,
    #[serde(deserialize_with = "or_default")]
    nickname: String,
    class_name: Option<String>,
    #[serde(deserialize_with = "or_default")]
    status: i64,
    score: Option<f64>,
    submit_time: Option<String>,
}

/// One student's answer sheet for a task
#[derive(Debug, Serialize)]
pub struct AnswerRecord {
    pub record_id: String,
    pub user_id: String,
    pub nickname: String,
    pub class_name: Option<String>,
    pub status: i64,
    pub status_label: &'static str,
    pub score: Option<f64>,
    pub submit_time: Option<String>,
}

/// Answer sheets of a task, with the marking mode needed to open them
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub mark_mode_id: String,
    pub answer_records: Vec<AnswerRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PaperQuestionRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(rename = "type", deserialize_with = "or_default")]
    kind: i64,
    #[serde(deserialize_with = "or_default")]
    title: String,
    score: Option<f64>,
    answer: Option<StudentAnswerRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StudentAnswerRow {
    answer: Value,
    answer_checked: Option<i64>,
    score: Option<f64>,
    comment: Option<String>,
}

/// One question of a student's answer sheet
#[derive(Debug, Serialize)]
pub struct StudentPaperQuestion {
    pub question_id: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub type_label: &'static str,
    pub title: String,
    pub score: Option<f64>,
    pub student_answer: Value,
    pub checked: Option<&'static str>,
    pub answer_score: Option<f64>,
    pub comment: Option<String>,
}

/// Input identifying a course group
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GroupTasksInput {
    /// Course group id (from query_teacher_groups)
    pub group_id: String,
}

/// Input identifying a published task
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TestResultInput {
    /// Course group id
    pub group_id: String,
    /// Paper id of the task (from query_group_tasks)
    pub paper_id: String,
    /// Publish id of the task (from query_group_tasks)
    pub publish_id: String,
}

/// Input identifying one student's answer sheet
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StudentPaperInput {
    /// Course group id
    pub group_id: String,
    /// Paper id of the task
    pub paper_id: String,
    /// Marking mode id (from query_test_result)
    pub mark_mode_id: String,
    /// Publish id of the task
    pub publish_id: String,
    /// Answer record id (from query_test_result)
    pub record_id: String,
}

/// Teacher score for one question of one answer sheet
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MarkAnswerInput {
    /// Course group id
    pub group_id: String,
    /// Paper id of the task
    pub paper_id: String,
    /// Publish id of the task
    pub publish_id: String,
    /// Answer record id (from query_test_result)
    pub record_id: String,
    /// Question id (from query_preview_student_paper)
    pub question_id: String,
    /// Score to give, between 0 and the question's full score
    pub score: f64,
    /// Optional feedback shown to the student
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn group_tasks(client: &PlatformClient, group_id: &str) -> Result<Vec<TaskSummary>> {
    let data = client
        .get(&client.api_url(paths::GROUP_TASKS), &[("group_id", group_id)])
        .await?;
    Ok(rows::<TaskRow>(data)?
        .into_iter()
        .map(|t| TaskSummary {
            task_id: t.id,
            name: t.name,
            paper_id: t.paper_id,
            publish_id: t.publish_id,
            start_time: t.start_time,
            end_time: t.end_time,
        })
        .collect())
}

pub async fn test_result(client: &PlatformClient, input: &TestResultInput) -> Result<TestResult> {
    let data = client
        .get(
            &client.api_url(paths::TEST_RESULT),
            &[
                ("group_id", input.group_id.as_str()),
                ("paper_id", input.paper_id.as_str()),
                ("publish_id", input.publish_id.as_str()),
            ],
        )
        .await?;
    let data: TestResultData = serde_json::from_value(data)?;
    Ok(TestResult {
        mark_mode_id: data.mark_mode_id,
        answer_records: data
            .answer_records
            .into_iter()
            .map(|r| AnswerRecord {
                record_id: r.record_id,
                user_id: r.user_id,
                nickname: r.nickname,
                class_name: r.class_name,
                status: r.status,
                status_label: AnswerStatus::label(r.status),
                score: r.score,
                submit_time: r.submit_time,
            })
            .collect(),
    })
}

pub async fn preview_student_paper(
    client: &PlatformClient,
    input: &StudentPaperInput,
) -> Result<Vec<StudentPaperQuestion>> {
    let data = client
        .get(
            &client.api_url(paths::PREVIEW_STUDENT_PAPER),
            &[
                ("group_id", input.group_id.as_str()),
                ("paper_id", input.paper_id.as_str()),
                ("mark_mode_id", input.mark_mode_id.as_str()),
                ("publish_id", input.publish_id.as_str()),
                ("record_id", input.record_id.as_str()),
            ],
        )
        .await?;
    let questions = match data {
        Value::Object(mut map) => map.remove("questions").unwrap_or(Value::Null),
        other => other,
    };
    Ok(rows::<PaperQuestionRow>(questions)?
        .into_iter()
        .map(|q| {
            let answer = q.answer.unwrap_or_default();
            StudentPaperQuestion {
                question_id: q.id,
                kind: q.kind,
                type_label: QuestionType::label(q.kind),
                title: to_plain(&q.title),
                score: q.score,
                student_answer: answer.answer,
                checked: answer.answer_checked.map(AnswerChecked::label),
                answer_score: answer.score,
                comment: answer.comment,
            }
        })
        .collect())
}

pub async fn mark_answer(client: &PlatformClient, input: &MarkAnswerInput) -> Result<Value> {
    if !input.score.is_finite() || input.score < 0.0 {
        return Err(Error::validation("score must be a non-negative number"));
    }
    client
        .post(
            &client.api_url(paths::MARK_ANSWER),
            &json!({
                "groupId": input.group_id,
                "paperId": input.paper_id,
                "publishId": input.publish_id,
                "recordId": input.record_id,
                "questionId": input.question_id,
                "score": input.score,
                "comment": input.comment.as_deref().unwrap_or(""),
            }),
        )
        .await
}

pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    let tasks = ToolBuilder::new("query_group_tasks")
        .description(
            "List the tasks (published papers) of a course group with their paper and publish ids",
        )
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: GroupTasksInput| async move {
                Ok(respond(
                    group_tasks(&state.client, &input.group_id).await,
                    "Tasks loaded",
                    "Failed to query tasks",
                ))
            },
        )
        .build()?;

    let results = ToolBuilder::new("query_test_result")
        .description(
            "List the students' answer records of a task, with the mark_mode_id needed to open them",
        )
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: TestResultInput| async move {
                Ok(respond(
                    test_result(&state.client, &input).await,
                    "Test result loaded",
                    "Failed to query test result",
                ))
            },
        )
        .build()?;

    let preview = ToolBuilder::new("query_preview_student_paper")
        .description(
            "Show one student's answer sheet: each question with the student's answer and score",
        )
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: StudentPaperInput| async move {
                Ok(respond(
                    preview_student_paper(&state.client, &input).await,
                    "Student paper loaded",
                    "Failed to query student paper",
                ))
            },
        )
        .build()?;

    let mark = ToolBuilder::new("mark_answer")
        .description(
            "Give a teacher score and optional comment to one question of a student's answer sheet",
        )
        .idempotent()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: MarkAnswerInput| async move {
                Ok(respond(
                    mark_answer(&state.client, &input).await,
                    "Answer marked",
                    "Failed to mark answer",
                ))
            },
        )
        .build()?;

    Ok(vec![tasks, results, preview, mark])
}
