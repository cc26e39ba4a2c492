//! Paper question tools: listing, creating, importing, scoring and deleting

use std::sync::Arc;

use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_mcp::{Tool, ToolBuilder};

use super::{id_string, or_default, paths, rows};
use crate::client::PlatformClient;
use crate::error::{Error, Result};
use crate::response::respond;
use crate::state::AppState;
use crate::types::richtext::to_plain;
use crate::types::{
    AnswerChecked, AttachmentQuestion, ChoiceQuestion, CodeQuestion, FillBlankQuestion,
    ProgramSetting, QuestionData, QuestionPayload, QuestionType, RequiredType,
    ShortAnswerQuestion, TrueFalseQuestion,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QuestionRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(rename = "type", deserialize_with = "or_default")]
    kind: i64,
    #[serde(deserialize_with = "or_default")]
    title: String,
    description: Option<String>,
    score: Option<f64>,
    required: Option<i64>,
    #[serde(deserialize_with = "or_default")]
    answer_items: Vec<AnswerItemRow>,
    program_setting: Option<ProgramSettingIds>,
}

/// Ids needed to update the judge settings of a programming question
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgramSettingIds {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename(deserialize = "answerItemId"), deserialize_with = "id_string")]
    pub answer_item_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AnswerItemRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "id_string")]
    seqno: String,
    context: Option<String>,
    answer_checked: Option<i64>,
}

/// An option, blank or answer slot of a question
#[derive(Debug, Serialize)]
pub struct AnswerItemSummary {
    pub item_id: String,
    pub seqno: String,
    pub text: Option<String>,
    pub correct: Option<bool>,
}

/// A question of a paper, with rich text flattened to plain text
#[derive(Debug, Serialize)]
pub struct QuestionSummary {
    pub question_id: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub type_label: &'static str,
    pub title: String,
    pub description: Option<String>,
    pub score: Option<f64>,
    pub required: Option<&'static str>,
    pub answer_items: Vec<AnswerItemSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_setting: Option<ProgramSettingIds>,
}

impl From<QuestionRow> for QuestionSummary {
    fn from(q: QuestionRow) -> Self {
        Self {
            question_id: q.id,
            kind: q.kind,
            type_label: QuestionType::label(q.kind),
            title: to_plain(&q.title),
            description: q.description.as_deref().map(to_plain),
            score: q.score,
            required: q.required.map(RequiredType::label),
            answer_items: q
                .answer_items
                .into_iter()
                .map(|item| AnswerItemSummary {
                    item_id: item.id,
                    seqno: item.seqno,
                    text: item.context.as_deref().map(to_plain),
                    correct: item
                        .answer_checked
                        .map(|code| code == AnswerChecked::Correct.code()),
                })
                .collect(),
            program_setting: q.program_setting,
        }
    }
}

/// Id of a newly created question
#[derive(Debug, Serialize)]
pub struct CreatedQuestion {
    pub question_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
}

/// Input identifying a paper
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PaperInput {
    /// Paper id (from query_group_tasks)
    pub paper_id: String,
}

/// Input for creating one question in a paper
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateQuestionInput<Q> {
    /// Paper to add the question to
    pub paper_id: String,
    /// The question
    pub question: Q,
}

/// Input for importing several questions at once
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchImportInput {
    /// Paper to import into
    pub paper_id: String,
    /// Questions to import: single choice, multiple choice, fill in the blank,
    /// true/false or short answer
    pub questions: Vec<QuestionData>,
}

/// Input for changing the score of a question
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateScoreInput {
    /// Paper the question belongs to
    pub paper_id: String,
    /// Question id (from query_paper_questions)
    pub question_id: String,
    /// New score, greater than 0
    pub score: u32,
}

/// Input for replacing the judge settings of a programming question
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateProgramSettingInput {
    /// Paper the question belongs to
    pub paper_id: String,
    /// Question id (from query_paper_questions)
    pub question_id: String,
    /// Complete judge settings, including `id` and `answer_item_id` from
    /// query_paper_questions
    pub program_setting: ProgramSetting,
}

/// Input identifying a question
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteQuestionInput {
    /// Paper the question belongs to
    pub paper_id: String,
    /// Question id (from query_paper_questions)
    pub question_id: String,
}

pub async fn paper_questions(
    client: &PlatformClient,
    paper_id: &str,
) -> Result<Vec<QuestionSummary>> {
    let data = client
        .get(&client.api_url(paths::PAPER_QUESTIONS), &[("paper_id", paper_id)])
        .await?;
    Ok(rows::<QuestionRow>(data)?
        .into_iter()
        .map(QuestionSummary::from)
        .collect())
}

/// Send a validated create payload.
pub async fn create_question(
    client: &PlatformClient,
    payload: Result<QuestionPayload>,
) -> Result<CreatedQuestion> {
    let payload = payload?;
    let kind = payload.kind;
    let data = client
        .post(&client.api_url(paths::ADD_QUESTION), &payload)
        .await?;
    let question_id = match &data {
        Value::Object(map) => map.get("id").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };
    let question_id = match question_id {
        Value::String(s) => s,
        Value::Null => {
            return Err(Error::api(StatusCode::OK, "platform returned no question id"));
        }
        other => other.to_string(),
    };
    tracing::info!(question_id = %question_id, kind = kind.name(), "Question created");
    Ok(CreatedQuestion { question_id, kind })
}

pub async fn batch_import(client: &PlatformClient, input: &BatchImportInput) -> Result<Value> {
    if input.questions.is_empty() {
        return Err(Error::validation("questions must not be empty"));
    }
    for (i, question) in input.questions.iter().enumerate() {
        question
            .validate()
            .map_err(|e| Error::validation(format!("question {}: {}", i + 1, e)))?;
    }
    client
        .post(
            &client.api_url(paths::IMPORT_QUESTIONS),
            &json!({
                "paperId": input.paper_id,
                "questions": input.questions,
            }),
        )
        .await
}

pub async fn update_score(client: &PlatformClient, input: &UpdateScoreInput) -> Result<Value> {
    if input.score == 0 {
        return Err(Error::validation("score must be greater than 0"));
    }
    client
        .put(
            &client.api_url(paths::UPDATE_QUESTION),
            &json!({
                "paperId": input.paper_id,
                "id": input.question_id,
                "score": input.score,
            }),
        )
        .await
}

pub async fn update_program_setting(
    client: &PlatformClient,
    input: &UpdateProgramSettingInput,
) -> Result<Value> {
    let payload = input
        .program_setting
        .update_payload(&input.paper_id, &input.question_id)?;
    client
        .post(&client.api_url(paths::UPDATE_PROGRAM_SETTING), &payload)
        .await
}

pub async fn delete_question(
    client: &PlatformClient,
    input: &DeleteQuestionInput,
) -> Result<Value> {
    client
        .delete(
            &client.api_url(paths::DELETE_QUESTION),
            &[
                ("paper_id", input.paper_id.as_str()),
                ("question_id", input.question_id.as_str()),
            ],
        )
        .await
}

/// Build a `create_*_question` tool for one question input type.
fn build_create_tool<Q, F>(
    state: &Arc<AppState>,
    name: &str,
    description: &str,
    to_payload: F,
) -> tower_mcp::Result<Tool>
where
    Q: JsonSchema + DeserializeOwned + Send + Sync + 'static,
    F: Fn(&Q, &str) -> Result<QuestionPayload> + Copy + Send + Sync + 'static,
{
    ToolBuilder::new(name)
        .description(description)
        .handler_with_state(
            state.clone(),
            move |state: Arc<AppState>, input: CreateQuestionInput<Q>| async move {
                let payload = to_payload(&input.question, input.paper_id.as_str());
                Ok(respond(
                    create_question(&state.client, payload).await,
                    "Question created",
                    "Failed to create question",
                ))
            },
        )
        .build()
}

pub fn build_tools(state: &Arc<AppState>) -> tower_mcp::Result<Vec<Tool>> {
    let list = ToolBuilder::new("query_paper_questions")
        .description("List the questions of a paper with types, scores and answer items")
        .read_only()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: PaperInput| async move {
                Ok(respond(
                    paper_questions(&state.client, &input.paper_id).await,
                    "Questions loaded",
                    "Failed to query questions",
                ))
            },
        )
        .build()?;

    let choice = build_create_tool(
        state,
        "create_choice_question",
        "Create a single (type 1) or multiple (type 2) choice question with at least 4 options",
        ChoiceQuestion::payload,
    )?;
    let true_false = build_create_tool(
        state,
        "create_true_false_question",
        "Create a true/false question",
        TrueFalseQuestion::payload,
    )?;
    let fill_blank = build_create_tool(
        state,
        "create_fill_blank_question",
        "Create a fill-in-the-blank question; the title needs one '____' per answer",
        FillBlankQuestion::payload,
    )?;
    let short_answer = build_create_tool(
        state,
        "create_short_answer_question",
        "Create a short answer question with a reference answer",
        ShortAnswerQuestion::payload,
    )?;
    let attachment = build_create_tool(
        state,
        "create_attachment_question",
        "Create a question answered by uploading a file",
        AttachmentQuestion::payload,
    )?;
    let code = build_create_tool(
        state,
        "create_code_question",
        "Create a programming question with judge limits, languages, reference code and test inputs",
        CodeQuestion::payload,
    )?;

    let import = ToolBuilder::new("batch_import_questions")
        .description(
            "Import several single choice, multiple choice, fill-in-the-blank, true/false \
             or short answer questions into a paper in one call",
        )
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: BatchImportInput| async move {
                Ok(respond(
                    batch_import(&state.client, &input).await,
                    "Questions imported",
                    "Failed to import questions",
                ))
            },
        )
        .build()?;

    let score = ToolBuilder::new("update_question_score")
        .description("Change the score of a question")
        .idempotent()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: UpdateScoreInput| async move {
                Ok(respond(
                    update_score(&state.client, &input).await,
                    "Question score updated",
                    "Failed to update question score",
                ))
            },
        )
        .build()?;

    let program = ToolBuilder::new("update_program_setting")
        .description(
            "Replace the judge settings (limits, languages, reference code, test inputs) \
             of an existing programming question",
        )
        .idempotent()
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: UpdateProgramSettingInput| async move {
                Ok(respond(
                    update_program_setting(&state.client, &input).await,
                    "Program settings updated",
                    "Failed to update program settings",
                ))
            },
        )
        .build()?;

    let delete = ToolBuilder::new("delete_question")
        .description("Delete a question from a paper")
        .handler_with_state(
            state.clone(),
            |state: Arc<AppState>, input: DeleteQuestionInput| async move {
                Ok(respond(
                    delete_question(&state.client, &input).await,
                    "Question deleted",
                    "Failed to delete question",
                ))
            },
        )
        .build()?;

    Ok(vec![
        list,
        choice,
        true_false,
        fill_blank,
        short_answer,
        attachment,
        code,
        import,
        score,
        program,
        delete,
    ])
}
