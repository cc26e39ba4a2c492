//! Question inputs accepted by the question tools.
//!
//! Each input checks itself with `validate()` before anything is sent to the
//! platform, then turns into the platform's create payload with `payload()`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::codes::{
    AnswerChecked, AttendanceStatus, AutoScoreType, AutoStatType, ProgrammingLanguage,
    QuestionType, RequiredType,
};
use super::richtext::{LineText, count_blanks, plain_draft, to_draft};
use crate::error::{Error, Result};

/// Blank marker inside fill-in-the-blank titles
pub const BLANK_MARKER: &str = "____";

const MIN_CHOICE_OPTIONS: usize = 4;
const MAX_OPTIONS: usize = 26;

fn default_score() -> u32 {
    2
}

/// Option letter for a zero based index: A, B, C, ...
pub fn option_seqno(index: usize) -> String {
    char::from(b'A' + (index % MAX_OPTIONS) as u8).to_string()
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_lines(field: &str, lines: &[LineText]) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation(format!("{} needs at least one line", field)));
    }
    Ok(())
}

fn require_score(score: u32) -> Result<()> {
    if score == 0 {
        return Err(Error::validation("score must be greater than 0"));
    }
    Ok(())
}

fn require_range(field: &str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(Error::validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Create payload shared by every question kind
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub paper_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub title: String,
    pub description: String,
    pub score: u32,
    pub required: RequiredType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_question_id: Option<String>,
    pub answer_items: Vec<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One option of a choice question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionOption {
    /// Option text (rich text lines)
    pub text: Vec<LineText>,
    /// Whether this option is a correct answer
    pub answer: bool,
}

/// Single or multiple choice question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceQuestion {
    /// Question type: 1=single choice, 2=multiple choice
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Question text (rich text, one entry per line)
    pub title: Vec<LineText>,
    /// Answer explanation shown after grading
    pub description: String,
    /// Options, at least 4
    pub options: Vec<QuestionOption>,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Whether the question must be answered (1=no, 2=yes)
    #[serde(default)]
    pub required: RequiredType,
    /// Insert after this question id instead of appending
    #[serde(default)]
    pub insert_question_id: Option<String>,
}

impl ChoiceQuestion {
    pub fn validate(&self) -> Result<()> {
        require_lines("title", &self.title)?;
        require_text("description", &self.description)?;
        require_score(self.score)?;
        if self.options.len() < MIN_CHOICE_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(Error::validation(format!(
                "choice questions need {} to {} options, got {}",
                MIN_CHOICE_OPTIONS,
                MAX_OPTIONS,
                self.options.len()
            )));
        }
        for (i, option) in self.options.iter().enumerate() {
            require_lines(&format!("option {}", option_seqno(i)), &option.text)?;
        }
        let correct = self.options.iter().filter(|o| o.answer).count();
        match self.kind {
            QuestionType::SingleChoice if correct != 1 => Err(Error::validation(format!(
                "single choice questions need exactly one correct option, got {}",
                correct
            ))),
            QuestionType::MultipleChoice if correct == 0 => Err(Error::validation(
                "multiple choice questions need at least one correct option",
            )),
            QuestionType::SingleChoice | QuestionType::MultipleChoice => Ok(()),
            other => Err(Error::validation(format!(
                "choice questions must be type 1 or 2, got {}",
                other.code()
            ))),
        }
    }

    pub fn payload(&self, paper_id: &str) -> Result<QuestionPayload> {
        self.validate()?;
        let mut answer_items = Vec::with_capacity(self.options.len());
        for (i, option) in self.options.iter().enumerate() {
            let checked = if option.answer {
                AnswerChecked::Correct
            } else {
                AnswerChecked::Wrong
            };
            answer_items.push(json!({
                "seqno": option_seqno(i),
                "context": to_draft(&option.text)?,
                "answerChecked": checked,
            }));
        }
        let answers: Vec<String> = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.answer)
            .map(|(i, _)| option_seqno(i))
            .collect();
        let mut extra = serde_json::Map::new();
        extra.insert("standardAnswer".into(), json!(answers.join(",")));
        Ok(QuestionPayload {
            paper_id: paper_id.to_string(),
            kind: self.kind,
            title: to_draft(&self.title)?,
            description: plain_draft(&self.description),
            score: self.score,
            required: self.required,
            insert_question_id: self.insert_question_id.clone(),
            answer_items,
            extra,
        })
    }
}

/// True/false question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrueFalseQuestion {
    /// Question text (rich text, one entry per line)
    pub title: Vec<LineText>,
    /// Answer explanation shown after grading
    pub description: String,
    /// Correct answer
    pub answer: bool,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Whether the question must be answered (1=no, 2=yes)
    #[serde(default)]
    pub required: RequiredType,
    /// Insert after this question id instead of appending
    #[serde(default)]
    pub insert_question_id: Option<String>,
}

impl TrueFalseQuestion {
    pub fn validate(&self) -> Result<()> {
        require_lines("title", &self.title)?;
        require_text("description", &self.description)?;
        require_score(self.score)
    }

    pub fn payload(&self, paper_id: &str) -> Result<QuestionPayload> {
        self.validate()?;
        // A is "true", B is "false"
        let (answer, true_checked, false_checked) = if self.answer {
            ("A", AnswerChecked::Correct, AnswerChecked::Wrong)
        } else {
            ("B", AnswerChecked::Wrong, AnswerChecked::Correct)
        };
        let mut extra = serde_json::Map::new();
        extra.insert("standardAnswer".into(), json!(answer));
        Ok(QuestionPayload {
            paper_id: paper_id.to_string(),
            kind: QuestionType::TrueFalse,
            title: to_draft(&self.title)?,
            description: plain_draft(&self.description),
            score: self.score,
            required: self.required,
            insert_question_id: self.insert_question_id.clone(),
            answer_items: vec![
                json!({"seqno": "A", "context": "true", "answerChecked": true_checked}),
                json!({"seqno": "B", "context": "", "answerChecked": false_checked}),
            ],
            extra,
        })
    }
}

/// Answer of one blank
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FillBlankAnswer {
    /// Answer text. Separate alternative answers for one blank with ';', e.g. "A;B"
    pub text: String,
}

/// Fill-in-the-blank question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FillBlankQuestion {
    /// Question text containing one '____' marker per blank
    pub title: Vec<LineText>,
    /// Answer explanation shown after grading
    pub description: String,
    /// One answer per blank, in order
    pub options: Vec<FillBlankAnswer>,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Whether the question must be answered (1=no, 2=yes)
    #[serde(default)]
    pub required: RequiredType,
    /// Accept several ';' separated answers per blank
    #[serde(default)]
    pub is_split_answer: Option<bool>,
    /// Automatic scoring switch (1=off, 2=on)
    #[serde(default)]
    pub automatic_stat: Option<AutoStatType>,
    /// Answer matching mode: 1=exact ordered, 2=partial ordered, 11=exact unordered, 12=partial unordered
    pub automatic_type: AutoScoreType,
    /// Insert after this question id instead of appending
    #[serde(default)]
    pub insert_question_id: Option<String>,
}

impl FillBlankQuestion {
    pub fn validate(&self) -> Result<()> {
        require_lines("title", &self.title)?;
        require_text("description", &self.description)?;
        require_score(self.score)?;
        let blanks = count_blanks(&self.title);
        if blanks == 0 {
            return Err(Error::validation(format!(
                "title must contain at least one '{}' marker",
                BLANK_MARKER
            )));
        }
        if blanks != self.options.len() {
            return Err(Error::validation(format!(
                "title has {} blanks but {} answers were given",
                blanks,
                self.options.len()
            )));
        }
        for (i, answer) in self.options.iter().enumerate() {
            require_text(&format!("answer {}", i + 1), &answer.text)?;
        }
        Ok(())
    }

    pub fn payload(&self, paper_id: &str) -> Result<QuestionPayload> {
        self.validate()?;
        let answer_items = self
            .options
            .iter()
            .enumerate()
            .map(|(i, answer)| {
                json!({
                    "seqno": (i + 1).to_string(),
                    "context": "",
                    "answer": answer.text,
                })
            })
            .collect();
        let mut extra = serde_json::Map::new();
        extra.insert("automaticType".into(), json!(self.automatic_type));
        extra.insert(
            "automaticStat".into(),
            json!(self.automatic_stat.unwrap_or(AutoStatType::On)),
        );
        extra.insert(
            "isSplitAnswer".into(),
            json!(self.is_split_answer.unwrap_or(false)),
        );
        Ok(QuestionPayload {
            paper_id: paper_id.to_string(),
            kind: QuestionType::FillBlank,
            title: to_draft(&self.title)?,
            description: plain_draft(&self.description),
            score: self.score,
            required: self.required,
            insert_question_id: self.insert_question_id.clone(),
            answer_items,
            extra,
        })
    }
}

/// Short answer question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShortAnswerQuestion {
    /// Question text (rich text, one entry per line)
    pub title: Vec<LineText>,
    /// Answer explanation shown after grading
    pub description: String,
    /// Reference answer (rich text, one entry per line)
    pub answer: Vec<LineText>,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Whether the question must be answered (1=no, 2=yes)
    #[serde(default)]
    pub required: RequiredType,
    /// Insert after this question id instead of appending
    #[serde(default)]
    pub insert_question_id: Option<String>,
}

impl ShortAnswerQuestion {
    pub fn validate(&self) -> Result<()> {
        require_lines("title", &self.title)?;
        require_text("description", &self.description)?;
        require_lines("answer", &self.answer)?;
        require_score(self.score)
    }

    pub fn payload(&self, paper_id: &str) -> Result<QuestionPayload> {
        self.validate()?;
        Ok(QuestionPayload {
            paper_id: paper_id.to_string(),
            kind: QuestionType::ShortAnswer,
            title: to_draft(&self.title)?,
            description: plain_draft(&self.description),
            score: self.score,
            required: self.required,
            insert_question_id: self.insert_question_id.clone(),
            answer_items: vec![json!({"seqno": "A", "answer": to_draft(&self.answer)?})],
            extra: serde_json::Map::new(),
        })
    }
}

/// Attachment (file upload) question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AttachmentQuestion {
    /// Question text (rich text, one entry per line)
    pub title: Vec<LineText>,
    /// Answer explanation shown after grading
    pub description: String,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Whether the question must be answered (1=no, 2=yes)
    #[serde(default)]
    pub required: RequiredType,
    /// Insert after this question id instead of appending
    #[serde(default)]
    pub insert_question_id: Option<String>,
}

impl AttachmentQuestion {
    pub fn validate(&self) -> Result<()> {
        require_lines("title", &self.title)?;
        require_text("description", &self.description)?;
        require_score(self.score)
    }

    pub fn payload(&self, paper_id: &str) -> Result<QuestionPayload> {
        self.validate()?;
        Ok(QuestionPayload {
            paper_id: paper_id.to_string(),
            kind: QuestionType::Attachment,
            title: to_draft(&self.title)?,
            description: plain_draft(&self.description),
            score: self.score,
            required: self.required,
            insert_question_id: self.insert_question_id.clone(),
            answer_items: vec![json!({"seqno": "A"})],
            extra: serde_json::Map::new(),
        })
    }
}

/// Input of one test case
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InCase {
    /// Text fed to the program's standard input
    #[serde(rename = "in")]
    pub input: String,
}

fn default_max_memory() -> u32 {
    5000
}

fn default_max_time() -> u32 {
    500
}

fn switch_on() -> u32 {
    2
}

fn default_debug_count() -> u32 {
    9999
}

fn default_runcase_count() -> u32 {
    100
}

fn default_languages() -> Vec<ProgrammingLanguage> {
    vec![ProgrammingLanguage::C]
}

/// Judge settings of a programming question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgramSetting {
    /// Setting id, only needed when updating an existing question
    #[serde(default)]
    pub id: Option<String>,
    /// Answer item id, only needed when updating an existing question
    #[serde(default)]
    pub answer_item_id: Option<String>,
    /// Memory limit in KB
    #[serde(default = "default_max_memory")]
    pub max_memory: u32,
    /// Time limit in ms
    #[serde(default = "default_max_time")]
    pub max_time: u32,
    /// Allow trial runs (1=off, 2=on)
    #[serde(default = "switch_on")]
    pub debug: u32,
    /// Number of trial runs allowed (0-9999)
    #[serde(default = "default_debug_count")]
    pub debug_count: u32,
    /// Allow running the test cases (1=off, 2=on)
    #[serde(default = "switch_on")]
    pub runcase: u32,
    /// Number of test case runs allowed (0-100)
    #[serde(default = "default_runcase_count")]
    pub runcase_count: u32,
    /// Languages students may submit in
    #[serde(default = "default_languages")]
    pub language: Vec<ProgrammingLanguage>,
    /// Language of the reference answer, defaults to the first allowed language
    #[serde(default)]
    pub answer_language: Option<ProgrammingLanguage>,
    /// Reference solution, well commented
    #[serde(default)]
    pub code_answer: String,
    /// Test case inputs, e.g. [{"in": "1 2"}]
    #[serde(default)]
    pub in_cases: Vec<InCase>,
}

impl ProgramSetting {
    pub fn validate(&self) -> Result<()> {
        if self.max_memory == 0 {
            return Err(Error::validation("max_memory must be greater than 0"));
        }
        if self.max_time == 0 {
            return Err(Error::validation("max_time must be greater than 0"));
        }
        require_range("debug", self.debug, 1, 2)?;
        require_range("debug_count", self.debug_count, 0, 9999)?;
        require_range("runcase", self.runcase, 1, 2)?;
        require_range("runcase_count", self.runcase_count, 0, 100)?;
        if self.language.is_empty() {
            return Err(Error::validation("at least one language is required"));
        }
        if self.in_cases.is_empty() {
            return Err(Error::validation("at least one test case input is required"));
        }
        require_text("code_answer", &self.code_answer)
    }

    /// Payload replacing the settings of an existing programming question.
    ///
    /// Needs the setting id and answer item id reported by
    /// `query_paper_questions`.
    pub fn update_payload(&self, paper_id: &str, question_id: &str) -> Result<Value> {
        self.validate()?;
        for (field, value) in [("id", &self.id), ("answer_item_id", &self.answer_item_id)] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(Error::validation(format!(
                    "program_setting.{} is required to update a question",
                    field
                )));
            }
        }
        Ok(json!({
            "paperId": paper_id,
            "questionId": question_id,
            "programSetting": self.to_value(),
        }))
    }

    pub fn answer_language(&self) -> ProgrammingLanguage {
        self.answer_language
            .or_else(|| self.language.first().copied())
            .unwrap_or_default()
    }

    fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "answerItemId": self.answer_item_id,
            "maxMemory": self.max_memory,
            "maxTime": self.max_time,
            "debug": self.debug,
            "debugCount": self.debug_count,
            "runcase": self.runcase,
            "runcaseCount": self.runcase_count,
            "language": self.language,
            "answerLanguage": self.answer_language(),
            "codeAnswer": self.code_answer,
            "inCases": self.in_cases,
        })
    }
}

/// Programming question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CodeQuestion {
    /// Question text (rich text, one entry per line)
    pub title: Vec<LineText>,
    /// Answer explanation shown after grading
    pub description: String,
    /// Judge settings
    pub program_setting: ProgramSetting,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Whether the question must be answered (1=no, 2=yes)
    #[serde(default)]
    pub required: RequiredType,
    /// Insert after this question id instead of appending
    #[serde(default)]
    pub insert_question_id: Option<String>,
}

impl CodeQuestion {
    pub fn validate(&self) -> Result<()> {
        require_lines("title", &self.title)?;
        require_text("description", &self.description)?;
        require_score(self.score)?;
        self.program_setting.validate()
    }

    pub fn payload(&self, paper_id: &str) -> Result<QuestionPayload> {
        self.validate()?;
        let mut extra = serde_json::Map::new();
        extra.insert("programSetting".into(), self.program_setting.to_value());
        Ok(QuestionPayload {
            paper_id: paper_id.to_string(),
            kind: QuestionType::Code,
            title: to_draft(&self.title)?,
            description: plain_draft(&self.description),
            score: self.score,
            required: self.required,
            insert_question_id: self.insert_question_id.clone(),
            answer_items: vec![json!({"seqno": "A"})],
            extra,
        })
    }
}

/// Reference answer of an imported question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StandardAnswer {
    /// Matches an answer item: A/B/C... for choice and true/false, 1/2/3 for blanks, A for short answer
    pub seqno: String,
    /// Answer content: option letters, blank text (';' separates alternatives) or reference answer
    pub standard_answer: String,
}

/// Answer item of an imported question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerItem {
    /// Item number: A/B/C... for choice and true/false, 1/2/3 for blanks, A for short answer
    pub seqno: String,
    /// Option text for choice questions; "true" for A and "" for B in true/false; "" for blanks
    #[serde(default)]
    pub context: Option<String>,
}

/// One question of a batch import.
///
/// The list limits depend on `type`: true/false needs exactly two answer
/// items, short answer exactly one answer and one item, fill in the blank one
/// item per `____` marker in the title and an `automatic_type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionData {
    /// Question type: 1=single choice, 2=multiple choice, 4=fill in the blank, 5=true/false, 6=short answer
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Question text
    pub title: String,
    /// Reference answers
    pub standard_answers: Vec<StandardAnswer>,
    /// Answer explanation
    pub description: String,
    /// Score of the question
    #[serde(default = "default_score")]
    pub score: u32,
    /// Options, blanks or answer slots
    pub answer_items: Vec<AnswerItem>,
    /// Answer matching mode, fill in the blank only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_type: Option<AutoScoreType>,
}

fn require_count(field: &str, len: usize, min: usize, max: usize) -> Result<()> {
    if len < min || len > max {
        let expected = if min == max {
            format!("exactly {}", min)
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(Error::validation(format!(
            "{} needs {} entries, got {}",
            field, expected, len
        )));
    }
    Ok(())
}

impl QuestionData {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        require_score(self.score)?;
        for answer in &self.standard_answers {
            require_text("standard answer seqno", &answer.seqno)?;
            require_text("standard answer", &answer.standard_answer)?;
        }
        for item in &self.answer_items {
            require_text("answer item seqno", &item.seqno)?;
        }

        let (answers, items) = match self.kind {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => {
                ((1, usize::MAX), (1, MAX_OPTIONS))
            }
            QuestionType::FillBlank => ((1, usize::MAX), (1, usize::MAX)),
            QuestionType::TrueFalse => ((1, 1), (2, 2)),
            QuestionType::ShortAnswer => ((1, 1), (1, 1)),
            other => {
                return Err(Error::validation(format!(
                    "type {} ({}) cannot be batch imported",
                    other.code(),
                    other.name()
                )));
            }
        };
        require_count("standard_answers", self.standard_answers.len(), answers.0, answers.1)?;
        require_count("answer_items", self.answer_items.len(), items.0, items.1)?;

        if self.kind == QuestionType::FillBlank {
            if self.automatic_type.is_none() {
                return Err(Error::validation(
                    "fill in the blank questions need automatic_type",
                ));
            }
            let blanks = self.title.matches(BLANK_MARKER).count();
            if blanks != self.answer_items.len() {
                return Err(Error::validation(format!(
                    "title has {} blanks but {} answer items were given",
                    blanks,
                    self.answer_items.len()
                )));
            }
        }

        for answer in &self.standard_answers {
            if !self.answer_items.iter().any(|i| i.seqno == answer.seqno) {
                return Err(Error::validation(format!(
                    "standard answer '{}' does not match any answer item",
                    answer.seqno
                )));
            }
        }
        Ok(())
    }
}

/// New attendance status of one student
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AttendanceUser {
    /// Attendance record user id
    pub register_user_id: String,
    /// Status: 1=present, 2=absent, 3=late, 4=left early, 5=personal leave, 6=sick leave, 7=official leave, 8=other
    pub status: AttendanceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<LineText> {
        vec![LineText::plain(text)]
    }

    fn choice(kind: QuestionType, correct: &[usize], count: usize) -> ChoiceQuestion {
        ChoiceQuestion {
            kind,
            title: lines("Which keyword declares a constant in Rust?"),
            description: "const declares a compile time constant.".into(),
            options: (0..count)
                .map(|i| QuestionOption {
                    text: lines(&format!("option {}", i)),
                    answer: correct.contains(&i),
                })
                .collect(),
            score: 2,
            required: RequiredType::Yes,
            insert_question_id: None,
        }
    }

    #[test]
    fn test_single_choice_needs_one_correct() {
        assert!(choice(QuestionType::SingleChoice, &[1], 4).validate().is_ok());
        assert!(choice(QuestionType::SingleChoice, &[0, 1], 4).validate().is_err());
        assert!(choice(QuestionType::SingleChoice, &[], 4).validate().is_err());
    }

    #[test]
    fn test_multiple_choice_needs_a_correct_option() {
        assert!(choice(QuestionType::MultipleChoice, &[0, 2], 5).validate().is_ok());
        assert!(choice(QuestionType::MultipleChoice, &[], 4).validate().is_err());
    }

    #[test]
    fn test_choice_needs_four_options() {
        let err = choice(QuestionType::SingleChoice, &[0], 3)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("4 to 26 options"));
    }

    #[test]
    fn test_choice_rejects_other_types() {
        assert!(choice(QuestionType::ShortAnswer, &[0], 4).validate().is_err());
    }

    #[test]
    fn test_choice_payload() {
        let payload = choice(QuestionType::MultipleChoice, &[0, 2], 4)
            .payload("paper-1")
            .unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["paperId"], "paper-1");
        assert_eq!(value["type"], 2);
        assert_eq!(value["required"], 2);
        assert_eq!(value["standardAnswer"], "A,C");
        assert_eq!(value["answerItems"][2]["answerChecked"], 2);
        assert_eq!(value["answerItems"][1]["answerChecked"], 1);
        assert!(value.get("insertQuestionId").is_none());
    }

    #[test]
    fn test_choice_defaults_from_json() {
        let question: ChoiceQuestion = serde_json::from_value(json!({
            "type": 1,
            "title": [{"text": "Pick one"}],
            "description": "because",
            "options": [
                {"text": [{"text": "a"}], "answer": true},
                {"text": [{"text": "b"}], "answer": false},
                {"text": [{"text": "c"}], "answer": false},
                {"text": [{"text": "d"}], "answer": false}
            ]
        }))
        .unwrap();
        assert_eq!(question.score, 2);
        assert_eq!(question.required, RequiredType::Yes);
        assert!(question.validate().is_ok());
    }

    #[test]
    fn test_true_false_payload() {
        let question = TrueFalseQuestion {
            title: lines("Rust has a garbage collector."),
            description: "Memory is managed through ownership.".into(),
            answer: false,
            score: 1,
            required: RequiredType::No,
            insert_question_id: Some("q-9".into()),
        };
        let value = serde_json::to_value(question.payload("p").unwrap()).unwrap();
        assert_eq!(value["type"], 5);
        assert_eq!(value["standardAnswer"], "B");
        assert_eq!(value["insertQuestionId"], "q-9");
        assert_eq!(value["answerItems"][1]["answerChecked"], 2);
    }

    fn fill_blank(answers: &[&str]) -> FillBlankQuestion {
        FillBlankQuestion {
            title: lines("The borrow checker enforces ____ and ____ rules."),
            description: "Ownership and borrowing.".into(),
            options: answers
                .iter()
                .map(|a| FillBlankAnswer { text: a.to_string() })
                .collect(),
            score: 4,
            required: RequiredType::Yes,
            is_split_answer: None,
            automatic_stat: None,
            automatic_type: AutoScoreType::ExactOrdered,
            insert_question_id: None,
        }
    }

    #[test]
    fn test_fill_blank_counts_markers() {
        assert!(fill_blank(&["ownership", "borrowing"]).validate().is_ok());
        let err = fill_blank(&["ownership"]).validate().unwrap_err();
        assert!(err.to_string().contains("2 blanks but 1 answers"));
    }

    #[test]
    fn test_fill_blank_requires_automatic_type() {
        let result = serde_json::from_value::<FillBlankQuestion>(json!({
            "title": [{"text": "____"}],
            "description": "x",
            "options": [{"text": "y"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_fill_blank_payload() {
        let value =
            serde_json::to_value(fill_blank(&["ownership", "borrowing"]).payload("p").unwrap())
                .unwrap();
        assert_eq!(value["automaticType"], 1);
        assert_eq!(value["automaticStat"], 2);
        assert_eq!(value["answerItems"][1]["seqno"], "2");
        assert_eq!(value["answerItems"][1]["answer"], "borrowing");
    }

    #[test]
    fn test_short_answer_needs_reference() {
        let question = ShortAnswerQuestion {
            title: lines("Explain lifetimes."),
            description: "Lifetimes bound references.".into(),
            answer: vec![],
            score: 5,
            required: RequiredType::Yes,
            insert_question_id: None,
        };
        assert!(question.validate().is_err());
    }

    fn program_setting() -> ProgramSetting {
        serde_json::from_value(json!({
            "language": ["python3", "c"],
            "code_answer": "# read two numbers\nprint(sum(map(int, input().split())))",
            "in_cases": [{"in": "1 2"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_program_setting_defaults() {
        let setting = program_setting();
        assert_eq!(setting.max_memory, 5000);
        assert_eq!(setting.max_time, 500);
        assert_eq!(setting.debug, 2);
        assert_eq!(setting.debug_count, 9999);
        assert_eq!(setting.runcase_count, 100);
        assert_eq!(setting.answer_language(), ProgrammingLanguage::Python3);
        assert!(setting.validate().is_ok());
    }

    #[test]
    fn test_program_setting_ranges() {
        let mut setting = program_setting();
        setting.debug = 3;
        assert!(setting.validate().is_err());

        let mut setting = program_setting();
        setting.runcase_count = 101;
        assert!(setting.validate().is_err());

        let mut setting = program_setting();
        setting.max_time = 0;
        assert!(setting.validate().is_err());

        let mut setting = program_setting();
        setting.in_cases.clear();
        assert!(setting.validate().is_err());

        let mut setting = program_setting();
        setting.code_answer = "  ".into();
        assert!(setting.validate().is_err());

        let mut setting = program_setting();
        setting.language.clear();
        assert!(setting.validate().is_err());
    }

    #[test]
    fn test_code_question_payload() {
        let question = CodeQuestion {
            title: lines("Add two numbers."),
            description: "Read a and b, print a + b.".into(),
            program_setting: program_setting(),
            score: 10,
            required: RequiredType::Yes,
            insert_question_id: None,
        };
        let value = serde_json::to_value(question.payload("p").unwrap()).unwrap();
        assert_eq!(value["type"], 10);
        assert_eq!(value["programSetting"]["answerLanguage"], "python3");
        assert_eq!(value["programSetting"]["inCases"][0]["in"], "1 2");
    }

    #[test]
    fn test_program_setting_update_needs_ids() {
        let mut setting = program_setting();
        let err = setting.update_payload("p", "q").unwrap_err();
        assert!(err.to_string().contains("program_setting.id"));

        setting.id = Some("ps-1".into());
        setting.answer_item_id = Some(" ".into());
        let err = setting.update_payload("p", "q").unwrap_err();
        assert!(err.to_string().contains("program_setting.answer_item_id"));

        setting.answer_item_id = Some("ai-1".into());
        let value = setting.update_payload("p", "q").unwrap();
        assert_eq!(value["questionId"], "q");
        assert_eq!(value["programSetting"]["id"], "ps-1");
        assert_eq!(value["programSetting"]["answerItemId"], "ai-1");

        setting.in_cases.clear();
        assert!(setting.update_payload("p", "q").is_err());
    }

    fn import(kind: QuestionType, title: &str, answers: &[(&str, &str)], items: &[&str]) -> QuestionData {
        QuestionData {
            kind,
            title: title.into(),
            standard_answers: answers
                .iter()
                .map(|(s, a)| StandardAnswer {
                    seqno: s.to_string(),
                    standard_answer: a.to_string(),
                })
                .collect(),
            description: "explanation".into(),
            score: 2,
            answer_items: items
                .iter()
                .map(|s| AnswerItem {
                    seqno: s.to_string(),
                    context: Some(String::new()),
                })
                .collect(),
            automatic_type: None,
        }
    }

    #[test]
    fn test_import_true_false_needs_two_items() {
        let ok = import(QuestionType::TrueFalse, "Is 2 even?", &[("A", "A")], &["A", "B"]);
        assert!(ok.validate().is_ok());
        let bad = import(QuestionType::TrueFalse, "Is 2 even?", &[("A", "A")], &["A"]);
        assert!(bad.validate().unwrap_err().to_string().contains("exactly 2"));
    }

    #[test]
    fn test_import_fill_blank_rules() {
        let mut question = import(
            QuestionType::FillBlank,
            "____ is greater than ____",
            &[("1", "2"), ("2", "1")],
            &["1", "2"],
        );
        assert!(question.validate().is_err());
        question.automatic_type = Some(AutoScoreType::ExactOrdered);
        assert!(question.validate().is_ok());
        question.answer_items.pop();
        question.standard_answers.pop();
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_import_answer_must_match_item() {
        let question = import(QuestionType::SingleChoice, "Pick", &[("E", "E")], &["A", "B", "C", "D"]);
        assert!(question.validate().unwrap_err().to_string().contains("'E'"));
    }

    #[test]
    fn test_import_rejects_code_questions() {
        let question = import(QuestionType::Code, "Write code", &[("A", "x")], &["A"]);
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_attendance_user_status_code() {
        let user: AttendanceUser =
            serde_json::from_value(json!({"register_user_id": "u1", "status": 6})).unwrap();
        assert_eq!(user.status, AttendanceStatus::SickLeave);
    }
}
