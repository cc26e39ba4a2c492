//! Platform codes, rich text and question inputs

pub mod codes;
pub mod question;
pub mod richtext;

pub use codes::{
    AnswerChecked, AnswerStatus, AttendanceStatus, AutoScoreType, AutoStatType, DownloadType,
    ProgrammingLanguage, QuestionScoreType, QuestionType, RandomizationType, RequiredType,
    ResourceType, VisibilityType,
};
pub use question::{
    AttachmentQuestion, AttendanceUser, ChoiceQuestion, CodeQuestion, FillBlankAnswer,
    FillBlankQuestion, ProgramSetting, QuestionData, QuestionOption, QuestionPayload,
    ShortAnswerQuestion, TrueFalseQuestion,
};
pub use richtext::{InlineStyle, InlineStyleRange, LineText, LineType};
