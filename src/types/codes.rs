//! Integer and string codes used by the platform API.
//!
//! Integer codes travel as plain numbers on the wire; `label` turns a raw
//! code from a platform response into the platform's own Chinese name
//! (`"unknown"` for codes this server does not know).

use std::borrow::Cow;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label used for codes outside the known set
pub const UNKNOWN: &str = "unknown";

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Readable name for a raw code
            pub fn label(code: i64) -> &'static str {
                Self::from_code(code).map(Self::name).unwrap_or(UNKNOWN)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i64(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let code = i64::deserialize(deserializer)?;
                Self::from_code(code).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "invalid {} code {}, expected one of {:?}",
                        stringify!($name),
                        code,
                        [$($code,)+]
                    ))
                })
            }
        }

        impl JsonSchema for $name {
            fn schema_name() -> Cow<'static, str> {
                Cow::Borrowed(stringify!($name))
            }

            fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
                let description = [$(format!("{}={}", $code, $label),)+].join(", ");
                json_schema!({
                    "type": "integer",
                    "enum": [$($code,)+],
                    "description": description,
                })
            }
        }
    };
}

coded_enum! {
    /// Kind of a course resource
    ResourceType {
        Folder = 1 => "文件夹",
        Note = 2 => "笔记",
        Mindmap = 3 => "思维导图",
        File = 6 => "文件",
        Assignment = 7 => "作业",
        TeachingDesign = 11 => "教学设计",
    }
}

coded_enum! {
    /// Kind of a quiz question
    QuestionType {
        SingleChoice = 1 => "单选题",
        MultipleChoice = 2 => "多选题",
        FillBlank = 4 => "填空题",
        TrueFalse = 5 => "判断题",
        ShortAnswer = 6 => "简答题",
        Attachment = 7 => "附件题",
        Code = 10 => "代码题",
    }
}

coded_enum! {
    /// Attendance status of a student in one session
    AttendanceStatus {
        Present = 1 => "签到",
        Absent = 2 => "旷课",
        Late = 3 => "迟到",
        EarlyLeave = 4 => "早退",
        PersonalLeave = 5 => "事假",
        SickLeave = 6 => "病假",
        OfficialLeave = 7 => "公假",
        Other = 8 => "其他",
    }
}

coded_enum! {
    /// How fill-in-the-blank answers are matched
    AutoScoreType {
        /// Exact match, answers in order
        ExactOrdered = 1 => "精确匹配+有序",
        /// Partial match, answers in order
        PartialOrdered = 2 => "部分匹配+有序",
        /// Exact match, any order
        ExactUnordered = 11 => "精确匹配+无序",
        /// Partial match, any order
        PartialUnordered = 12 => "部分匹配+无序",
    }
}

coded_enum! {
    /// Scoring mode of multiple choice questions
    QuestionScoreType {
        Strict = 1 => "严格计分",
        Lenient = 2 => "宽分模式",
    }
}

coded_enum! {
    /// Whether a question must be answered
    RequiredType {
        No = 1 => "否",
        Yes = 2 => "是",
    }
}

coded_enum! {
    /// Automatic scoring switch
    AutoStatType {
        Off = 1 => "关闭",
        On = 2 => "开启",
    }
}

coded_enum! {
    /// Whether students may download a resource
    DownloadType {
        Disabled = 1 => "不可下载",
        Enabled = 2 => "可下载",
    }
}

coded_enum! {
    /// Whether students can see a resource
    VisibilityType {
        Hidden = 1 => "学生不可见",
        Visible = 2 => "学生可见",
    }
}

coded_enum! {
    /// Question or option shuffling
    RandomizationType {
        Disabled = 1 => "关闭",
        Enabled = 2 => "开启",
    }
}

coded_enum! {
    /// State of a student's answer sheet
    AnswerStatus {
        InProgress = 1 => "答题中",
        Submitted = 2 => "已提交",
    }
}

coded_enum! {
    /// Correctness of an answer
    AnswerChecked {
        Wrong = 1 => "错误",
        Correct = 2 => "正确",
    }
}

impl Default for RequiredType {
    fn default() -> Self {
        RequiredType::Yes
    }
}

/// Languages accepted by programming questions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ProgrammingLanguage {
    #[default]
    #[serde(rename = "c")]
    C,
    #[serde(rename = "c++")]
    Cpp,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "c#")]
    CSharp,
    #[serde(rename = "r")]
    R,
    #[serde(rename = "sql")]
    Sql,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "python3")]
    Python3,
    #[serde(rename = "matlab")]
    Matlab,
    #[serde(rename = "ada")]
    Ada,
    #[serde(rename = "fortran")]
    Fortran,
    #[serde(rename = "scratch")]
    Scratch,
    #[serde(rename = "php")]
    Php,
    #[serde(rename = "visual_basic")]
    VisualBasic,
    #[serde(rename = "assembly")]
    Assembly,
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "rust")]
    Rust,
    #[serde(rename = "kotlin")]
    Kotlin,
    #[serde(rename = "perl")]
    Perl,
    #[serde(rename = "object_pascal")]
    ObjectPascal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(QuestionType::label(10), "代码题");
        assert_eq!(QuestionType::label(3), UNKNOWN);
        assert_eq!(ResourceType::label(11), "教学设计");
        assert_eq!(AttendanceStatus::label(8), "其他");
        assert_eq!(AutoScoreType::label(12), "部分匹配+无序");
    }

    #[test]
    fn test_codes_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&QuestionType::Code).unwrap(), "10");
        let status: AttendanceStatus = serde_json::from_str("3").unwrap();
        assert_eq!(status, AttendanceStatus::Late);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let err = serde_json::from_str::<AutoScoreType>("3").unwrap_err();
        assert!(err.to_string().contains("invalid AutoScoreType code 3"));
    }

    #[test]
    fn test_schema_lists_codes() {
        let schema = schemars::schema_for!(AttendanceStatus);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], "integer");
        assert_eq!(json["enum"].as_array().unwrap().len(), 8);
        assert!(json["description"].as_str().unwrap().contains("2=旷课"));
    }

    #[test]
    fn test_programming_language_names() {
        assert_eq!(serde_json::to_string(&ProgrammingLanguage::Cpp).unwrap(), "\"c++\"");
        assert_eq!(
            serde_json::from_str::<ProgrammingLanguage>("\"object_pascal\"").unwrap(),
            ProgrammingLanguage::ObjectPascal
        );
    }
}
