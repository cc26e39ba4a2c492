//! Rich text lines and their draft.js encoding.
//!
//! Question titles, options and reference answers are stored by the platform
//! as serialized draft.js "raw content": one block per line plus an (empty)
//! entity map.

use rand::Rng;
use rand::distr::Alphanumeric;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Block type of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LineType {
    #[default]
    Unstyled,
    UnorderedListItem,
    OrderedListItem,
    CodeBlock,
}

/// Inline style applied to a range of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum InlineStyle {
    #[serde(rename = "BOLD")]
    Bold,
    #[serde(rename = "ITALIC")]
    Italic,
    #[serde(rename = "UNDERLINE")]
    Underline,
    #[serde(rename = "CODE")]
    Code,
    #[serde(rename = "lineThrough")]
    LineThrough,
}

/// A styled range within a line
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InlineStyleRange {
    /// Offset of the first styled character
    #[serde(default)]
    pub offset: usize,
    /// Number of styled characters
    pub length: usize,
    /// Style to apply: BOLD, ITALIC, UNDERLINE, CODE or lineThrough
    pub style: InlineStyle,
}

/// One line of rich text. For a plain option, `{"text": "..."}` is enough.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LineText {
    /// Line content
    pub text: String,
    /// Line type: unstyled (default), unordered-list-item, ordered-list-item or code-block
    #[serde(default)]
    pub line_type: LineType,
    /// Styled ranges within the line
    #[serde(default, rename = "inlineStyleRanges")]
    pub inline_style_ranges: Vec<InlineStyleRange>,
}

impl LineText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line_type: LineType::Unstyled,
            inline_style_ranges: Vec::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        let chars = self.text.chars().count();
        for range in &self.inline_style_ranges {
            if range.length == 0
                || range
                    .offset
                    .checked_add(range.length)
                    .is_none_or(|end| end > chars)
            {
                return Err(Error::validation(format!(
                    "style range {}+{} is outside line '{}'",
                    range.offset, range.length, self.text
                )));
            }
        }
        Ok(())
    }
}

fn block_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Check the lines and encode them as a draft.js raw content string.
pub fn to_draft(lines: &[LineText]) -> Result<String> {
    if lines.is_empty() {
        return Err(Error::validation("rich text needs at least one line"));
    }
    let mut blocks = Vec::with_capacity(lines.len());
    for line in lines {
        line.validate()?;
        blocks.push(json!({
            "key": block_key(),
            "text": line.text,
            "type": line.line_type,
            "depth": 0,
            "inlineStyleRanges": line.inline_style_ranges,
            "entityRanges": [],
            "data": {},
        }));
    }
    Ok(json!({ "blocks": blocks, "entityMap": {} }).to_string())
}

/// Encode a single unstyled line.
pub fn plain_draft(text: &str) -> String {
    json!({
        "blocks": [{
            "key": block_key(),
            "text": text,
            "type": "unstyled",
            "depth": 0,
            "inlineStyleRanges": [],
            "entityRanges": [],
            "data": {},
        }],
        "entityMap": {},
    })
    .to_string()
}

/// Plain text of a draft.js string, one line per block.
///
/// Values that are not draft.js content are returned as they are.
pub fn to_plain(raw: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    match value.get("blocks").and_then(Value::as_array) {
        Some(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        None => raw.to_string(),
    }
}

/// Number of `____` blank markers in the given lines
pub fn count_blanks(lines: &[LineText]) -> usize {
    lines.iter().map(|l| l.text.matches("____").count()).sum()
}
