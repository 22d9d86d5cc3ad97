#![forbid(unsafe_code)]

mod inline;
mod walk;

pub use inline::*;
pub use walk::ContentRef;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockType {
    Paragraph,
    Heading,
    List,
    ListItem,
    Blockquote,
    Callout,
    CodeBlock,
    ThematicBreak,
    Table,
    MathBlock,
    FootnoteDef,
}

impl BlockType {
    pub const ALL: [BlockType; 11] = [
        Self::Paragraph,
        Self::Heading,
        Self::List,
        Self::ListItem,
        Self::Blockquote,
        Self::Callout,
        Self::CodeBlock,
        Self::ThematicBreak,
        Self::Table,
        Self::MathBlock,
        Self::FootnoteDef,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::List => "list",
            Self::ListItem => "list_item",
            Self::Blockquote => "blockquote",
            Self::Callout => "callout",
            Self::CodeBlock => "code_block",
            Self::ThematicBreak => "thematic_break",
            Self::Table => "table",
            Self::MathBlock => "math_block",
            Self::FootnoteDef => "footnote_def",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ContentError> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| ContentError::UnknownBlockType(value.to_string()))
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("unknown block type {0:?}")]
    UnknownBlockType(String),
    #[error("{block_type} content is malformed: {reason}")]
    Malformed {
        block_type: &'static str,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParagraphContent {
    pub inline: Vec<Inline>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadingContent {
    pub level: u8,
    pub inline: Vec<Inline>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListContent {
    pub kind: ListKind,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub tight: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListItemContent {
    pub inline: Vec<Inline>,
    #[serde(default)]
    pub checked: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyContent {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalloutContent {
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub collapsed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeBlockContent {
    #[serde(default)]
    pub language: Option<String>,
    pub code: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRow {
    pub cells: Vec<Vec<Inline>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableContent {
    #[serde(default)]
    pub align: Option<Vec<Option<TableAlign>>>,
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MathBlockContent {
    pub latex: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FootnoteDefContent {
    pub key: String,
    #[serde(default)]
    pub inline: Option<Vec<Inline>>,
}

/// Content of one block, checked against the fixed shape of its type.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockContent {
    Paragraph(ParagraphContent),
    Heading(HeadingContent),
    List(ListContent),
    ListItem(ListItemContent),
    Blockquote(EmptyContent),
    Callout(CalloutContent),
    CodeBlock(CodeBlockContent),
    ThematicBreak(EmptyContent),
    Table(TableContent),
    MathBlock(MathBlockContent),
    FootnoteDef(FootnoteDefContent),
}

impl BlockContent {
    pub fn parse(block_type: BlockType, value: &Value) -> Result<Self, ContentError> {
        let content = match block_type {
            BlockType::Paragraph => Self::Paragraph(decode(block_type, value)?),
            BlockType::Heading => {
                let heading: HeadingContent = decode(block_type, value)?;
                if !(1..=6).contains(&heading.level) {
                    return Err(malformed(block_type, "level must be between 1 and 6"));
                }
                Self::Heading(heading)
            }
            BlockType::List => Self::List(decode(block_type, value)?),
            BlockType::ListItem => Self::ListItem(decode(block_type, value)?),
            BlockType::Blockquote => Self::Blockquote(decode(block_type, value)?),
            BlockType::Callout => {
                let callout: CalloutContent = decode(block_type, value)?;
                if callout.kind.trim().is_empty() {
                    return Err(malformed(block_type, "kind must not be empty"));
                }
                Self::Callout(callout)
            }
            BlockType::CodeBlock => Self::CodeBlock(decode(block_type, value)?),
            BlockType::ThematicBreak => Self::ThematicBreak(decode(block_type, value)?),
            BlockType::Table => Self::Table(decode(block_type, value)?),
            BlockType::MathBlock => Self::MathBlock(decode(block_type, value)?),
            BlockType::FootnoteDef => {
                let footnote: FootnoteDefContent = decode(block_type, value)?;
                if footnote.key.trim().is_empty() {
                    return Err(malformed(block_type, "key must not be empty"));
                }
                Self::FootnoteDef(footnote)
            }
        };
        Ok(content)
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Paragraph(_) => BlockType::Paragraph,
            Self::Heading(_) => BlockType::Heading,
            Self::List(_) => BlockType::List,
            Self::ListItem(_) => BlockType::ListItem,
            Self::Blockquote(_) => BlockType::Blockquote,
            Self::Callout(_) => BlockType::Callout,
            Self::CodeBlock(_) => BlockType::CodeBlock,
            Self::ThematicBreak(_) => BlockType::ThematicBreak,
            Self::Table(_) => BlockType::Table,
            Self::MathBlock(_) => BlockType::MathBlock,
            Self::FootnoteDef(_) => BlockType::FootnoteDef,
        }
    }
}

fn decode<T: DeserializeOwned>(block_type: BlockType, value: &Value) -> Result<T, ContentError> {
    T::deserialize(value).map_err(|err| malformed(block_type, err.to_string()))
}

fn malformed(block_type: BlockType, reason: impl Into<String>) -> ContentError {
    ContentError::Malformed {
        block_type: block_type.as_str(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests;
