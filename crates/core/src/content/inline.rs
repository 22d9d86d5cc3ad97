#![forbid(unsafe_code)]

use crate::ids::{BlockId, ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Em,
    Strong,
    Code,
    Strike,
    Highlight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefMode {
    Link,
    Embed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefTarget {
    Object {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
    },
    Block {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        #[serde(rename = "blockId")]
        block_id: BlockId,
    },
}

impl RefTarget {
    pub fn object_id(&self) -> &ObjectId {
        match self {
            Self::Object { object_id } | Self::Block { object_id, .. } => object_id,
        }
    }

    pub fn block_id(&self) -> Option<&BlockId> {
        match self {
            Self::Object { .. } => None,
            Self::Block { block_id, .. } => Some(block_id),
        }
    }
}

/// Inline run inside a text-bearing block, tagged by `"t"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
    Link {
        href: String,
        children: Vec<Inline>,
    },
    Ref {
        mode: RefMode,
        target: RefTarget,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Tag {
        value: String,
    },
    MathInline {
        latex: String,
    },
    FootnoteRef {
        key: String,
    },
}
