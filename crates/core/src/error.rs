#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Validation,
    NotFoundObject,
    NotFoundBlock,
    ConflictVersion,
    InvariantParentDeleted,
    InvariantCrossObject,
    InvariantCycle,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFoundObject => "NOT_FOUND_OBJECT",
            Self::NotFoundBlock => "NOT_FOUND_BLOCK",
            Self::ConflictVersion => "CONFLICT_VERSION",
            Self::InvariantParentDeleted => "INVARIANT_PARENT_DELETED",
            Self::InvariantCrossObject => "INVARIANT_CROSS_OBJECT",
            Self::InvariantCycle => "INVARIANT_CYCLE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, caller-recoverable rejection. A patch that yields one of these
/// left no trace in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_found_object(object_id: &str) -> Self {
        Self::new(ErrorCode::NotFoundObject, "object not found")
            .with_details(json!({ "objectId": object_id }))
    }

    pub fn not_found_block(block_id: &str) -> Self {
        Self::new(ErrorCode::NotFoundBlock, "block not found")
            .with_details(json!({ "blockId": block_id }))
    }

    pub fn conflict_version(expected: i64, actual: i64) -> Self {
        Self::new(ErrorCode::ConflictVersion, "document version mismatch")
            .with_details(json!({ "expected": expected, "actual": actual }))
    }

    pub fn parent_deleted(parent_block_id: &str) -> Self {
        Self::new(ErrorCode::InvariantParentDeleted, "parent block is deleted")
            .with_details(json!({ "parentBlockId": parent_block_id }))
    }

    pub fn cross_object(block_id: &str, expected_object_id: &str, actual_object_id: &str) -> Self {
        Self::new(
            ErrorCode::InvariantCrossObject,
            "block belongs to a different object",
        )
        .with_details(json!({
            "blockId": block_id,
            "expectedObjectId": expected_object_id,
            "actualObjectId": actual_object_id,
        }))
    }

    pub fn cycle(block_id: &str, new_parent_block_id: &str) -> Self {
        Self::new(
            ErrorCode::InvariantCycle,
            "move would make the block its own ancestor",
        )
        .with_details(json!({
            "blockId": block_id,
            "newParentBlockId": new_parent_block_id,
        }))
    }

    /// Tags the error with the position of the failing op inside its patch.
    pub fn at_op(mut self, op_index: usize) -> Self {
        let mut details = match self.details.take() {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = Map::new();
                map.insert("info".to_string(), other);
                map
            }
            None => Map::new(),
        };
        details.insert("opIndex".to_string(), json!(op_index));
        self.details = Some(Value::Object(details));
        self
    }

    /// Wire form: `{success:false, error:{code, message, details?}}`.
    pub fn to_envelope(&self) -> Value {
        json!({ "success": false, "error": self })
    }
}
