#![forbid(unsafe_code)]

//! Patch envelope: what a caller submits and what a committed patch returns.

use crate::content::{BlockContent, BlockType};
use crate::error::{ApiError, ApiResult};
use crate::ids::{BlockId, ObjectId};
use crate::order_key::validate_explicit_order_key;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const API_VERSION: &str = "v1";
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchInput {
    pub api_version: String,
    pub object_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_doc_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub ops: Vec<BlockOp>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum BlockOp {
    #[serde(rename = "block.insert")]
    Insert(InsertBlock),
    #[serde(rename = "block.update")]
    Update(UpdateBlock),
    #[serde(rename = "block.move")]
    Move(MoveBlock),
    #[serde(rename = "block.delete")]
    Delete(DeleteBlock),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertBlock {
    pub block_id: BlockId,
    pub parent_block_id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_key: Option<String>,
    pub block_type: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlock {
    pub block_id: BlockId,
    pub patch: BlockPatch,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
}

impl BlockPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.meta.is_none() && self.block_type.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBlock {
    pub block_id: BlockId,
    pub new_parent_block_id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBlock {
    pub block_id: BlockId,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub subtree: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "where", rename_all = "lowercase")]
pub enum Place {
    Start,
    End,
    Before {
        #[serde(rename = "siblingBlockId")]
        sibling_block_id: BlockId,
    },
    After {
        #[serde(rename = "siblingBlockId")]
        sibling_block_id: BlockId,
    },
}

/// Resolved position request for an insert or move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Place(Place),
    /// Caller-chosen key, stored verbatim.
    Explicit(String),
}

fn placement(place: &Option<Place>, order_key: &Option<String>) -> Placement {
    match (order_key, place) {
        (Some(key), _) => Placement::Explicit(key.clone()),
        (None, Some(place)) => Placement::Place(place.clone()),
        (None, None) => Placement::Place(Place::End),
    }
}

impl InsertBlock {
    pub fn placement(&self) -> Placement {
        placement(&self.place, &self.order_key)
    }
}

impl MoveBlock {
    pub fn placement(&self) -> Placement {
        placement(&self.place, &self.order_key)
    }
}

impl BlockOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "block.insert",
            Self::Update(_) => "block.update",
            Self::Move(_) => "block.move",
            Self::Delete(_) => "block.delete",
        }
    }

    pub fn block_id(&self) -> &BlockId {
        match self {
            Self::Insert(op) => &op.block_id,
            Self::Update(op) => &op.block_id,
            Self::Move(op) => &op.block_id,
            Self::Delete(op) => &op.block_id,
        }
    }

    fn validate(&self) -> ApiResult<()> {
        match self {
            Self::Insert(op) => {
                validate_placement(&op.place, &op.order_key)?;
                let block_type = parse_block_type(&op.block_type)?;
                BlockContent::parse(block_type, &op.content)
                    .map_err(|err| ApiError::validation(err.to_string()))?;
                validate_meta(op.meta.as_ref())
            }
            Self::Update(op) => {
                if op.patch.is_empty() {
                    return Err(ApiError::validation(
                        "block.update patch must set content, meta or blockType",
                    ));
                }
                if let Some(block_type) = op.patch.block_type.as_deref() {
                    let block_type = parse_block_type(block_type)?;
                    if let Some(content) = op.patch.content.as_ref() {
                        BlockContent::parse(block_type, content)
                            .map_err(|err| ApiError::validation(err.to_string()))?;
                    }
                }
                validate_meta(op.patch.meta.as_ref())
            }
            Self::Move(op) => validate_placement(&op.place, &op.order_key),
            Self::Delete(_) => Ok(()),
        }
    }
}

pub fn parse_block_type(value: &str) -> ApiResult<BlockType> {
    BlockType::parse(value).map_err(|err| {
        ApiError::validation(err.to_string()).with_details(json!({ "blockType": value }))
    })
}

fn validate_placement(place: &Option<Place>, order_key: &Option<String>) -> ApiResult<()> {
    if place.is_some() && order_key.is_some() {
        return Err(ApiError::validation(
            "place and orderKey are mutually exclusive",
        ));
    }
    if let Some(key) = order_key {
        validate_explicit_order_key(key).map_err(|err| {
            ApiError::validation(err.to_string()).with_details(json!({ "orderKey": key }))
        })?;
    }
    Ok(())
}

fn validate_meta(meta: Option<&Value>) -> ApiResult<()> {
    match meta {
        None | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(ApiError::validation("meta must be a JSON object")),
    }
}

impl PatchInput {
    /// Decodes and validates a raw request body.
    pub fn from_json(value: &Value) -> ApiResult<Self> {
        if let Some(version) = value.get("apiVersion").and_then(Value::as_str)
            && version != API_VERSION
        {
            return Err(unsupported_version(version));
        }
        let input: Self = Self::deserialize(value)
            .map_err(|err| ApiError::validation(format!("invalid patch: {err}")))?;
        input.validate()?;
        Ok(input)
    }

    /// Envelope and per-op checks that need no stored state.
    pub fn validate(&self) -> ApiResult<()> {
        if self.api_version != API_VERSION {
            return Err(unsupported_version(&self.api_version));
        }
        if let Some(version) = self.base_doc_version
            && version < 0
        {
            return Err(ApiError::validation("baseDocVersion must not be negative"));
        }
        if let Some(key) = self.idempotency_key.as_deref() {
            if key.trim().is_empty() {
                return Err(ApiError::validation("idempotencyKey must not be empty"));
            }
            if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
                return Err(ApiError::validation(format!(
                    "idempotencyKey must be at most {MAX_IDEMPOTENCY_KEY_LEN} bytes"
                )));
            }
        }
        if self.ops.is_empty() {
            return Err(ApiError::validation("ops must not be empty"));
        }
        for (index, op) in self.ops.iter().enumerate() {
            op.validate().map_err(|err| err.at_op(index))?;
        }
        Ok(())
    }
}

fn unsupported_version(version: &str) -> ApiError {
    ApiError::validation(format!("unsupported apiVersion (expected {API_VERSION})"))
        .with_details(json!({ "apiVersion": version }))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedBlocks {
    pub inserted_block_ids: Vec<BlockId>,
    pub updated_block_ids: Vec<BlockId>,
    pub moved_block_ids: Vec<BlockId>,
    pub deleted_block_ids: Vec<BlockId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResult {
    pub api_version: String,
    pub object_id: ObjectId,
    pub previous_doc_version: i64,
    pub new_doc_version: i64,
    pub applied: AppliedBlocks,
}

/// Wire envelope for either outcome of a patch.
pub fn patch_response_json(result: &ApiResult<PatchResult>) -> Value {
    match result {
        Ok(result) => json!({ "success": true, "result": result }),
        Err(err) => err.to_envelope(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const OBJECT: &str = "01J000000000000000000000AA";
    const BLOCK: &str = "01J000000000000000000000BB";
    const SIBLING: &str = "01J000000000000000000000CC";

    fn paragraph(text: &str) -> Value {
        json!({ "inline": [{ "t": "text", "text": text }] })
    }

    fn envelope(ops: Value) -> Value {
        json!({ "apiVersion": "v1", "objectId": OBJECT, "ops": ops })
    }

    #[test]
    fn decodes_every_op_kind() {
        let value = envelope(json!([
            {
                "op": "block.insert",
                "blockId": BLOCK,
                "parentBlockId": null,
                "place": { "where": "before", "siblingBlockId": SIBLING },
                "blockType": "paragraph",
                "content": paragraph("hi")
            },
            { "op": "block.update", "blockId": BLOCK, "patch": { "meta": { "pinned": true } } },
            { "op": "block.move", "blockId": BLOCK, "newParentBlockId": SIBLING, "orderKey": "V" },
            { "op": "block.delete", "blockId": BLOCK, "subtree": true }
        ]));
        let input = PatchInput::from_json(&value).unwrap();
        assert_eq!(input.ops.len(), 4);
        assert_eq!(input.base_doc_version, None);

        let BlockOp::Insert(insert) = &input.ops[0] else {
            panic!("expected insert");
        };
        assert_eq!(
            insert.placement(),
            Placement::Place(Place::Before {
                sibling_block_id: BlockId::try_new(SIBLING).unwrap()
            })
        );
        let BlockOp::Move(mv) = &input.ops[2] else {
            panic!("expected move");
        };
        assert_eq!(mv.placement(), Placement::Explicit("V".to_string()));
        assert!(matches!(&input.ops[3], BlockOp::Delete(op) if op.subtree));
        assert_eq!(input.ops[1].name(), "block.update");
    }

    #[test]
    fn missing_place_means_end() {
        let value = envelope(json!([{
            "op": "block.insert",
            "blockId": BLOCK,
            "parentBlockId": null,
            "blockType": "thematic_break",
            "content": {}
        }]));
        let input = PatchInput::from_json(&value).unwrap();
        let BlockOp::Insert(insert) = &input.ops[0] else {
            panic!("expected insert");
        };
        assert_eq!(insert.placement(), Placement::Place(Place::End));
    }

    #[test]
    fn rejects_envelope_problems() {
        let mut value = envelope(json!([]));
        let err = PatchInput::from_json(&value).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(err.message.contains("ops"));

        value["apiVersion"] = json!("v2");
        let err = PatchInput::from_json(&value).unwrap_err();
        assert_eq!(err.details, Some(json!({ "apiVersion": "v2" })));

        let value = json!({ "apiVersion": "v1", "objectId": "bad", "ops": [] });
        assert_eq!(
            PatchInput::from_json(&value).unwrap_err().code,
            ErrorCode::Validation
        );

        let mut value = envelope(json!([{ "op": "block.delete", "blockId": BLOCK }]));
        value["idempotencyKey"] = json!("   ");
        assert!(PatchInput::from_json(&value).is_err());
        value["idempotencyKey"] = json!("k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1));
        assert!(PatchInput::from_json(&value).is_err());
        value["idempotencyKey"] = json!("k1");
        value["baseDocVersion"] = json!(-1);
        assert!(PatchInput::from_json(&value).is_err());
    }

    #[test]
    fn op_errors_carry_their_index() {
        let value = envelope(json!([
            { "op": "block.delete", "blockId": BLOCK },
            {
                "op": "block.move",
                "blockId": BLOCK,
                "newParentBlockId": null,
                "place": { "where": "start" },
                "orderKey": "V"
            }
        ]));
        let err = PatchInput::from_json(&value).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.details.unwrap()["opIndex"], json!(1));
    }

    #[test]
    fn rejects_bad_content_meta_and_keys() {
        let cases = [
            json!({
                "op": "block.insert", "blockId": BLOCK, "parentBlockId": null,
                "blockType": "heading", "content": { "level": 9, "inline": [] }
            }),
            json!({
                "op": "block.insert", "blockId": BLOCK, "parentBlockId": null,
                "blockType": "video", "content": {}
            }),
            json!({
                "op": "block.insert", "blockId": BLOCK, "parentBlockId": null,
                "blockType": "paragraph", "content": paragraph("x"), "meta": [1, 2]
            }),
            json!({
                "op": "block.insert", "blockId": BLOCK, "parentBlockId": null,
                "orderKey": "a0", "blockType": "paragraph", "content": paragraph("x")
            }),
            json!({ "op": "block.update", "blockId": BLOCK, "patch": {} }),
            json!({
                "op": "block.update", "blockId": BLOCK,
                "patch": { "blockType": "code_block", "content": { "latex": "x" } }
            }),
        ];
        for op in cases {
            let err = PatchInput::from_json(&envelope(json!([op.clone()]))).unwrap_err();
            assert_eq!(err.code, ErrorCode::Validation, "{op}");
            assert_eq!(err.details.unwrap()["opIndex"], json!(0), "{op}");
        }
    }

    #[test]
    fn unknown_op_is_a_validation_error() {
        let value = envelope(json!([{ "op": "block.copy", "blockId": BLOCK }]));
        let err = PatchInput::from_json(&value).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[test]
    fn response_envelope_wraps_both_outcomes() {
        let result = PatchResult {
            api_version: API_VERSION.to_string(),
            object_id: ObjectId::try_new(OBJECT).unwrap(),
            previous_doc_version: 0,
            new_doc_version: 1,
            applied: AppliedBlocks {
                inserted_block_ids: vec![BlockId::try_new(BLOCK).unwrap()],
                ..AppliedBlocks::default()
            },
        };
        let ok = patch_response_json(&Ok(result));
        assert_eq!(ok["success"], json!(true));
        assert_eq!(ok["result"]["newDocVersion"], json!(1));
        assert_eq!(ok["result"]["applied"]["insertedBlockIds"], json!([BLOCK]));
        assert_eq!(ok["result"]["applied"]["deletedBlockIds"], json!([]));

        let err = patch_response_json(&Err(ApiError::conflict_version(5, 0)));
        assert_eq!(err["success"], json!(false));
        assert_eq!(err["error"]["code"], json!("CONFLICT_VERSION"));
    }
}
