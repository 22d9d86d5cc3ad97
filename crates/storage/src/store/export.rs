#![forbid(unsafe_code)]

use super::objects::{insert_object_tx, load_object_row};
use super::patch::{NewBlock, NewPosition, PatchStep, insert_block_tx, settle_tx};
use super::*;
use quire_core::{ApiError, ApiResult, BlockId, ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const EXPORT_FORMAT: &str = "quire.object.v1";

/// Self-contained snapshot of one object and its live tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectExport {
    pub format: String,
    pub exported_at: String,
    pub object: ExportedObject,
    /// Tree pre-order, so every parent precedes its children.
    pub blocks: Vec<ExportedBlock>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedObject {
    pub id: ObjectId,
    pub object_type: String,
    pub title: String,
    pub doc_version: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedBlock {
    pub id: BlockId,
    pub parent_block_id: Option<BlockId>,
    pub order_key: String,
    pub block_type: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl SqliteStore {
    pub fn export_object(&self, id: &ObjectId) -> Result<ApiResult<ObjectExport>, StoreError> {
        let Some(object) = load_object_row(&self.conn, id)?.filter(|row| !row.is_deleted()) else {
            return Ok(Err(ApiError::not_found_object(id.as_str())));
        };

        let blocks = self
            .list_object_blocks(id)?
            .into_iter()
            .map(|block| ExportedBlock {
                id: block.id,
                parent_block_id: block.parent_block_id,
                order_key: block.order_key,
                block_type: block.block_type.as_str().to_string(),
                content: block.content,
                meta: block.meta,
            })
            .collect();

        Ok(Ok(ObjectExport {
            format: EXPORT_FORMAT.to_string(),
            exported_at: ms_to_rfc3339(now_ms()),
            object: ExportedObject {
                id: object.id,
                object_type: object.object_type,
                title: object.title,
                doc_version: object.doc_version,
            },
            blocks,
        }))
    }

    /// Recreates an exported object at version 0. Blocks go through the same
    /// insert path as `block.insert`, so content, references and search are
    /// validated and indexed exactly as for a patch.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(object_id = %export.object.id, blocks = export.blocks.len())
    )]
    pub fn import_object(
        &mut self,
        export: &ObjectExport,
    ) -> Result<ApiResult<ObjectRow>, StoreError> {
        if export.format != EXPORT_FORMAT {
            return Ok(Err(ApiError::validation("unsupported export format")
                .with_details(json!({ "format": export.format }))));
        }
        if export.object.object_type.trim().is_empty() {
            return Ok(Err(ApiError::validation("objectType must not be empty")));
        }

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let step = import_object_tx(&tx, export, now_ms);
        let outcome = settle_tx(tx, step)?;
        if outcome.is_ok() {
            tracing::info!(object_id = %export.object.id, "imported object");
        }
        Ok(outcome)
    }
}

fn import_object_tx(
    tx: &Transaction<'_>,
    export: &ObjectExport,
    now_ms: i64,
) -> PatchStep<ObjectRow> {
    let object = &export.object;
    if load_object_row(tx, &object.id)?.is_some() {
        return Err(ApiError::validation("object already exists")
            .with_details(json!({ "objectId": object.id.as_str() }))
            .into());
    }
    insert_object_tx(tx, &object.id, object.object_type.trim(), &object.title, now_ms)?;

    for (index, block) in export.blocks.iter().enumerate() {
        let new_block = NewBlock {
            id: &block.id,
            parent: block.parent_block_id.as_ref(),
            position: NewPosition::Restored(&block.order_key),
            block_type: &block.block_type,
            content: &block.content,
            meta: block.meta.as_ref(),
        };
        insert_block_tx(tx, &object.id, &new_block, now_ms).map_err(|err| err.at_op(index))?;
    }

    load_object_row(tx, &object.id)?
        .ok_or(StoreError::UnknownId)
        .map_err(Into::into)
}
