#![forbid(unsafe_code)]

use super::super::blocks::{block_state_tx, parse_stored_block_type, subtree_ids_tx};
use super::super::refs::{delete_block_refs_tx, reindex_block_refs_tx};
use super::super::search::{delete_search_entry_tx, upsert_search_entry_tx};
use super::placement::{SiblingScope, resolve_order_key_tx, restored_order_key};
use super::validate::*;
use super::*;
use quire_core::{
    BlockId, BlockOp, DeleteBlock, MoveBlock, Placement, UpdateBlock, parse_block_type,
};
use serde_json::json;

/// A block about to be inserted, from a `block.insert` op or an import.
pub(in crate::store) struct NewBlock<'a> {
    pub(in crate::store) id: &'a BlockId,
    pub(in crate::store) parent: Option<&'a BlockId>,
    pub(in crate::store) position: NewPosition<'a>,
    pub(in crate::store) block_type: &'a str,
    pub(in crate::store) content: &'a Value,
    pub(in crate::store) meta: Option<&'a Value>,
}

pub(in crate::store) enum NewPosition<'a> {
    Requested(Placement),
    /// A key this store allocated earlier, carried by an export. It is
    /// exempt from the explicit-key length cap.
    Restored(&'a str),
}

pub(super) fn apply_op_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    op: &BlockOp,
    now_ms: i64,
    applied: &mut AppliedBlocks,
) -> PatchStep<()> {
    match op {
        BlockOp::Insert(insert) => {
            let block = NewBlock {
                id: &insert.block_id,
                parent: insert.parent_block_id.as_ref(),
                position: NewPosition::Requested(insert.placement()),
                block_type: &insert.block_type,
                content: &insert.content,
                meta: insert.meta.as_ref(),
            };
            insert_block_tx(tx, object_id, &block, now_ms)?;
            applied.inserted_block_ids.push(insert.block_id.clone());
        }
        BlockOp::Update(update) => {
            update_block_tx(tx, object_id, update, now_ms)?;
            applied.updated_block_ids.push(update.block_id.clone());
        }
        BlockOp::Move(mv) => {
            move_block_tx(tx, object_id, mv, now_ms)?;
            applied.moved_block_ids.push(mv.block_id.clone());
        }
        BlockOp::Delete(delete) => {
            delete_block_tx(tx, object_id, delete, now_ms)?;
            applied.deleted_block_ids.push(delete.block_id.clone());
        }
    }
    Ok(())
}

pub(in crate::store) fn insert_block_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    block: &NewBlock<'_>,
    now_ms: i64,
) -> PatchStep<()> {
    if block_state_tx(tx, block.id.as_str())?.is_some() {
        return Err(ApiError::validation("block id already exists")
            .with_details(json!({ "blockId": block.id.as_str() }))
            .into());
    }
    let block_type = parse_block_type(block.block_type)?;
    let content = parse_content(block_type, block.content)?;
    if block.meta.is_some_and(|meta| !meta.is_object()) {
        return Err(ApiError::validation("meta must be a JSON object").into());
    }
    if let Some(parent) = block.parent {
        ensure_parent_tx(tx, object_id, parent)?;
    }

    let scope = SiblingScope {
        object_id,
        parent: block.parent,
        moving: None,
    };
    let order_key = match &block.position {
        NewPosition::Requested(placement) => resolve_order_key_tx(tx, &scope, placement)?,
        NewPosition::Restored(key) => restored_order_key(key)?,
    };
    ensure_reference_targets_tx(tx, &content)?;

    let content_json = serde_json::to_string(block.content)?;
    let meta_json = block.meta.map(serde_json::to_string).transpose()?;
    tx.execute(
        "INSERT INTO blocks(id, object_id, parent_block_id, order_key, block_type, content_json, \
                            meta_json, deleted_at_ms, created_at_ms, updated_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?8)",
        params![
            block.id.as_str(),
            object_id.as_str(),
            block.parent.map(BlockId::as_str),
            order_key,
            block_type.as_str(),
            content_json,
            meta_json,
            now_ms,
        ],
    )?;

    reindex_block_refs_tx(tx, object_id, block.id, &content)?;
    upsert_search_entry_tx(tx, object_id, block.id, &content)?;
    Ok(())
}

fn update_block_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    op: &UpdateBlock,
    now_ms: i64,
) -> PatchStep<()> {
    let state = load_live_target_tx(tx, object_id, &op.block_id)?;
    let stored_type = parse_stored_block_type(&state.block_type)?;

    if let Some(requested) = op.patch.block_type.as_deref() {
        let requested = parse_block_type(requested)?;
        if requested != stored_type {
            return Err(ApiError::validation("blockType cannot be changed by block.update")
                .with_details(json!({
                    "blockId": op.block_id.as_str(),
                    "blockType": requested.as_str(),
                    "currentBlockType": stored_type.as_str(),
                }))
                .into());
        }
    }

    if let Some(content_value) = op.patch.content.as_ref() {
        let content = parse_content(stored_type, content_value)?;
        ensure_reference_targets_tx(tx, &content)?;
        tx.execute(
            "UPDATE blocks SET content_json=?2 WHERE id=?1",
            params![op.block_id.as_str(), serde_json::to_string(content_value)?],
        )?;
        reindex_block_refs_tx(tx, object_id, &op.block_id, &content)?;
        upsert_search_entry_tx(tx, object_id, &op.block_id, &content)?;
    }

    if let Some(meta) = op.patch.meta.as_ref() {
        tx.execute(
            "UPDATE blocks SET meta_json=?2 WHERE id=?1",
            params![op.block_id.as_str(), serde_json::to_string(meta)?],
        )?;
    }

    tx.execute(
        "UPDATE blocks SET updated_at_ms=?2 WHERE id=?1",
        params![op.block_id.as_str(), now_ms],
    )?;
    Ok(())
}

fn move_block_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    op: &MoveBlock,
    now_ms: i64,
) -> PatchStep<()> {
    load_live_target_tx(tx, object_id, &op.block_id)?;
    if let Some(parent) = op.new_parent_block_id.as_ref() {
        ensure_parent_tx(tx, object_id, parent)?;
        ensure_no_cycle_tx(tx, &op.block_id, parent)?;
    }

    let scope = SiblingScope {
        object_id,
        parent: op.new_parent_block_id.as_ref(),
        moving: Some(&op.block_id),
    };
    let order_key = resolve_order_key_tx(tx, &scope, &op.placement())?;
    tx.execute(
        "UPDATE blocks SET parent_block_id=?2, order_key=?3, updated_at_ms=?4 WHERE id=?1",
        params![
            op.block_id.as_str(),
            op.new_parent_block_id.as_ref().map(BlockId::as_str),
            order_key,
            now_ms,
        ],
    )?;
    Ok(())
}

/// Soft delete. Already-deleted blocks are accepted and keep their original
/// deletion time.
fn delete_block_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    op: &DeleteBlock,
    now_ms: i64,
) -> PatchStep<()> {
    load_target_tx(tx, object_id, &op.block_id)?;
    let ids = if op.subtree {
        subtree_ids_tx(tx, op.block_id.as_str())?
    } else {
        vec![op.block_id.as_str().to_string()]
    };

    for id in &ids {
        tx.execute(
            "UPDATE blocks SET deleted_at_ms=?2, updated_at_ms=?2 \
             WHERE id=?1 AND deleted_at_ms IS NULL",
            params![id, now_ms],
        )?;
        delete_block_refs_tx(tx, id)?;
        delete_search_entry_tx(tx, id)?;
    }
    tracing::trace!(block_id = %op.block_id, removed = ids.len(), "soft-deleted");
    Ok(())
}
