#![forbid(unsafe_code)]

//! Tree invariants checked against stored state before a block is written.

use super::super::blocks::{BlockState, block_state_tx, parent_of_tx};
use super::super::objects::object_exists_tx;
use super::*;
use quire_core::{BlockContent, BlockId, BlockType};
use serde_json::json;
use std::collections::BTreeSet;

/// A new parent must exist, be live and live in the same object.
pub(super) fn ensure_parent_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    parent: &BlockId,
) -> PatchStep<()> {
    let Some(state) = block_state_tx(tx, parent.as_str())? else {
        return Err(ApiError::not_found_block(parent.as_str()).into());
    };
    if state.object_id != object_id.as_str() {
        return Err(
            ApiError::cross_object(parent.as_str(), object_id.as_str(), &state.object_id).into(),
        );
    }
    if state.deleted {
        return Err(ApiError::parent_deleted(parent.as_str()).into());
    }
    Ok(())
}

/// The op's own block: it must exist and belong to the patched object.
pub(super) fn load_target_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    block_id: &BlockId,
) -> PatchStep<BlockState> {
    let Some(state) = block_state_tx(tx, block_id.as_str())? else {
        return Err(ApiError::not_found_block(block_id.as_str()).into());
    };
    if state.object_id != object_id.as_str() {
        return Err(
            ApiError::cross_object(block_id.as_str(), object_id.as_str(), &state.object_id).into(),
        );
    }
    Ok(state)
}

/// Same as [`load_target_tx`], but a soft-deleted block counts as missing.
pub(super) fn load_live_target_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    block_id: &BlockId,
) -> PatchStep<BlockState> {
    let state = load_target_tx(tx, object_id, block_id)?;
    if state.deleted {
        return Err(ApiError::not_found_block(block_id.as_str()).into());
    }
    Ok(state)
}

/// Walks up from `new_parent` to the root; meeting `block` means the move
/// would hang the block below itself.
pub(super) fn ensure_no_cycle_tx(
    tx: &Transaction<'_>,
    block: &BlockId,
    new_parent: &BlockId,
) -> PatchStep<()> {
    let mut seen = BTreeSet::new();
    let mut current = Some(new_parent.as_str().to_string());
    while let Some(id) = current {
        if id == block.as_str() {
            return Err(ApiError::cycle(block.as_str(), new_parent.as_str()).into());
        }
        if !seen.insert(id.clone()) {
            return Err(StoreError::CorruptRow(format!("parent chain loops at block {id}")).into());
        }
        current = parent_of_tx(tx, &id)?;
    }
    Ok(())
}

pub(super) fn parse_content(block_type: BlockType, content: &Value) -> PatchStep<BlockContent> {
    BlockContent::parse(block_type, content).map_err(|err| {
        ApiError::validation(err.to_string())
            .with_details(json!({ "blockType": block_type.as_str() }))
            .into()
    })
}

/// Every object named by a ref node must exist; block targets are not checked.
pub(super) fn ensure_reference_targets_tx(
    tx: &Transaction<'_>,
    content: &BlockContent,
) -> PatchStep<()> {
    let targets: BTreeSet<String> = content
        .references()
        .into_iter()
        .map(|reference| reference.target_object_id.into_string())
        .collect();
    for target in targets {
        if !object_exists_tx(tx, &target)? {
            return Err(ApiError::validation("reference target object does not exist")
                .with_details(json!({ "targetObjectId": target }))
                .into());
        }
    }
    Ok(())
}
