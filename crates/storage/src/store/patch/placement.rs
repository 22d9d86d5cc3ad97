#![forbid(unsafe_code)]

use super::*;
use quire_core::{
    BlockId, OrderKeyError, Place, Placement, key_between, validate_explicit_order_key,
    validate_order_key,
};
use serde_json::json;

/// Where a block is going: its object, its parent, and (for moves) itself,
/// which never counts as its own sibling.
pub(super) struct SiblingScope<'a> {
    pub(super) object_id: &'a ObjectId,
    pub(super) parent: Option<&'a BlockId>,
    pub(super) moving: Option<&'a BlockId>,
}

impl SiblingScope<'_> {
    fn parent_param(&self) -> Option<&str> {
        self.parent.map(BlockId::as_str)
    }

    fn moving_param(&self) -> Option<&str> {
        self.moving.map(BlockId::as_str)
    }
}

/// Computes the order key for `placement` among the live siblings in `scope`.
pub(super) fn resolve_order_key_tx(
    tx: &Transaction<'_>,
    scope: &SiblingScope<'_>,
    placement: &Placement,
) -> PatchStep<String> {
    match placement {
        Placement::Explicit(key) => {
            validate_explicit_order_key(key).map_err(|err| invalid_key(err, key))?;
            Ok(key.clone())
        }
        Placement::Place(Place::End) => {
            let last = edge_sibling_key_tx(tx, scope, Edge::Last)?;
            allocate(last.as_deref(), None)
        }
        Placement::Place(Place::Start) => {
            let first = edge_sibling_key_tx(tx, scope, Edge::First)?;
            allocate(None, first.as_deref())
        }
        Placement::Place(Place::Before { sibling_block_id }) => {
            let anchor = sibling_key_tx(tx, scope, sibling_block_id)?;
            let before = neighbour_key_tx(tx, scope, sibling_block_id, &anchor, Side::Before)?;
            allocate(before.as_deref(), Some(&anchor))
        }
        Placement::Place(Place::After { sibling_block_id }) => {
            let anchor = sibling_key_tx(tx, scope, sibling_block_id)?;
            let after = neighbour_key_tx(tx, scope, sibling_block_id, &anchor, Side::After)?;
            allocate(Some(&anchor), after.as_deref())
        }
    }
}

/// Checks a key restored from an export; its length is not capped.
pub(super) fn restored_order_key(key: &str) -> PatchStep<String> {
    validate_order_key(key).map_err(|err| invalid_key(err, key))?;
    Ok(key.to_string())
}

fn invalid_key(err: OrderKeyError, key: &str) -> PatchError {
    ApiError::validation(err.to_string())
        .with_details(json!({ "orderKey": key }))
        .into()
}

fn allocate(lower: Option<&str>, upper: Option<&str>) -> PatchStep<String> {
    key_between(lower, upper).map_err(|err| {
        ApiError::validation(format!("cannot place block between siblings: {err}"))
            .with_details(json!({ "lowerOrderKey": lower, "upperOrderKey": upper }))
            .into()
    })
}

#[derive(Clone, Copy)]
enum Edge {
    First,
    Last,
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

fn edge_sibling_key_tx(
    tx: &Transaction<'_>,
    scope: &SiblingScope<'_>,
    edge: Edge,
) -> PatchStep<Option<String>> {
    let sql = match edge {
        Edge::First => {
            "SELECT order_key FROM blocks \
             WHERE object_id=?1 AND parent_block_id IS ?2 AND deleted_at_ms IS NULL \
               AND (?3 IS NULL OR id <> ?3) \
             ORDER BY order_key ASC, id ASC LIMIT 1"
        }
        Edge::Last => {
            "SELECT order_key FROM blocks \
             WHERE object_id=?1 AND parent_block_id IS ?2 AND deleted_at_ms IS NULL \
               AND (?3 IS NULL OR id <> ?3) \
             ORDER BY order_key DESC, id DESC LIMIT 1"
        }
    };
    let key = tx
        .query_row(
            sql,
            params![scope.object_id.as_str(), scope.parent_param(), scope.moving_param()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(key)
}

/// Key of the `before`/`after` anchor, which must be a live sibling in scope.
fn sibling_key_tx(
    tx: &Transaction<'_>,
    scope: &SiblingScope<'_>,
    sibling: &BlockId,
) -> PatchStep<String> {
    if scope.moving == Some(sibling) {
        return Err(ApiError::not_found_block(sibling.as_str()).into());
    }
    let key = tx
        .query_row(
            "SELECT order_key FROM blocks \
             WHERE id=?1 AND object_id=?2 AND parent_block_id IS ?3 AND deleted_at_ms IS NULL",
            params![sibling.as_str(), scope.object_id.as_str(), scope.parent_param()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    key.ok_or_else(|| ApiError::not_found_block(sibling.as_str()).into())
}

/// The sibling right next to the anchor in (order_key, id) order.
fn neighbour_key_tx(
    tx: &Transaction<'_>,
    scope: &SiblingScope<'_>,
    anchor_id: &BlockId,
    anchor_key: &str,
    side: Side,
) -> PatchStep<Option<String>> {
    let sql = match side {
        Side::Before => {
            "SELECT order_key FROM blocks \
             WHERE object_id=?1 AND parent_block_id IS ?2 AND deleted_at_ms IS NULL \
               AND (?3 IS NULL OR id <> ?3) \
               AND (order_key < ?4 OR (order_key = ?4 AND id < ?5)) \
             ORDER BY order_key DESC, id DESC LIMIT 1"
        }
        Side::After => {
            "SELECT order_key FROM blocks \
             WHERE object_id=?1 AND parent_block_id IS ?2 AND deleted_at_ms IS NULL \
               AND (?3 IS NULL OR id <> ?3) \
               AND (order_key > ?4 OR (order_key = ?4 AND id > ?5)) \
             ORDER BY order_key ASC, id ASC LIMIT 1"
        }
    };
    let key = tx
        .query_row(
            sql,
            params![
                scope.object_id.as_str(),
                scope.parent_param(),
                scope.moving_param(),
                anchor_key,
                anchor_id.as_str(),
            ],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(key)
}
