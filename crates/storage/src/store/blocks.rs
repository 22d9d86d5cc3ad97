#![forbid(unsafe_code)]

use super::*;
use quire_core::{BlockId, BlockType, ObjectId};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct BlockRow {
    pub id: BlockId,
    pub object_id: ObjectId,
    pub parent_block_id: Option<BlockId>,
    pub order_key: String,
    pub block_type: BlockType,
    pub content: Value,
    pub meta: Option<Value>,
    pub deleted_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl BlockRow {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at_ms.is_some()
    }
}

const BLOCK_COLUMNS: &str = "id, object_id, parent_block_id, order_key, block_type, content_json, \
     meta_json, deleted_at_ms, created_at_ms, updated_at_ms";

impl SqliteStore {
    /// Any block by id, soft-deleted ones included.
    pub fn get_block(&self, id: &BlockId) -> Result<Option<BlockRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE id=?1"))?;
        let mut rows = stmt.query(params![id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(read_block_row(row)?)),
            None => Ok(None),
        }
    }

    /// Live children of `parent` (top-level blocks for `None`), in sibling order.
    pub fn list_children(
        &self,
        object_id: &ObjectId,
        parent: Option<&BlockId>,
    ) -> Result<Vec<BlockRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM blocks \
             WHERE object_id=?1 AND parent_block_id IS ?2 AND deleted_at_ms IS NULL \
             ORDER BY order_key ASC, id ASC"
        ))?;
        let mut rows = stmt.query(params![object_id.as_str(), parent.map(BlockId::as_str)])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_block_row(row)?);
        }
        Ok(out)
    }

    /// Live blocks reachable from the object's roots, in tree pre-order.
    /// A block under a soft-deleted ancestor is not reachable.
    pub fn list_object_blocks(&self, object_id: &ObjectId) -> Result<Vec<BlockRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM blocks \
             WHERE object_id=?1 AND deleted_at_ms IS NULL \
             ORDER BY order_key ASC, id ASC"
        ))?;
        let mut rows = stmt.query(params![object_id.as_str()])?;
        let mut children: HashMap<Option<BlockId>, Vec<BlockRow>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let block = read_block_row(row)?;
            children
                .entry(block.parent_block_id.clone())
                .or_default()
                .push(block);
        }

        let mut out = Vec::new();
        let mut stack: Vec<BlockRow> = children.remove(&None).unwrap_or_default();
        stack.reverse();
        while let Some(block) = stack.pop() {
            if let Some(mut kids) = children.remove(&Some(block.id.clone())) {
                kids.reverse();
                stack.extend(kids);
            }
            out.push(block);
        }
        Ok(out)
    }
}

fn read_block_row(row: &rusqlite::Row<'_>) -> Result<BlockRow, StoreError> {
    let id: String = row.get(0)?;
    let object_id: String = row.get(1)?;
    let parent_block_id: Option<String> = row.get(2)?;
    let block_type: String = row.get(4)?;
    let content_json: String = row.get(5)?;
    let meta_json: Option<String> = row.get(6)?;

    Ok(BlockRow {
        id: parse_block_id(id)?,
        object_id: ObjectId::try_new(object_id)
            .map_err(|err| StoreError::CorruptRow(format!("blocks.object_id: {err}")))?,
        parent_block_id: parent_block_id.map(parse_block_id).transpose()?,
        order_key: row.get(3)?,
        block_type: parse_stored_block_type(&block_type)?,
        content: serde_json::from_str(&content_json)?,
        meta: meta_json.as_deref().map(serde_json::from_str).transpose()?,
        deleted_at_ms: row.get(7)?,
        created_at_ms: row.get(8)?,
        updated_at_ms: row.get(9)?,
    })
}

fn parse_block_id(value: String) -> Result<BlockId, StoreError> {
    BlockId::try_new(value).map_err(|err| StoreError::CorruptRow(format!("block id: {err}")))
}

pub(super) fn parse_stored_block_type(value: &str) -> Result<BlockType, StoreError> {
    BlockType::parse(value).map_err(|err| StoreError::CorruptRow(err.to_string()))
}

/// The columns the tree validator needs about one block.
#[derive(Clone, Debug)]
pub(super) struct BlockState {
    pub(super) object_id: String,
    pub(super) block_type: String,
    pub(super) deleted: bool,
}

pub(super) fn block_state_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Option<BlockState>, StoreError> {
    let state = tx
        .query_row(
            "SELECT object_id, block_type, deleted_at_ms FROM blocks WHERE id=?1",
            params![id],
            |row| {
                Ok(BlockState {
                    object_id: row.get(0)?,
                    block_type: row.get(1)?,
                    deleted: row.get::<_, Option<i64>>(2)?.is_some(),
                })
            },
        )
        .optional()?;
    Ok(state)
}

pub(super) fn parent_of_tx(tx: &Transaction<'_>, id: &str) -> Result<Option<String>, StoreError> {
    let parent = tx
        .query_row(
            "SELECT parent_block_id FROM blocks WHERE id=?1",
            params![id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(parent.flatten())
}

/// The block and every transitive descendant, deleted or not.
pub(super) fn subtree_ids_tx(tx: &Transaction<'_>, root: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = tx.prepare(
        "WITH RECURSIVE subtree(id) AS ( \
           SELECT ?1 \
           UNION \
           SELECT b.id FROM blocks b JOIN subtree s ON b.parent_block_id = s.id \
         ) \
         SELECT id FROM subtree",
    )?;
    let mut rows = stmt.query(params![root])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, String>(0)?);
    }
    Ok(out)
}
