#![forbid(unsafe_code)]

use super::*;
use quire_core::{BlockContent, BlockId, ObjectId};

/// One incoming reference to an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacklinkRow {
    pub source_block_id: BlockId,
    pub source_object_id: ObjectId,
    pub source_object_title: String,
    pub target_object_id: ObjectId,
    pub target_block_id: Option<BlockId>,
}

/// One outgoing reference of a block, in content order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceRow {
    pub target_object_id: ObjectId,
    pub target_block_id: Option<BlockId>,
}

impl SqliteStore {
    /// Every reference to `target` whose source block is live.
    pub fn backlinks(&self, target: &ObjectId) -> Result<Vec<BacklinkRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.source_block_id, r.source_object_id, o.title, r.target_block_id \
             FROM refs r \
             JOIN blocks b ON b.id = r.source_block_id \
             JOIN objects o ON o.id = r.source_object_id \
             WHERE r.target_object_id=?1 AND b.deleted_at_ms IS NULL \
             ORDER BY r.source_object_id ASC, r.source_block_id ASC, r.ordinal ASC",
        )?;
        let mut rows = stmt.query(params![target.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(BacklinkRow {
                source_block_id: stored_block_id(row.get(0)?)?,
                source_object_id: stored_object_id(row.get(1)?)?,
                source_object_title: row.get(2)?,
                target_object_id: target.clone(),
                target_block_id: row
                    .get::<_, Option<String>>(3)?
                    .map(stored_block_id)
                    .transpose()?,
            });
        }
        Ok(out)
    }

    pub fn block_references(&self, block_id: &BlockId) -> Result<Vec<ReferenceRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT target_object_id, target_block_id FROM refs \
             WHERE source_block_id=?1 ORDER BY ordinal ASC",
        )?;
        let mut rows = stmt.query(params![block_id.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(ReferenceRow {
                target_object_id: stored_object_id(row.get(0)?)?,
                target_block_id: row
                    .get::<_, Option<String>>(1)?
                    .map(stored_block_id)
                    .transpose()?,
            });
        }
        Ok(out)
    }
}

/// Replaces the block's reference rows with the refs found in `content`.
pub(super) fn reindex_block_refs_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    block_id: &BlockId,
    content: &BlockContent,
) -> Result<usize, StoreError> {
    delete_block_refs_tx(tx, block_id.as_str())?;

    let refs = content.references();
    let mut insert = tx.prepare_cached(
        "INSERT INTO refs(source_block_id, ordinal, source_object_id, target_object_id, target_block_id) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (ordinal, reference) in refs.iter().enumerate() {
        insert.execute(params![
            block_id.as_str(),
            to_sqlite_i64(ordinal)?,
            object_id.as_str(),
            reference.target_object_id.as_str(),
            reference.target_block_id.as_ref().map(BlockId::as_str),
        ])?;
    }
    Ok(refs.len())
}

pub(super) fn delete_block_refs_tx(tx: &Transaction<'_>, block_id: &str) -> Result<(), StoreError> {
    tx.execute("DELETE FROM refs WHERE source_block_id=?1", params![block_id])?;
    Ok(())
}

fn stored_block_id(value: String) -> Result<BlockId, StoreError> {
    BlockId::try_new(value).map_err(|err| StoreError::CorruptRow(format!("refs block id: {err}")))
}

fn stored_object_id(value: String) -> Result<ObjectId, StoreError> {
    ObjectId::try_new(value).map_err(|err| StoreError::CorruptRow(format!("refs object id: {err}")))
}
