#![forbid(unsafe_code)]

use super::*;
use quire_core::ObjectId;

#[derive(Clone, Debug)]
pub struct CreateObjectRequest {
    pub object_type: String,
    pub title: String,
    /// Generated when absent.
    pub id: Option<ObjectId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRow {
    pub id: ObjectId,
    pub object_type: String,
    pub title: String,
    pub doc_version: i64,
    pub deleted_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl ObjectRow {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at_ms.is_some()
    }
}

impl SqliteStore {
    pub fn create_object(&mut self, request: CreateObjectRequest) -> Result<ObjectRow, StoreError> {
        let object_type = request.object_type.trim();
        if object_type.is_empty() {
            return Err(StoreError::InvalidInput("object_type must not be empty"));
        }
        let id = request.id.unwrap_or_else(ObjectId::generate);

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        if load_object_row(&tx, &id)?.is_some() {
            return Err(StoreError::InvalidInput("object already exists"));
        }
        insert_object_tx(&tx, &id, object_type, &request.title, now_ms)?;
        let row = require_object_row(&tx, &id)?;
        tx.commit()?;

        tracing::debug!(object_id = %id, object_type, "created object");
        Ok(row)
    }

    pub fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectRow>, StoreError> {
        load_object_row(&self.conn, id)
    }

    pub fn rename_object(&mut self, id: &ObjectId, title: &str) -> Result<ObjectRow, StoreError> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE objects SET title=?2, updated_at_ms=?3 WHERE id=?1",
            params![id.as_str(), title, now_ms()],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownId);
        }
        let row = require_object_row(&tx, id)?;
        tx.commit()?;
        Ok(row)
    }

    /// Marks the object deleted; repeated calls keep the first timestamp.
    pub fn soft_delete_object(&mut self, id: &ObjectId) -> Result<ObjectRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE objects \
             SET deleted_at_ms=COALESCE(deleted_at_ms, ?2), updated_at_ms=?2 \
             WHERE id=?1",
            params![id.as_str(), now_ms],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownId);
        }
        let row = require_object_row(&tx, id)?;
        tx.commit()?;
        tracing::debug!(object_id = %id, "soft-deleted object");
        Ok(row)
    }
}

pub(super) fn insert_object_tx(
    tx: &Transaction<'_>,
    id: &ObjectId,
    object_type: &str,
    title: &str,
    now_ms: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO objects(id, object_type, title, doc_version, deleted_at_ms, created_at_ms, updated_at_ms) \
         VALUES (?1, ?2, ?3, 0, NULL, ?4, ?4)",
        params![id.as_str(), object_type, title, now_ms],
    )?;
    Ok(())
}

pub(super) fn load_object_row(conn: &Connection, id: &ObjectId) -> Result<Option<ObjectRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT object_type, title, doc_version, deleted_at_ms, created_at_ms, updated_at_ms \
             FROM objects WHERE id=?1",
            params![id.as_str()],
            |row| {
                Ok(ObjectRow {
                    id: id.clone(),
                    object_type: row.get(0)?,
                    title: row.get(1)?,
                    doc_version: row.get(2)?,
                    deleted_at_ms: row.get(3)?,
                    created_at_ms: row.get(4)?,
                    updated_at_ms: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn require_object_row(conn: &Connection, id: &ObjectId) -> Result<ObjectRow, StoreError> {
    load_object_row(conn, id)?.ok_or(StoreError::UnknownId)
}

/// Current version of a live object, `None` when missing or soft-deleted.
pub(super) fn live_doc_version_tx(
    tx: &Transaction<'_>,
    id: &ObjectId,
) -> Result<Option<i64>, StoreError> {
    let version = tx
        .query_row(
            "SELECT doc_version FROM objects WHERE id=?1 AND deleted_at_ms IS NULL",
            params![id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(version)
}

pub(super) fn object_exists_tx(tx: &Transaction<'_>, id: &str) -> Result<bool, StoreError> {
    let found = tx
        .query_row("SELECT 1 FROM objects WHERE id=?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
