#![forbid(unsafe_code)]

use super::*;
use quire_core::{BlockOp, ObjectId, PatchResult};
use sha2::{Digest, Sha256};
use std::fmt::Write;

pub(super) struct IdempotencyRecord {
    pub(super) ops_sha256: String,
    pub(super) result: PatchResult,
}

impl SqliteStore {
    /// Drops idempotency records created before `created_before_ms`. Keys
    /// pruned this way execute again on their next submission.
    pub fn prune_idempotency_records(&mut self, created_before_ms: i64) -> Result<usize, StoreError> {
        let tx = self.write_tx()?;
        let removed = tx.execute(
            "DELETE FROM idempotency WHERE created_at_ms < ?1",
            params![created_before_ms],
        )?;
        tx.commit()?;
        tracing::info!(removed, created_before_ms, "pruned idempotency records");
        Ok(removed)
    }
}

/// Hex SHA-256 of the canonical JSON form of `ops`.
pub(super) fn ops_fingerprint(ops: &[BlockOp]) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(ops)?;
    let digest = Sha256::digest(&bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

pub(super) fn lookup_idempotency_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    key: &str,
) -> Result<Option<IdempotencyRecord>, StoreError> {
    let row = tx
        .query_row(
            "SELECT ops_sha256, result_json FROM idempotency WHERE object_id=?1 AND idem_key=?2",
            params![object_id.as_str(), key],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    let Some((ops_sha256, result_json)) = row else {
        return Ok(None);
    };
    let result = serde_json::from_str(&result_json)?;
    Ok(Some(IdempotencyRecord { ops_sha256, result }))
}

pub(super) fn store_idempotency_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    key: &str,
    ops_sha256: &str,
    result: &PatchResult,
    now_ms: i64,
) -> Result<(), StoreError> {
    let result_json = serde_json::to_string(result)?;
    tx.execute(
        "INSERT INTO idempotency(object_id, idem_key, ops_sha256, result_json, created_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![object_id.as_str(), key, ops_sha256, result_json, now_ms],
    )?;
    Ok(())
}
