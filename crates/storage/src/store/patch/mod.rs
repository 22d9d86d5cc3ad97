#![forbid(unsafe_code)]

mod apply;
mod placement;
mod validate;

use super::idempotency::{lookup_idempotency_tx, ops_fingerprint, store_idempotency_tx};
use super::objects::live_doc_version_tx;
use super::*;
use quire_core::{API_VERSION, ApiError, ApiResult, AppliedBlocks, ObjectId, PatchInput, PatchResult};
use serde_json::Value;

pub(super) use apply::{NewBlock, NewPosition, insert_block_tx};

/// Outcome of one step inside a patch transaction. `Rejected` is a typed
/// answer for the caller; `Fatal` means storage itself failed.
#[derive(Debug)]
pub(super) enum PatchError {
    Rejected(ApiError),
    Fatal(StoreError),
}

impl PatchError {
    pub(super) fn at_op(self, index: usize) -> Self {
        match self {
            Self::Rejected(err) => Self::Rejected(err.at_op(index)),
            fatal => fatal,
        }
    }
}

impl From<ApiError> for PatchError {
    fn from(value: ApiError) -> Self {
        Self::Rejected(value)
    }
}

impl From<StoreError> for PatchError {
    fn from(value: StoreError) -> Self {
        Self::Fatal(value)
    }
}

impl From<rusqlite::Error> for PatchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Fatal(value.into())
    }
}

impl From<serde_json::Error> for PatchError {
    fn from(value: serde_json::Error) -> Self {
        Self::Fatal(value.into())
    }
}

pub(super) type PatchStep<T> = Result<T, PatchError>;

/// Commits on success; rolls back on either failure class.
pub(super) fn settle_tx<T>(
    tx: Transaction<'_>,
    step: PatchStep<T>,
) -> Result<ApiResult<T>, StoreError> {
    match step {
        Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
        }
        Err(PatchError::Rejected(err)) => {
            tx.rollback()?;
            tracing::debug!(code = %err.code, message = %err.message, "rejected, rolled back");
            Ok(Err(err))
        }
        Err(PatchError::Fatal(err)) => {
            tracing::error!(error = %err, "store failure, rolling back");
            Err(err)
        }
    }
}

impl SqliteStore {
    /// Applies every op of `input` atomically.
    ///
    /// The outer `Err` is a storage failure; the inner one a typed rejection.
    /// Either way nothing of the patch is visible afterwards.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(object_id = %input.object_id, ops = input.ops.len())
    )]
    pub fn apply_block_patch(
        &mut self,
        input: &PatchInput,
    ) -> Result<ApiResult<PatchResult>, StoreError> {
        if let Err(err) = input.validate() {
            tracing::debug!(code = %err.code, message = %err.message, "invalid patch envelope");
            return Ok(Err(err));
        }

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let step = apply_patch_tx(&tx, input, now_ms);
        let outcome = settle_tx(tx, step)?;
        if let Ok(result) = &outcome {
            tracing::debug!(
                previous = result.previous_doc_version,
                new = result.new_doc_version,
                "patch committed"
            );
        }
        Ok(outcome)
    }

    /// Decodes a raw request body, then behaves as [`Self::apply_block_patch`].
    pub fn apply_block_patch_json(
        &mut self,
        value: &Value,
    ) -> Result<ApiResult<PatchResult>, StoreError> {
        match PatchInput::from_json(value) {
            Ok(input) => self.apply_block_patch(&input),
            Err(err) => Ok(Err(err)),
        }
    }
}

fn apply_patch_tx(
    tx: &Transaction<'_>,
    input: &PatchInput,
    now_ms: i64,
) -> PatchStep<PatchResult> {
    let object_id = &input.object_id;
    let Some(current) = live_doc_version_tx(tx, object_id)? else {
        return Err(ApiError::not_found_object(object_id.as_str()).into());
    };

    if let Some(expected) = input.base_doc_version
        && expected != current
    {
        tracing::info!(expected, actual = current, "doc version conflict");
        return Err(ApiError::conflict_version(expected, current).into());
    }

    let fingerprint = match input.idempotency_key.as_deref() {
        Some(key) => {
            let fingerprint = ops_fingerprint(&input.ops)?;
            if let Some(record) = lookup_idempotency_tx(tx, object_id, key)? {
                if record.ops_sha256 != fingerprint {
                    tracing::warn!(
                        idempotency_key = key,
                        "idempotency key reused with different ops; returning the recorded result"
                    );
                }
                tracing::debug!(idempotency_key = key, "idempotent replay");
                return Ok(record.result);
            }
            Some(fingerprint)
        }
        None => None,
    };

    let mut applied = AppliedBlocks::default();
    for (index, op) in input.ops.iter().enumerate() {
        tracing::trace!(index, op = op.name(), block_id = %op.block_id(), "applying op");
        apply::apply_op_tx(tx, object_id, op, now_ms, &mut applied)
            .map_err(|err| err.at_op(index))?;
    }

    let new_version = bump_doc_version_tx(tx, object_id, current, now_ms)?;
    let result = PatchResult {
        api_version: API_VERSION.to_string(),
        object_id: object_id.clone(),
        previous_doc_version: current,
        new_doc_version: new_version,
        applied,
    };

    if let (Some(key), Some(fingerprint)) = (input.idempotency_key.as_deref(), fingerprint) {
        store_idempotency_tx(tx, object_id, key, &fingerprint, &result, now_ms)?;
    }
    Ok(result)
}

/// Compare-and-set on the version read at the start of the patch.
fn bump_doc_version_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    expected: i64,
    now_ms: i64,
) -> PatchStep<i64> {
    let changed = tx.execute(
        "UPDATE objects SET doc_version=doc_version + 1, updated_at_ms=?3 \
         WHERE id=?1 AND doc_version=?2",
        params![object_id.as_str(), expected, now_ms],
    )?;
    if changed == 1 {
        return Ok(expected + 1);
    }
    let actual = live_doc_version_tx(tx, object_id)?.unwrap_or(expected);
    Err(ApiError::conflict_version(expected, actual).into())
}
