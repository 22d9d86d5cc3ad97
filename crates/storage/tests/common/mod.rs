#![forbid(unsafe_code)]
#![allow(dead_code)]

use quire_core::{ApiResult, BlockId, ObjectId, PatchResult};
use quire_storage::{CreateObjectRequest, SqliteStore};
use serde_json::{Value, json};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("quire_storage=debug")
        .try_init();
}

/// A store in a fresh temp directory; keep the `TempDir` alive for the test.
pub fn open_store() -> (TempDir, SqliteStore) {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

pub fn create_object(store: &mut SqliteStore, title: &str) -> ObjectId {
    store
        .create_object(CreateObjectRequest {
            object_type: "page".to_string(),
            title: title.to_string(),
            id: None,
        })
        .expect("create object")
        .id
}

pub fn new_block() -> BlockId {
    BlockId::generate()
}

pub fn paragraph(text: &str) -> Value {
    json!({ "inline": [{ "t": "text", "text": text }] })
}

pub fn object_ref(target: &ObjectId) -> Value {
    json!({ "t": "ref", "mode": "link", "target": { "kind": "object", "objectId": target.as_str() } })
}

pub fn block_ref(target: &ObjectId, block: &BlockId) -> Value {
    json!({
        "t": "ref",
        "mode": "embed",
        "target": { "kind": "block", "objectId": target.as_str(), "blockId": block.as_str() }
    })
}

pub fn insert_op(block: &BlockId, parent: Option<&BlockId>, content: Value) -> Value {
    json!({
        "op": "block.insert",
        "blockId": block.as_str(),
        "parentBlockId": parent.map(BlockId::as_str),
        "blockType": "paragraph",
        "content": content,
    })
}

pub fn insert_placed(block: &BlockId, parent: Option<&BlockId>, place: Value) -> Value {
    let mut op = insert_op(block, parent, paragraph("placed"));
    op["place"] = place;
    op
}

pub fn move_op(block: &BlockId, new_parent: Option<&BlockId>) -> Value {
    json!({
        "op": "block.move",
        "blockId": block.as_str(),
        "newParentBlockId": new_parent.map(BlockId::as_str),
    })
}

pub fn delete_op(block: &BlockId, subtree: bool) -> Value {
    json!({ "op": "block.delete", "blockId": block.as_str(), "subtree": subtree })
}

pub fn envelope(object: &ObjectId, ops: Value) -> Value {
    json!({ "apiVersion": "v1", "objectId": object.as_str(), "ops": ops })
}

/// Applies `ops` with no version or idempotency guard.
pub fn patch(store: &mut SqliteStore, object: &ObjectId, ops: Value) -> ApiResult<PatchResult> {
    store
        .apply_block_patch_json(&envelope(object, ops))
        .expect("patch must not fail fatally")
}

pub fn patch_ok(store: &mut SqliteStore, object: &ObjectId, ops: Value) -> PatchResult {
    patch(store, object, ops).expect("patch accepted")
}

pub fn child_ids(store: &SqliteStore, object: &ObjectId, parent: Option<&BlockId>) -> Vec<BlockId> {
    store
        .list_children(object, parent)
        .expect("list children")
        .into_iter()
        .map(|block| block.id)
        .collect()
}

pub fn doc_version(store: &SqliteStore, object: &ObjectId) -> i64 {
    store
        .get_object(object)
        .expect("get object")
        .expect("object exists")
        .doc_version
}

pub fn count_rows(store_dir: &std::path::Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(store_dir.join(quire_storage::DB_FILE_NAME))
        .expect("open db");
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}
