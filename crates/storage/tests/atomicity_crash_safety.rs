#![forbid(unsafe_code)]

mod common;

use common::*;
use quire_core::{BlockId, ErrorCode, ObjectId};
use quire_storage::{DB_FILE_NAME, SearchQuery, SqliteStore};
use rusqlite::{Connection, params};
use serde_json::json;

#[test]
fn rejected_patch_leaves_no_index_rows() {
    let (dir, mut store) = open_store();
    let target = create_object(&mut store, "Target");
    let object = create_object(&mut store, "Atomic");
    let linked = new_block();

    let err = patch(
        &mut store,
        &object,
        json!([
            insert_op(
                &linked,
                None,
                json!({ "inline": [{ "t": "text", "text": "atomic words" }, object_ref(&target)] }),
            ),
            move_op(&linked, Some(&linked)),
        ]),
    )
    .expect_err("second op is a cycle");
    assert_eq!(err.code, ErrorCode::InvariantCycle);

    assert_eq!(count_rows(dir.path(), "blocks"), 0);
    assert_eq!(count_rows(dir.path(), "refs"), 0);
    assert_eq!(count_rows(dir.path(), "search_entries"), 0);
    assert!(
        store
            .search_blocks(&SearchQuery {
                query: "atomic".to_string(),
                ..SearchQuery::default()
            })
            .expect("search")
            .is_empty()
    );
    assert_eq!(doc_version(&store, &object), 0);
}

#[test]
fn committed_patch_survives_reopen() {
    let (dir, mut store) = open_store();
    let object = create_object(&mut store, "Durable");
    let block = new_block();
    patch_ok(&mut store, &object, json!([insert_op(&block, None, paragraph("kept"))]));
    drop(store);

    let reopened = SqliteStore::open(dir.path()).expect("open store again");
    assert_eq!(doc_version(&reopened, &object), 1);
    assert_eq!(child_ids(&reopened, &object, None), vec![block]);
}

#[test]
fn uncommitted_transaction_is_not_persisted_after_reopen() {
    let (dir, store) = open_store();
    drop(store);
    let object = ObjectId::generate();
    let block = BlockId::generate();

    let db_path = dir.path().join(DB_FILE_NAME);
    {
        let mut conn = Connection::open(&db_path).expect("open db");
        let tx = conn.transaction().expect("begin tx");
        tx.execute(
            "INSERT INTO objects (id, object_type, title, doc_version, deleted_at_ms, created_at_ms, updated_at_ms) \
             VALUES (?1, 'page', 'Ghost', 0, NULL, 0, 0)",
            params![object.as_str()],
        )
        .expect("insert object");
        tx.execute(
            "INSERT INTO blocks (id, object_id, parent_block_id, order_key, block_type, content_json, \
                                 meta_json, deleted_at_ms, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, NULL, 'V', 'paragraph', '{\"inline\":[]}', NULL, NULL, 0, 0)",
            params![block.as_str(), object.as_str()],
        )
        .expect("insert block");
        // Drop without commit -> rollback (simulated crash before commit).
    }

    let store = SqliteStore::open(dir.path()).expect("open store again");
    assert!(store.get_object(&object).expect("get object").is_none());
    assert!(store.get_block(&block).expect("get block").is_none());
}

#[test]
fn foreign_keys_are_enforced_as_a_backstop() {
    let (dir, store) = open_store();
    drop(store);

    let conn = Connection::open(dir.path().join(DB_FILE_NAME)).expect("open db");
    conn.execute_batch("PRAGMA foreign_keys = ON;").expect("enable fks");
    let err = conn
        .execute(
            "INSERT INTO blocks (id, object_id, parent_block_id, order_key, block_type, content_json, \
                                 meta_json, deleted_at_ms, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, NULL, 'V', 'paragraph', '{}', NULL, NULL, 0, 0)",
            params![BlockId::generate().as_str(), ObjectId::generate().as_str()],
        )
        .expect_err("dangling object id");
    assert!(err.to_string().contains("FOREIGN KEY"), "{err}");
}
