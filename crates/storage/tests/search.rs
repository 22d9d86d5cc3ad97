#![forbid(unsafe_code)]

mod common;

use common::*;
use quire_core::{BlockId, ObjectId};
use quire_storage::{SearchQuery, SqliteStore, StoreConfig};
use serde_json::json;

fn hits(store: &SqliteStore, query: &str) -> Vec<BlockId> {
    search(store, SearchQuery {
        query: query.to_string(),
        ..SearchQuery::default()
    })
}

fn search(store: &SqliteStore, query: SearchQuery) -> Vec<BlockId> {
    let mut ids: Vec<BlockId> = store
        .search_blocks(&query)
        .expect("search")
        .into_iter()
        .map(|hit| hit.block_id)
        .collect();
    ids.sort();
    ids
}

fn seeded(store: &mut SqliteStore) -> (ObjectId, BlockId, BlockId) {
    let object = create_object(store, "Journal");
    let (greeting, farewell) = (new_block(), new_block());
    patch_ok(
        store,
        &object,
        json!([
            insert_op(&greeting, None, paragraph("Hello brave world")),
            insert_op(&farewell, None, paragraph("Goodbye cruel world")),
        ]),
    );
    (object, greeting, farewell)
}

#[test]
fn terms_match_as_case_insensitive_prefixes() {
    let (_dir, mut store) = open_store();
    let (_, greeting, farewell) = seeded(&mut store);

    assert_eq!(hits(&store, "hel"), vec![greeting.clone()]);
    assert_eq!(hits(&store, "HELLO"), vec![greeting.clone()]);
    let mut both = vec![greeting.clone(), farewell.clone()];
    both.sort();
    assert_eq!(hits(&store, "wor"), both);
    assert_eq!(hits(&store, "world good"), vec![farewell]);
    assert!(hits(&store, "hello cruel").is_empty());
    // Terms anchor at token starts; inner substrings do not match.
    assert!(hits(&store, "ello").is_empty());
    assert!(hits(&store, "orld").is_empty());
}

#[test]
fn blank_or_punctuation_queries_return_nothing() {
    let (_dir, mut store) = open_store();
    seeded(&mut store);

    assert!(hits(&store, "").is_empty());
    assert!(hits(&store, "   \t").is_empty());
    assert!(hits(&store, "\" * -").is_empty());
}

#[test]
fn hits_carry_title_and_marked_snippet() {
    let (_dir, mut store) = open_store();
    let (object, greeting, _) = seeded(&mut store);

    let results = store
        .search_blocks(&SearchQuery {
            query: "brave".to_string(),
            ..SearchQuery::default()
        })
        .expect("search");
    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.block_id, greeting);
    assert_eq!(hit.object_id, object);
    assert_eq!(hit.object_title, "Journal");
    assert!(hit.snippet.contains("<mark>brave</mark>"), "{}", hit.snippet);
}

#[test]
fn deleted_blocks_and_objects_are_hidden() {
    let (_dir, mut store) = open_store();
    let (object, greeting, farewell) = seeded(&mut store);

    patch_ok(&mut store, &object, json!([delete_op(&greeting, false)]));
    assert_eq!(hits(&store, "world"), vec![farewell]);

    store.soft_delete_object(&object).expect("delete object");
    assert!(hits(&store, "world").is_empty());
}

#[test]
fn subtree_delete_removes_descendant_entries() {
    let (_dir, mut store) = open_store();
    let object = create_object(&mut store, "Tree");
    let (parent, child) = (new_block(), new_block());
    patch_ok(
        &mut store,
        &object,
        json!([
            insert_op(&parent, None, paragraph("outline")),
            insert_op(&child, Some(&parent), paragraph("outline detail")),
        ]),
    );

    patch_ok(&mut store, &object, json!([delete_op(&parent, true)]));
    assert!(hits(&store, "outline").is_empty());
}

#[test]
fn update_reindexes_text() {
    let (_dir, mut store) = open_store();
    let (object, greeting, _) = seeded(&mut store);

    patch_ok(
        &mut store,
        &object,
        json!([{
            "op": "block.update",
            "blockId": greeting.as_str(),
            "patch": { "content": paragraph("Salutations everyone") }
        }]),
    );
    assert!(hits(&store, "brave").is_empty());
    assert_eq!(hits(&store, "salut"), vec![greeting]);
}

#[test]
fn object_filter_narrows_results() {
    let (_dir, mut store) = open_store();
    let (journal, greeting, farewell) = seeded(&mut store);
    let other = create_object(&mut store, "Elsewhere");
    patch_ok(&mut store, &other, json!([insert_op(&new_block(), None, paragraph("world news"))]));

    assert_eq!(hits(&store, "world").len(), 3);
    let mut expected = vec![greeting, farewell];
    expected.sort();
    assert_eq!(
        search(&store, SearchQuery {
            query: "world".to_string(),
            object_id: Some(journal),
            limit: None,
        }),
        expected
    );
}

#[test]
fn tags_code_and_ref_aliases_are_searchable() {
    let (_dir, mut store) = open_store();
    let object = create_object(&mut store, "Mixed");
    let (tagged, code, aliased) = (new_block(), new_block(), new_block());

    let mut code_op = insert_op(&code, None, json!({ "language": "rust", "code": "fn frobnicate() {}" }));
    code_op["blockType"] = json!("code_block");
    let alias = json!({
        "inline": [{
            "t": "ref",
            "mode": "link",
            "alias": "quarterly plan",
            "target": { "kind": "object", "objectId": object.as_str() }
        }]
    });
    patch_ok(
        &mut store,
        &object,
        json!([
            insert_op(&tagged, None, json!({ "inline": [{ "t": "tag", "value": "urgent" }] })),
            code_op,
            insert_op(&aliased, None, alias),
        ]),
    );

    assert_eq!(hits(&store, "urgent"), vec![tagged]);
    assert_eq!(hits(&store, "frobni"), vec![code]);
    assert_eq!(hits(&store, "quarter"), vec![aliased]);
}

#[test]
fn limit_defaults_and_clamps_to_config() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = StoreConfig::new(dir.path());
    config.search_default_limit = 2;
    config.search_max_limit = 3;
    let mut store = SqliteStore::open_with_config(config).expect("open store");

    let object = create_object(&mut store, "Many");
    let ops: Vec<_> = (0..5)
        .map(|_| insert_op(&new_block(), None, paragraph("repeated phrase")))
        .collect();
    patch_ok(&mut store, &object, json!(ops));

    let count = |limit: Option<usize>| {
        store
            .search_blocks(&SearchQuery {
                query: "repeated".to_string(),
                object_id: None,
                limit,
            })
            .expect("search")
            .len()
    };
    assert_eq!(count(None), 2);
    assert_eq!(count(Some(1)), 1);
    assert_eq!(count(Some(50)), 3);
    assert_eq!(count(Some(0)), 0);
}
