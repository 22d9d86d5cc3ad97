use super::*;
use crate::ids::{BlockId, ObjectId};
use serde_json::json;

fn object_id() -> ObjectId {
    ObjectId::try_new("01J000000000000000000000AA").unwrap()
}

fn block_id() -> BlockId {
    BlockId::try_new("01J000000000000000000000BB").unwrap()
}

#[test]
fn block_type_names_parse_back() {
    for block_type in BlockType::ALL {
        assert_eq!(BlockType::parse(block_type.as_str()).unwrap(), block_type);
    }
    assert_eq!(
        BlockType::parse("video").unwrap_err(),
        ContentError::UnknownBlockType("video".to_string())
    );
}

#[test]
fn heading_level_is_bounded() {
    let ok = json!({"level": 2, "inline": [{"t": "text", "text": "Title"}]});
    assert!(BlockContent::parse(BlockType::Heading, &ok).is_ok());

    let bad = json!({"level": 7, "inline": []});
    let err = BlockContent::parse(BlockType::Heading, &bad).unwrap_err();
    assert!(matches!(err, ContentError::Malformed { block_type: "heading", .. }));
}

#[test]
fn unknown_fields_are_rejected() {
    let value = json!({"inline": [], "color": "red"});
    let err = BlockContent::parse(BlockType::Paragraph, &value).unwrap_err();
    assert!(err.to_string().contains("color"), "{err}");
}

#[test]
fn empty_shapes_take_an_empty_object() {
    assert!(BlockContent::parse(BlockType::ThematicBreak, &json!({})).is_ok());
    assert!(BlockContent::parse(BlockType::Blockquote, &json!({"x": 1})).is_err());
}

#[test]
fn callout_and_footnote_need_their_keys() {
    assert!(BlockContent::parse(BlockType::Callout, &json!({"kind": " "})).is_err());
    assert!(BlockContent::parse(BlockType::FootnoteDef, &json!({"key": ""})).is_err());
    assert!(BlockContent::parse(BlockType::FootnoteDef, &json!({"key": "1"})).is_ok());
}

#[test]
fn references_are_found_inside_links_and_cells() {
    let object = object_id();
    let block = block_id();
    let value = json!({
        "rows": [
            {"cells": [
                [{"t": "ref", "mode": "link", "target": {"kind": "object", "objectId": object.as_str()}}],
                [{"t": "link", "href": "https://example.org", "children": [
                    {"t": "ref", "mode": "embed", "target": {
                        "kind": "block", "objectId": object.as_str(), "blockId": block.as_str()
                    }}
                ]}]
            ]}
        ]
    });
    let content = BlockContent::parse(BlockType::Table, &value).unwrap();
    let refs = content.references();
    assert_eq!(
        refs,
        vec![
            ContentRef {
                target_object_id: object.clone(),
                target_block_id: None,
            },
            ContentRef {
                target_object_id: object,
                target_block_id: Some(block),
            },
        ]
    );
}

#[test]
fn ref_target_rejects_malformed_ids() {
    let value = json!({"inline": [
        {"t": "ref", "mode": "link", "target": {"kind": "object", "objectId": "short"}}
    ]});
    assert!(BlockContent::parse(BlockType::Paragraph, &value).is_err());
}

#[test]
fn plain_text_flattens_runs() {
    let value = json!({"inline": [
        {"t": "text", "text": "Hello", "marks": ["strong"]},
        {"t": "hard_break"},
        {"t": "link", "href": "https://example.org", "children": [{"t": "text", "text": "world"}]},
        {"t": "text", "text": " "},
        {"t": "tag", "value": "draft"},
        {"t": "math_inline", "latex": "x^2"}
    ]});
    let content = BlockContent::parse(BlockType::Paragraph, &value).unwrap();
    assert_eq!(content.plain_text(), "Hello world #draft");
}

#[test]
fn plain_text_covers_code_and_callout_title() {
    let code = BlockContent::parse(
        BlockType::CodeBlock,
        &json!({"language": "rust", "code": "fn main() {}"}),
    )
    .unwrap();
    assert_eq!(code.plain_text(), "fn main() {}");

    let callout =
        BlockContent::parse(BlockType::Callout, &json!({"kind": "note", "title": "Heads up"}))
            .unwrap();
    assert_eq!(callout.plain_text(), "Heads up");

    let rule = BlockContent::parse(BlockType::ThematicBreak, &json!({})).unwrap();
    assert_eq!(rule.plain_text(), "");
}
