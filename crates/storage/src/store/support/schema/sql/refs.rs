#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- One row per ref node; `ordinal` is the node's position in the content walk.
        CREATE TABLE IF NOT EXISTS refs (
          source_block_id TEXT NOT NULL REFERENCES blocks(id),
          ordinal INTEGER NOT NULL,
          source_object_id TEXT NOT NULL REFERENCES objects(id),
          target_object_id TEXT NOT NULL REFERENCES objects(id),
          target_block_id TEXT,
          PRIMARY KEY (source_block_id, ordinal)
        );

        CREATE INDEX IF NOT EXISTS idx_refs_target
          ON refs(target_object_id, target_block_id);
"#;
