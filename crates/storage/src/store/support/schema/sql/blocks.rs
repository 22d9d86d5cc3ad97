#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS blocks (
          id TEXT PRIMARY KEY,
          object_id TEXT NOT NULL REFERENCES objects(id),
          parent_block_id TEXT REFERENCES blocks(id),
          order_key TEXT NOT NULL,
          block_type TEXT NOT NULL,
          content_json TEXT NOT NULL,
          meta_json TEXT,
          deleted_at_ms INTEGER,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        -- Sibling order is (order_key, id) under one (object, parent).
        CREATE INDEX IF NOT EXISTS idx_blocks_siblings
          ON blocks(object_id, parent_block_id, order_key, id);

        CREATE INDEX IF NOT EXISTS idx_blocks_parent
          ON blocks(parent_block_id);
"#;
