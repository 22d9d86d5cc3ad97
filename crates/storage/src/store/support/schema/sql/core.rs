#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS objects (
          id TEXT PRIMARY KEY,
          object_type TEXT NOT NULL,
          title TEXT NOT NULL,
          doc_version INTEGER NOT NULL DEFAULT 0,
          deleted_at_ms INTEGER,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );
"#;
