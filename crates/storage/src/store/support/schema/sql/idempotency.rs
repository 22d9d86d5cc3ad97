#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS idempotency (
          object_id TEXT NOT NULL REFERENCES objects(id),
          idem_key TEXT NOT NULL,
          ops_sha256 TEXT NOT NULL,
          result_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY (object_id, idem_key)
        );

        CREATE INDEX IF NOT EXISTS idx_idempotency_created
          ON idempotency(created_at_ms);
"#;
