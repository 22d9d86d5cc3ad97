#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS search_entries (
          entry_id INTEGER PRIMARY KEY,
          block_id TEXT NOT NULL UNIQUE REFERENCES blocks(id),
          object_id TEXT NOT NULL REFERENCES objects(id),
          body TEXT NOT NULL
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS search_fts USING fts5(
          body,
          content = 'search_entries',
          content_rowid = 'entry_id',
          tokenize = 'unicode61 remove_diacritics 2'
        );

        CREATE TRIGGER IF NOT EXISTS search_entries_ai AFTER INSERT ON search_entries BEGIN
          INSERT INTO search_fts(rowid, body) VALUES (new.entry_id, new.body);
        END;

        CREATE TRIGGER IF NOT EXISTS search_entries_ad AFTER DELETE ON search_entries BEGIN
          INSERT INTO search_fts(search_fts, rowid, body) VALUES ('delete', old.entry_id, old.body);
        END;

        CREATE TRIGGER IF NOT EXISTS search_entries_au AFTER UPDATE ON search_entries BEGIN
          INSERT INTO search_fts(search_fts, rowid, body) VALUES ('delete', old.entry_id, old.body);
          INSERT INTO search_fts(rowid, body) VALUES (new.entry_id, new.body);
        END;
"#;
