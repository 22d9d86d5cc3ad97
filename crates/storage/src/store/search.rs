#![forbid(unsafe_code)]

use super::*;
use quire_core::{BlockContent, BlockId, ObjectId};

#[derive(Clone, Debug, Default)]
pub struct SearchQuery {
    pub query: String,
    pub object_id: Option<ObjectId>,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub block_id: BlockId,
    pub object_id: ObjectId,
    pub object_title: String,
    /// Matching text with hits wrapped in `<mark>`.
    pub snippet: String,
    /// BM25 score; lower is better.
    pub rank: f64,
}

impl SqliteStore {
    /// Case-insensitive token-prefix search over live blocks. Every term must
    /// match; a query with no searchable terms or a zero limit returns nothing.
    pub fn search_blocks(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        let limit = self.config.clamp_search_limit(query.limit);
        let Some(match_expr) = fts_match_expression(&query.query).filter(|_| limit > 0) else {
            return Ok(Vec::new());
        };
        let limit = to_sqlite_i64(limit)?;

        let mut stmt = self.conn.prepare(
            "SELECT e.block_id, e.object_id, o.title, \
                    snippet(search_fts, 0, '<mark>', '</mark>', '…', 16) AS snippet, \
                    bm25(search_fts) AS score \
             FROM search_fts \
             JOIN search_entries e ON e.entry_id = search_fts.rowid \
             JOIN blocks b ON b.id = e.block_id \
             JOIN objects o ON o.id = e.object_id \
             WHERE search_fts MATCH ?1 \
               AND b.deleted_at_ms IS NULL \
               AND o.deleted_at_ms IS NULL \
               AND (?2 IS NULL OR e.object_id = ?2) \
             ORDER BY score ASC, e.block_id ASC \
             LIMIT ?3",
        )?;
        let mut rows = stmt.query(params![
            match_expr,
            query.object_id.as_ref().map(ObjectId::as_str),
            limit,
        ])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let block_id: String = row.get(0)?;
            let object_id: String = row.get(1)?;
            out.push(SearchHit {
                block_id: BlockId::try_new(block_id)
                    .map_err(|err| StoreError::CorruptRow(format!("search block id: {err}")))?,
                object_id: ObjectId::try_new(object_id)
                    .map_err(|err| StoreError::CorruptRow(format!("search object id: {err}")))?,
                object_title: row.get(2)?,
                snippet: row.get(3)?,
                rank: row.get(4)?,
            });
        }
        Ok(out)
    }
}

/// Each whitespace-separated term becomes a quoted prefix query; FTS5 ANDs
/// adjacent terms. Terms without a letter or digit are dropped since the
/// tokenizer would yield nothing for them.
fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

pub(super) fn upsert_search_entry_tx(
    tx: &Transaction<'_>,
    object_id: &ObjectId,
    block_id: &BlockId,
    content: &BlockContent,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO search_entries(block_id, object_id, body) VALUES (?1, ?2, ?3) \
         ON CONFLICT(block_id) DO UPDATE SET object_id=excluded.object_id, body=excluded.body",
        params![block_id.as_str(), object_id.as_str(), content.plain_text()],
    )?;
    Ok(())
}

pub(super) fn delete_search_entry_tx(tx: &Transaction<'_>, block_id: &str) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM search_entries WHERE block_id=?1",
        params![block_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::fts_match_expression;

    #[test]
    fn terms_become_quoted_prefixes() {
        assert_eq!(
            fts_match_expression("  hel  Wor\"ld "),
            Some("\"hel\"* \"Wor\"\"ld\"*".to_string())
        );
    }

    #[test]
    fn blank_or_symbol_only_queries_match_nothing() {
        assert_eq!(fts_match_expression("   "), None);
        assert_eq!(fts_match_expression("# -- *"), None);
    }
}
