#![forbid(unsafe_code)]

mod blocks;
mod core;
mod idempotency;
mod refs;
mod search;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(core::SQL);
    sql.push_str(blocks::SQL);
    sql.push_str(refs::SQL);
    sql.push_str(idempotency::SQL);
    sql.push_str(search::SQL);
    sql
}
