#![forbid(unsafe_code)]

mod schema;
mod time;

pub(super) use schema::install_schema;
pub(super) use self::time::{ms_to_rfc3339, now_ms};

use super::StoreError;

pub(super) fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}
