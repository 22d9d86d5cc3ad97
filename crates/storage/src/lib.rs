#![forbid(unsafe_code)]

//! SQLite-backed block-tree document store.

mod config;
mod store;

pub use config::{
    DB_FILE_NAME, ENV_BUSY_TIMEOUT_MS, ENV_SEARCH_LIMIT, ENV_SEARCH_MAX_LIMIT, ENV_STORAGE_DIR,
    StoreConfig,
};
pub use store::{
    BacklinkRow, BlockRow, CreateObjectRequest, EXPORT_FORMAT, ExportedBlock, ExportedObject,
    ObjectExport, ObjectRow, ReferenceRow, SearchHit, SearchQuery, SqliteStore, StoreError,
};
