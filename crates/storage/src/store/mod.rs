#![forbid(unsafe_code)]

mod blocks;
mod error;
mod export;
mod idempotency;
mod objects;
mod patch;
mod refs;
mod search;
mod support;

pub use blocks::BlockRow;
pub use error::StoreError;
pub use export::{EXPORT_FORMAT, ExportedBlock, ExportedObject, ObjectExport};
pub use objects::{CreateObjectRequest, ObjectRow};
pub use refs::{BacklinkRow, ReferenceRow};
pub use search::{SearchHit, SearchQuery};

use crate::config::{DB_FILE_NAME, StoreConfig};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use support::*;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(StoreConfig::new(storage_dir.as_ref()))
    }

    pub fn open_with_config(config: StoreConfig) -> Result<Self, StoreError> {
        let storage_dir = config.storage_dir.clone();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        let store = Self::init(conn, Some(storage_dir), config)?;
        tracing::debug!(path = %db_path.display(), "opened store");
        Ok(store)
    }

    /// Private database that disappears with the store; used by tests and tools.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None, StoreConfig::default())
    }

    fn init(
        conn: Connection,
        storage_dir: Option<PathBuf>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(config.busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        install_schema(&conn)?;

        Ok(Self {
            conn,
            storage_dir,
            config,
        })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn write_tx(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
