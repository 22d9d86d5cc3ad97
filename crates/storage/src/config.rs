#![forbid(unsafe_code)]

use crate::StoreError;
use std::path::PathBuf;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "quire.db";

pub const ENV_STORAGE_DIR: &str = "QUIRE_STORAGE_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "QUIRE_BUSY_TIMEOUT_MS";
pub const ENV_SEARCH_LIMIT: &str = "QUIRE_SEARCH_LIMIT";
pub const ENV_SEARCH_MAX_LIMIT: &str = "QUIRE_SEARCH_MAX_LIMIT";

const DEFAULT_STORAGE_DIR: &str = ".quire";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SEARCH_LIMIT: usize = 20;
const DEFAULT_SEARCH_MAX_LIMIT: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_dir: PathBuf,
    pub busy_timeout: Duration,
    /// Result count used when a search does not ask for one.
    pub search_default_limit: usize,
    pub search_max_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            search_default_limit: DEFAULT_SEARCH_LIMIT,
            search_max_limit: DEFAULT_SEARCH_MAX_LIMIT,
        }
    }
}

impl StoreConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `QUIRE_*` values, falling back to defaults for
    /// anything unset or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = Self::default();
        if let Some(dir) = value(ENV_STORAGE_DIR) {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(raw) = value(ENV_BUSY_TIMEOUT_MS) {
            let ms = parse_number(ENV_BUSY_TIMEOUT_MS, &raw)?;
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = value(ENV_SEARCH_LIMIT) {
            config.search_default_limit = parse_limit(ENV_SEARCH_LIMIT, &raw)?;
        }
        if let Some(raw) = value(ENV_SEARCH_MAX_LIMIT) {
            config.search_max_limit = parse_limit(ENV_SEARCH_MAX_LIMIT, &raw)?;
        }
        if config.search_default_limit > config.search_max_limit {
            return Err(StoreError::InvalidConfig {
                key: ENV_SEARCH_LIMIT,
                value: config.search_default_limit.to_string(),
            });
        }
        Ok(config)
    }

    /// An explicit zero stays zero and yields no hits.
    pub(crate) fn clamp_search_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.search_default_limit)
            .min(self.search_max_limit)
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, StoreError> {
    raw.parse::<u64>().map_err(|_| StoreError::InvalidConfig {
        key,
        value: raw.to_string(),
    })
}

fn parse_limit(key: &'static str, raw: &str) -> Result<usize, StoreError> {
    let value = parse_number(key, raw)?;
    match usize::try_from(value) {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(StoreError::InvalidConfig {
            key,
            value: raw.to_string(),
        }),
    }
}
