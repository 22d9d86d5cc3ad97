#![forbid(unsafe_code)]

use rusqlite::ErrorCode;

/// Fatal store failures. A patch that ends in one of these was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(rusqlite::Error),
    #[error("integrity violation: {0}")]
    Integrity(rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("invalid config value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },
    #[error("unknown id")]
    UnknownId,
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if is_constraint_violation(&value) {
            return Self::Integrity(value);
        }
        Self::Sql(value)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("FOREIGN KEY constraint failed")
                        || value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}
