use std::fmt;

use la_core::{ExprError, ExprId};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
    /// The expression itself failed to lex, parse or evaluate.
    Expression(ExprError),
    NotFound(ExprId),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::Expression(e) => write!(f, "{e}"),
            StoreError::NotFound(id) => write!(f, "expression not found: {id}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Expression(e) => Some(e),
            StoreError::InvalidData(_) | StoreError::NotFound(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<ExprError> for StoreError {
    fn from(e: ExprError) -> Self {
        StoreError::Expression(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
