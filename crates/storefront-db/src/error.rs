//! # Document Store Errors
//!
//! Every backend reports failures as [`DbError`]. The catalog services only
//! care about one split: could the store be reached at all
//! ([`DbError::is_unavailable`]) or did this particular request go wrong.
//!
//! ```text
//! sqlx::Error ───────────┐
//! MigrateError ──────────┼──▶ DbError ──▶ CatalogError::StoreUnavailable
//! serde_json::Error ─────┘                CatalogError::Store
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// An insert reused an `_id` already present in the collection.
    #[error("{field} '{value}' is already stored")]
    UniqueViolation { field: String, value: String },

    /// The SQLite file could not be opened, or the pool was shut down.
    #[error("Cannot reach document store: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Statement failed: {0}")]
    QueryFailed(String),

    #[error("Transaction aborted: {0}")]
    TransactionFailed(String),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("No free connection in the pool")]
    PoolExhausted,

    /// Another connection held the write lock past the busy timeout
    /// (SQLITE_BUSY / SQLITE_LOCKED).
    #[error("Database is locked: {0}")]
    Locked(String),

    /// The store refused service (outage, maintenance).
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// The filter, update or options can't be expressed by this store.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unexpected store error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when the store could not be reached at all, as opposed to a
    /// problem with one particular request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::Locked(_)
                | DbError::Unavailable(_)
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if is_lock_contention(db_err.code().as_deref()) => {
                DbError::Locked(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                // SQLite reports "UNIQUE constraint failed: documents.collection, documents.id"
                match message.strip_prefix("UNIQUE constraint failed: ") {
                    Some(columns) => DbError::duplicate(columns, "?"),
                    None => DbError::QueryFailed(message.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),
            sqlx::Error::RowNotFound => DbError::QueryFailed("no row returned".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

/// SQLite primary result codes 5 (BUSY) and 6 (LOCKED), including their
/// extended forms such as 517 (BUSY_SNAPSHOT).
fn is_lock_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, 5 | 6))
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
