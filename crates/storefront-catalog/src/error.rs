//! # Catalog Error Types
//!
//! What the request handlers see.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Situation                          Surfaces as                         │
//! │  ─────────────────────────────────  ──────────────────────────────────  │
//! │  Rating update matched no product   nothing (logged)                    │
//! │  Store unreachable / pool exhausted CatalogError::StoreUnavailable      │
//! │  Other store failure                CatalogError::Store                 │
//! │  One product fails in a bulk run    BulkRecomputeReport::failed += 1    │
//! │  Bad input                          CatalogError::Validation            │
//! │  Missing / invalid credentials      CatalogError::Unauthenticated       │
//! │  Authenticated but not allowed      CatalogError::Forbidden             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The HTTP layer maps `StoreUnavailable` and `Store` to a server error.

use storefront_core::{CoreError, ValidationError};
use storefront_db::DbError;
use thiserror::Error;

/// Errors returned by the catalog services.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The document store could not be reached.
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),

    /// The document store rejected or failed a request.
    #[error("Document store error: {0}")]
    Store(#[source] DbError),

    /// Invalid input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Domain rule violation.
    #[error(transparent)]
    Core(CoreError),

    /// No valid credentials were presented.
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// The caller is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl CatalogError {
    /// Checks if the error should be reported as a server-side failure.
    pub fn is_server_error(&self) -> bool {
        matches!(self, CatalogError::StoreUnavailable(_) | CatalogError::Store(_))
    }
}

impl From<DbError> for CatalogError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            CatalogError::StoreUnavailable(err)
        } else {
            CatalogError::Store(err)
        }
    }
}

impl From<CoreError> for CatalogError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => CatalogError::Validation(v),
            other => CatalogError::Core(other),
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_are_classified() {
        let err: CatalogError = DbError::PoolExhausted.into();
        assert!(matches!(err, CatalogError::StoreUnavailable(_)));

        let err: CatalogError = DbError::Locked("database is locked".into()).into();
        assert!(matches!(err, CatalogError::StoreUnavailable(_)));
        assert!(err.is_server_error());

        let err: CatalogError = DbError::QueryFailed("syntax".into()).into();
        assert!(matches!(err, CatalogError::Store(_)));
    }

    #[test]
    fn test_core_validation_is_flattened() {
        let err: CatalogError = CoreError::Validation(ValidationError::Required {
            field: "name".into(),
        })
        .into();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(!err.is_server_error());
    }
}
