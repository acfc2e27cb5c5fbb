//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Where errors come from                             │
//! │                                                                         │
//! │  storefront-core errors (this file)                                     │
//! │  ├── CoreError        - Missing entities, bad documents                 │
//! │  └── ValidationError  - Rejected product, combo or review input         │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                  │
//! │  └── DbError          - Document store failures                         │
//! │                                                                         │
//! │  storefront-catalog errors                                              │
//! │  └── CatalogError     - What request handlers see                       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CatalogError → HTTP layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Catalog rule violations that do not depend on the store backend.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found by its product code.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Combo cannot be found by its combo code.
    #[error("Combo not found: {0}")]
    ComboNotFound(String),

    /// A stored document does not have the expected shape.
    #[error("Malformed {entity} document: {reason}")]
    MalformedDocument { entity: String, reason: String },

    /// Rejected input; see [`ValidationError`].
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Why a product, combo or review was refused. Field names are the
/// camelCase names clients send.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Blank or absent.
    #[error("{field} is required")]
    Required { field: String },

    /// Longer than the stored column allows.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Outside an inclusive numeric range, such as review stars.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Characters or shape the field does not accept.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A product or combo code that is already taken.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result alias used across the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
