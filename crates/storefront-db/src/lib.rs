//! # storefront-db: Document Store Layer for the Storefront
//!
//! This crate provides document store access for the storefront services.
//! Documents are JSON objects kept in SQLite and queried with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  RatingAggregator::recompute_rating("TSHIRT-001")                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ ProductRepo   │    │  (embedded)  │  │   │
//! │  │   │ SqlitePool    │    │ ReviewRepo    │    │ 001_docs.sql │  │   │
//! │  │   └───────┬───────┘    │ ComboRepo     │    └──────────────┘  │   │
//! │  │           │            └───────┬───────┘                      │   │
//! │  │           ▼                    ▼                              │   │
//! │  │   ┌─────────────────────────────────────────┐                 │   │
//! │  │   │ DocumentStore: Sqlite | InMemory        │                 │   │
//! │  │   └─────────────────────────────────────────┘                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │       SQLite: documents(collection, id, body JSON, ...)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - `Database`: SQLite pool, WAL, health check, repository accessors
//! - [`migrations`] - the `documents` schema and its migration status
//! - [`store`] - The `DocumentStore` trait and its implementations
//! - [`repository`] - Typed repositories (product, review, combo)
//! - [`error`] - `DbError` and the unavailable/request-failure split
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("catalog.db")).await?;
//! let product = db.products().get_by_code("TSHIRT-001").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};
pub use store::{DocumentStore, InMemoryDocumentStore, SqliteDocumentStore, UpdateResult};

pub use repository::{ComboRepository, ProductRepository, ReviewRepository};
