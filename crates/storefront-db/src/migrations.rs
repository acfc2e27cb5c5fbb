//! # Schema Migrations
//!
//! The schema is a single `documents` table plus expression indexes on the
//! JSON fields the catalog filters on. The SQL lives in
//! `migrations/sqlite/` at the workspace root and is compiled into the
//! binary by `sqlx::migrate!`.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_documents.sql   documents(collection, id, body, ...) + indexes on
//!                         productCode, category, comboCode
//! ```
//!
//! New indexes for new query shapes go into a new numbered file; applied
//! files are checksummed by sqlx and must not change.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let embedded = MIGRATOR.migrations.len();
    debug!(embedded, "Applying document store migrations");

    MIGRATOR.run(pool).await?;

    info!(embedded, "Document store schema up to date");
    Ok(())
}

/// Embedded versus applied migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }
}

/// Reads the migration bookkeeping table. A database that was never
/// migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or(0),
    })
}
