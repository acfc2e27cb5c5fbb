//! # Database Handle
//!
//! Opens the SQLite file behind the document store, brings its schema up to
//! date and hands out the store and typed repositories.
//!
//! ```text
//! DbConfig::new("catalog.db")      file, WAL, pooled connections
//! DbConfig::in_memory()            one pinned connection, for tests
//!        │
//!        ▼
//! Database::new(config) ──▶ SqlitePool ──▶ migrations
//!        │
//!        ├──▶ store()     Arc<SqliteDocumentStore>  (what services hold)
//!        └──▶ products() / reviews() / combos()
//! ```
//!
//! File databases run in WAL mode so the bulk rating recompute can write
//! while product pages keep reading.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::{ComboRepository, ProductRepository, ReviewRepository};
use crate::store::{DocumentStore, SqliteDocumentStore};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the catalog database lives and how many connections it gets.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/storefront/catalog.db")
///     .max_connections(8)
///     .acquire_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for a throwaway store.
    pub path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a query waits for a free connection before
    /// `DbError::PoolExhausted`.
    pub acquire_timeout: Duration,
    /// How long a statement waits on another connection's write lock before
    /// failing with "database is locked".
    pub busy_timeout: Duration,
    /// `None` keeps idle connections open.
    pub idle_timeout: Option<Duration>,
    /// Apply pending migrations inside `Database::new`.
    pub migrate_on_open: bool,
}

impl DbConfig {
    /// 1..5 connections, 30s acquire timeout, idle connections dropped
    /// after ten minutes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            migrate_on_open: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Skips migrations on open, for tools that only inspect the schema.
    pub fn without_migrations(mut self) -> Self {
        self.migrate_on_open = false;
        self
    }

    /// Each in-memory connection is its own database, so the pool holds
    /// exactly one connection and never lets it go idle.
    pub fn in_memory() -> Self {
        DbConfig {
            path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: None,
            migrate_on_open: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open catalog database. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates. The in-memory
    /// database lives as long as the pool keeps its connection.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.path.display(), "Opening catalog database");

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        let connect_options = connect_options.busy_timeout(config.busy_timeout);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            // Recycling the only connection would drop the database.
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max = config.max_connections,
            min = config.min_connections,
            "Connection pool ready"
        );

        let db = Database { pool };
        if config.migrate_on_open {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Brings the schema up to date. `new()` does this unless the config
    /// turned it off.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Embedded versus applied migrations.
    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the document store backed by this pool.
    pub fn store(&self) -> Arc<SqliteDocumentStore> {
        Arc::new(SqliteDocumentStore::new(self.pool.clone()))
    }

    fn shared_store(&self) -> Arc<dyn DocumentStore> {
        self.store()
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.shared_store())
    }

    pub fn reviews(&self) -> ReviewRepository {
        ReviewRepository::new(self.shared_store())
    }

    pub fn combos(&self) -> ComboRepository {
        ComboRepository::new(self.shared_store())
    }

    /// Afterwards every store call fails with `DbError::ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing catalog database");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let status = db.migration_status().await.unwrap();
        assert!(status.applied > 0);
        assert_eq!(status.pending(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/catalog.db")
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(2))
            .busy_timeout(Duration::from_secs(9))
            .without_migrations();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
        assert_eq!(config.busy_timeout, Duration::from_secs(9));
        assert!(!config.migrate_on_open);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_pending() {
        let db = Database::new(DbConfig::in_memory().without_migrations())
            .await
            .unwrap();
        let status = db.migration_status().await.unwrap();
        assert_eq!(status.applied, 0);
        assert_eq!(status.pending(), status.embedded);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        let err = db.products().get_by_code("ANY").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
