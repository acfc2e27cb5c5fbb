//! # Storefront Configuration
//!
//! Configuration for the catalog services and the admin tooling.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_DB_PATH=/var/lib/storefront/catalog.db                  │
//! │     STOREFRONT_RELATED_STRATEGY=widening                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ./storefront.toml (or --config <path>)                             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "storefront.db"
//! max_connections = 5
//!
//! [related]
//! default_limit = 4
//! strategy = "strict"       # strict | widening
//!
//! [ratings]
//! bulk_concurrency = 8
//! bulk_deadline_secs = 120  # optional
//!
//! [cache]
//! ttl_secs = 300
//!
//! [auth]
//! jwt_secret = "change-me"
//! session_cookie = "storefront_session"
//! ```
//!
//! ## Environment Variables
//! | Variable | Setting |
//! |---|---|
//! | `STOREFRONT_DB_PATH` | `database.path` |
//! | `STOREFRONT_DB_MAX_CONNECTIONS` | `database.max_connections` |
//! | `STOREFRONT_RELATED_LIMIT` | `related.default_limit` |
//! | `STOREFRONT_RELATED_STRATEGY` | `related.strategy` |
//! | `STOREFRONT_BULK_CONCURRENCY` | `ratings.bulk_concurrency` |
//! | `STOREFRONT_BULK_DEADLINE_SECS` | `ratings.bulk_deadline_secs` |
//! | `STOREFRONT_CACHE_TTL_SECS` | `cache.ttl_secs` |
//! | `STOREFRONT_JWT_SECRET` | `auth.jwt_secret` |
//! | `STOREFRONT_SESSION_COOKIE` | `auth.session_cookie` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use storefront_core::{DEFAULT_RELATED_LIMIT, MAX_RELATED_LIMIT};
use storefront_db::DbConfig;
use thiserror::Error;
use tracing::{debug, info};

use crate::related::RelatedStrategy;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout (seconds).
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// How long a write waits for another connection's write lock (seconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("storefront.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration for storefront-db.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

/// `[related]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedSettings {
    /// Number of related products when the caller gives no limit.
    #[serde(default = "default_related_limit")]
    pub default_limit: usize,

    #[serde(default)]
    pub strategy: RelatedStrategy,
}

fn default_related_limit() -> usize {
    DEFAULT_RELATED_LIMIT
}

impl Default for RelatedSettings {
    fn default() -> Self {
        RelatedSettings {
            default_limit: default_related_limit(),
            strategy: RelatedStrategy::default(),
        }
    }
}

/// `[ratings]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSettings {
    /// Product codes recomputed concurrently by a bulk run.
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,

    /// Overall deadline for a bulk run (seconds). No deadline when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_deadline_secs: Option<u64>,
}

fn default_bulk_concurrency() -> usize {
    8
}

impl Default for RatingSettings {
    fn default() -> Self {
        RatingSettings {
            bulk_concurrency: default_bulk_concurrency(),
            bulk_deadline_secs: None,
        }
    }
}

impl RatingSettings {
    /// Returns the bulk deadline as a duration.
    pub fn bulk_deadline(&self) -> Option<Duration> {
        self.bulk_deadline_secs.map(Duration::from_secs)
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Time-to-live of cached catalog listings (seconds). 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for session cookies and bearer tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Name of the session cookie.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_jwt_secret() -> String {
    // Development only; production sets STOREFRONT_JWT_SECRET.
    "storefront-dev-secret-change-in-production".to_string()
}

fn default_session_cookie() -> String {
    "storefront_session".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            jwt_secret: default_jwt_secret(),
            session_cookie: default_session_cookie(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub related: RelatedSettings,

    #[serde(default)]
    pub ratings: RatingSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub auth: AuthSettings,
}

impl StorefrontConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`path`, or `storefront.toml` if present)
    /// 3. Environment variables
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`StorefrontConfig::load`] with an explicit environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = path.is_some();
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading storefront config from file");
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            Self::from_toml(&contents)?
        } else if explicit {
            return Err(ConfigError::Io {
                path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections must not exceed max_connections".into(),
            ));
        }
        if self.related.default_limit == 0 || self.related.default_limit > MAX_RELATED_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "related.default_limit must be between 1 and {MAX_RELATED_LIMIT}"
            )));
        }
        if self.ratings.bulk_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "ratings.bulk_concurrency must be greater than 0".into(),
            ));
        }
        if self.ratings.bulk_deadline_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "ratings.bulk_deadline_secs must be greater than 0 when set".into(),
            ));
        }
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.session_cookie.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.session_cookie must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Applies `STOREFRONT_*` overrides.
    fn apply_env_overrides<F>(&mut self, env: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = env("STOREFRONT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = parsed(&env, "STOREFRONT_DB_MAX_CONNECTIONS")? {
            self.database.max_connections = max;
        }
        if let Some(limit) = parsed(&env, "STOREFRONT_RELATED_LIMIT")? {
            self.related.default_limit = limit;
        }
        if let Some(strategy) = parsed(&env, "STOREFRONT_RELATED_STRATEGY")? {
            debug!(strategy = %strategy, "Overriding related strategy from environment");
            self.related.strategy = strategy;
        }
        if let Some(concurrency) = parsed(&env, "STOREFRONT_BULK_CONCURRENCY")? {
            self.ratings.bulk_concurrency = concurrency;
        }
        if let Some(deadline) = parsed(&env, "STOREFRONT_BULK_DEADLINE_SECS")? {
            self.ratings.bulk_deadline_secs = Some(deadline);
        }
        if let Some(ttl) = parsed(&env, "STOREFRONT_CACHE_TTL_SECS")? {
            self.cache.ttl_secs = ttl;
        }
        if let Some(secret) = env("STOREFRONT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(cookie) = env("STOREFRONT_SESSION_COOKIE") {
            self.auth.session_cookie = cookie;
        }
        Ok(())
    }
}

fn parsed<F, T>(env: &F, key: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = StorefrontConfig::default();
        assert_eq!(config.related.default_limit, 4);
        assert_eq!(config.related.strategy, RelatedStrategy::Strict);
        assert_eq!(config.ratings.bulk_concurrency, 8);
        assert!(config.ratings.bulk_deadline().is_none());
        assert!(config.validate().is_ok());

        let db = config.database.db_config();
        assert_eq!(db.busy_timeout, Duration::from_secs(5));
        assert_eq!(db.acquire_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StorefrontConfig::from_toml(
            r#"
            [related]
            strategy = "widening"

            [ratings]
            bulk_deadline_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.related.strategy, RelatedStrategy::Widening);
        assert_eq!(config.related.default_limit, 4);
        assert_eq!(config.ratings.bulk_deadline(), Some(Duration::from_secs(30)));
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOREFRONT_DB_PATH", "/tmp/catalog.db"),
            ("STOREFRONT_RELATED_STRATEGY", "widening"),
            ("STOREFRONT_BULK_CONCURRENCY", "2"),
        ]
        .into_iter()
        .collect();

        let mut config = StorefrontConfig::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/catalog.db"));
        assert_eq!(config.related.strategy, RelatedStrategy::Widening);
        assert_eq!(config.ratings.bulk_concurrency, 2);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = StorefrontConfig::default();
        let err = config
            .apply_env_overrides(|key| {
                (key == "STOREFRONT_BULK_CONCURRENCY").then(|| "many".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = StorefrontConfig::default();
        config.related.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = StorefrontConfig::default();
        config.ratings.bulk_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = StorefrontConfig::default();
        config.auth.jwt_secret = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/definitely/not/here/storefront.toml");
        let err = StorefrontConfig::load_with_env(Some(missing), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = StorefrontConfig::default().to_toml();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[related]"));
        assert!(toml_str.contains("strategy = \"strict\""));
    }
}
