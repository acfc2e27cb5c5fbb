//! # storefront-catalog: Catalog Services for the Storefront
//!
//! The services the storefront's request handlers call: rating
//! aggregation, related products, reviews, cached listings and credential
//! resolution.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   HTTP handlers / catalog-admin CLI                                     │
//! │          │                                                              │
//! │          ▼                                                              │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │              storefront-catalog (THIS CRATE)                    │  │
//! │   │                                                                 │  │
//! │   │  RatingAggregator   RelatedProductMatcher   ReviewService       │  │
//! │   │  Catalog + CatalogCache   CredentialResolver   EventBus         │  │
//! │   └──────────────────────────────┬──────────────────────────────────┘  │
//! │                                  │                                      │
//! │          ┌───────────────────────┴──────────────────┐                   │
//! │          ▼                                          ▼                   │
//! │   storefront-core                            storefront-db              │
//! │   (ratings, filters, rules)                  (DocumentStore)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use storefront_catalog::{RelatedOptions, Storefront, StorefrontConfig, SystemClock};
//! use storefront_db::Database;
//!
//! let config = StorefrontConfig::load(None)?;
//! let db = Database::new(config.database.db_config()).await?;
//! let storefront = Storefront::new(&config, db.store(), Arc::new(SystemClock));
//!
//! let report = storefront.ratings.recompute_all_ratings().await?;
//! let related = storefront
//!     .related
//!     .find_related("TSHIRT-001", RelatedOptions::new(4))
//!     .await?;
//! ```

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod rating;
pub mod related;
pub mod reviews;
pub mod services;

#[cfg(test)]
mod test_support;

pub use auth::{CredentialResolver, JwtVerifier, Principal, RequestCredentials, Role};
pub use cache::{CatalogCache, Clock, ManualClock, SystemClock};
pub use catalog::Catalog;
pub use config::{ConfigError, StorefrontConfig};
pub use error::{CatalogError, CatalogResult};
pub use events::{CatalogEvent, EventBus};
pub use rating::RatingAggregator;
pub use related::{RelatedOptions, RelatedProductMatcher, RelatedStrategy};
pub use reviews::{ReviewReceipt, ReviewService};
pub use services::Storefront;
