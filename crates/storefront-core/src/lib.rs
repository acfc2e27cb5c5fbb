//! # storefront-core: Pure Catalog Logic for the Storefront
//!
//! This crate contains the catalog rules that sit between the request
//! handlers and the document store, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │   Product page ──► Reviews ──► Related products ──► Cart        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              storefront-catalog (services)                      │   │
//! │  │   RatingAggregator, RelatedProductMatcher, CatalogCache         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  rating   │  │   query   │  │  related  │  │   │
//! │  │   │  Product  │  │  Rating   │  │  Filter   │  │  tiers    │  │   │
//! │  │   │  Review   │  │  mean/rnd │  │  Update   │  │  filters  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-db (Document Store)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Review, Combo, ProductSummary)
//! - [`rating`] - Rating type held in tenths, mean with half-up rounding
//! - [`query`] - Filter/update language understood by every document store
//! - [`related`] - Related-product query construction and fallback tiers
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::rating::RatingSummary;
//!
//! let summary = RatingSummary::from_scores([4, 5, 5]);
//! assert_eq!(summary.rating.to_string(), "4.7");
//! assert_eq!(summary.review_count, 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod query;
pub mod rating;
pub mod related;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use query::{Collection, Document, Filter, FindOptions, SortDirection, Update};
pub use rating::{Rating, RatingSummary, ReviewScore};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of related products shown on a product page when the caller
/// does not ask for a specific count.
pub const DEFAULT_RELATED_LIMIT: usize = 4;

/// Upper bound for a single related-products request.
///
/// Larger requests are capped, not rejected.
pub const MAX_RELATED_LIMIT: usize = 48;

/// Maximum length of a review body.
pub const MAX_REVIEW_TEXT_LEN: usize = 2000;
