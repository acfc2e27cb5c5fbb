//! # Related Product Matcher
//!
//! Picks products to show next to a product page.
//!
//! ## Query Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  productCode ∉ {source, exclude?}            always                     │
//! │  AND category == source.category             always                     │
//! │  AND subcategory == source.subcategory       source has a subcategory   │
//! │  AND (tags ∩ source.tags ≠ ∅                 source has tags            │
//! │       OR topSelling == true)                                            │
//! │                                                                         │
//! │  ORDER BY _id ASC  LIMIT limit                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Strategies
//! - `Strict`: the query above, once.
//! - `Widening`: the query above, then category + boost, then category
//!   only, each tier filling the slots the previous ones left and never
//!   repeating a product.
//!
//! A source code that matches no product falls back to any product other
//! than the excluded codes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_core::related::{excluded_codes, fallback_filter, related_filter, RelatedTier};
use storefront_core::validation::clamp_related_limit;
use storefront_core::{ProductSummary, DEFAULT_RELATED_LIMIT};
use storefront_db::{DocumentStore, ProductRepository};
use tracing::{debug, info};

use crate::error::CatalogResult;

/// How far a related-product lookup may relax its preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedStrategy {
    /// One query, subcategory and boost required when present.
    ///
    /// The boost (shares a tag with the source, or is a top seller) is a
    /// filter here, not a ranking: when the source has tags, products in the
    /// same category and subcategory that match neither are not returned,
    /// even with free slots left. Use [`RelatedStrategy::Widening`] to fill
    /// those slots.
    #[default]
    Strict,
    /// Relax subcategory, then the boost, until the limit is reached.
    Widening,
}

impl fmt::Display for RelatedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedStrategy::Strict => write!(f, "strict"),
            RelatedStrategy::Widening => write!(f, "widening"),
        }
    }
}

impl FromStr for RelatedStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(RelatedStrategy::Strict),
            "widening" => Ok(RelatedStrategy::Widening),
            other => Err(format!("unknown related strategy '{other}'")),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedOptions {
    /// A further product code to leave out (e.g. the one in the cart).
    pub exclude_code: Option<String>,
    /// Maximum number of results; capped at `MAX_RELATED_LIMIT`.
    pub limit: usize,
}

impl RelatedOptions {
    pub fn new(limit: usize) -> Self {
        RelatedOptions {
            exclude_code: None,
            limit,
        }
    }

    pub fn excluding(mut self, code: impl Into<String>) -> Self {
        self.exclude_code = Some(code.into());
        self
    }
}

impl Default for RelatedOptions {
    fn default() -> Self {
        Self::new(DEFAULT_RELATED_LIMIT)
    }
}

/// Finds related products.
#[derive(Clone)]
pub struct RelatedProductMatcher {
    products: ProductRepository,
    strategy: RelatedStrategy,
}

impl RelatedProductMatcher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        RelatedProductMatcher {
            products: ProductRepository::new(store),
            strategy: RelatedStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: RelatedStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> RelatedStrategy {
        self.strategy
    }

    /// Returns up to `options.limit` products related to `source_code`, in
    /// `_id` order within each tier.
    ///
    /// ## Errors
    /// Store failures propagate. An unknown source code is not an error.
    pub async fn find_related(
        &self,
        source_code: &str,
        options: RelatedOptions,
    ) -> CatalogResult<Vec<ProductSummary>> {
        let limit = clamp_related_limit(options.limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let source_code = source_code.trim();
        let mut excluded = excluded_codes(source_code, options.exclude_code.as_deref());

        let source = if source_code.is_empty() {
            None
        } else {
            self.products.get_by_code(source_code).await?
        };

        let Some(source) = source else {
            info!(code = %source_code, "Related lookup for unknown product, using default list");
            return Ok(self
                .products
                .find_summaries(&fallback_filter(&excluded), limit)
                .await?);
        };

        let tiers: &[RelatedTier] = match self.strategy {
            RelatedStrategy::Strict => &[RelatedTier::Strict],
            RelatedStrategy::Widening => &RelatedTier::WIDENING,
        };

        let mut found: Vec<ProductSummary> = Vec::with_capacity(limit);
        for tier in tiers {
            let remaining = limit - found.len();
            if remaining == 0 {
                break;
            }

            let filter = related_filter(&source, &excluded, *tier);
            let batch = self.products.find_summaries(&filter, remaining).await?;
            debug!(
                code = %source_code,
                tier = ?tier,
                found = batch.len(),
                "Related tier queried"
            );

            excluded.extend(batch.iter().map(|p| p.product_code.clone()));
            found.extend(batch);
        }

        Ok(found)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
