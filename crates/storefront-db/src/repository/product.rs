//! # Product Repository
//!
//! Document store operations for products.
//!
//! ## Key Operations
//! - Lookup by `productCode`
//! - Related-product candidate queries (projected summaries)
//! - Rating persistence, the only writer of `rating` / `reviews`

use std::sync::Arc;
use storefront_core::query::{Collection, Filter, FindOptions, Update};
use storefront_core::types::fields;
use storefront_core::{Product, ProductSummary, RatingSummary};
use tracing::debug;

use crate::error::DbResult;
use crate::store::{from_document, to_document, DocumentStore, UpdateResult};

/// Repository for product documents.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(store);
/// let product = repo.get_by_code("TSHIRT-001").await?;
/// ```
#[derive(Clone)]
pub struct ProductRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        ProductRepository { store }
    }

    /// Gets a product by its product code.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - No product carries this code
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let doc = self
            .store
            .find_one(Collection::Products, &Filter::equals(fields::PRODUCT_CODE, code))
            .await?;
        doc.map(from_document).transpose()
    }

    /// Inserts a new product and returns its `_id`.
    pub async fn insert(&self, product: &Product) -> DbResult<String> {
        debug!(code = %product.product_code, "Inserting product");
        self.store
            .insert_one(Collection::Products, to_document(product)?)
            .await
    }

    /// Lists products in `_id` order.
    pub async fn list(&self, limit: Option<usize>) -> DbResult<Vec<Product>> {
        let mut options = FindOptions::new();
        if let Some(limit) = limit {
            options = options.limit(limit);
        }
        self.store
            .find_many(Collection::Products, &Filter::All, &options)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Returns up to `limit` product summaries matching `filter`, in `_id`
    /// order. Only the summary fields are read from the store.
    pub async fn find_summaries(
        &self,
        filter: &Filter,
        limit: usize,
    ) -> DbResult<Vec<ProductSummary>> {
        let options = FindOptions::new()
            .limit(limit)
            .project(ProductSummary::PROJECTION.iter().copied());

        let docs = self
            .store
            .find_many(Collection::Products, filter, &options)
            .await?;

        docs.into_iter()
            .map(|doc| from_document::<Product>(doc).map(ProductSummary::from))
            .collect()
    }

    /// Persists a product's rating summary by product code.
    ///
    /// A zero `matched_count` means no product carries the code.
    pub async fn set_rating(&self, code: &str, summary: RatingSummary) -> DbResult<UpdateResult> {
        self.store
            .update_one(
                Collection::Products,
                &Filter::equals(fields::PRODUCT_CODE, code),
                &rating_update(summary),
            )
            .await
    }

    /// Resets `rating` and `reviews` to zero on every product whose code is
    /// not in `keep`.
    pub async fn reset_ratings_except(&self, keep: &[String]) -> DbResult<UpdateResult> {
        self.store
            .update_many(
                Collection::Products,
                &Filter::not_in(fields::PRODUCT_CODE, keep.iter().cloned()),
                &rating_update(RatingSummary::empty()),
            )
            .await
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<usize> {
        let docs = self
            .store
            .find_many(
                Collection::Products,
                &Filter::All,
                &FindOptions::new().project([fields::ID]),
            )
            .await?;
        Ok(docs.len())
    }
}

fn rating_update(summary: RatingSummary) -> Update {
    Update::new()
        .set(fields::RATING, summary.rating.as_f64())
        .set(fields::REVIEWS, summary.review_count)
}

// =============================================================================
// Unit Tests
// =============================================================================
