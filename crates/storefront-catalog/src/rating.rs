//! # Rating Aggregator
//!
//! Keeps each product's denormalized `rating` / `reviews` fields in line
//! with its reviews.
//!
//! ## Single Recompute
//! ```text
//! recompute_rating("TSHIRT-001")
//!   │
//!   ├─▶ reviews.find_many(productCode == code, project rating)
//!   ├─▶ RatingSummary::from_scores    (mean, half-up to one decimal)
//!   └─▶ products.update_one(productCode == code, $set rating, reviews)
//!          matched 0 ──▶ warn, still Ok   (product deleted or never stored)
//!          modified 1 ──▶ CatalogEvent::ProductRatingChanged
//! ```
//!
//! ## Bulk Recompute
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. distinct(reviews.productCode)          error ──▶ propagate          │
//! │  2. recompute each code, `concurrency` at a time (buffer_unordered)     │
//! │        per-code error ──▶ warn, failed += 1                             │
//! │        deadline hit   ──▶ timed_out = true, skip step 3                 │
//! │  3. update_many(productCode ∉ codes, $set rating 0, reviews 0)          │
//! │        error ──▶ propagate                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two recomputes of the same product racing each other both read the full
//! review set and write the same summary, so no locking is needed.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use storefront_core::validation::require_product_code;
use storefront_core::{BulkRecomputeReport, RatingSummary};
use storefront_db::{DocumentStore, ProductRepository, ReviewRepository};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::CatalogResult;
use crate::events::{CatalogEvent, EventBus};

/// Default number of products recomputed concurrently by a bulk run.
pub const DEFAULT_BULK_CONCURRENCY: usize = 8;

/// Recomputes product rating summaries from reviews.
#[derive(Clone)]
pub struct RatingAggregator {
    products: ProductRepository,
    reviews: ReviewRepository,
    concurrency: usize,
    deadline: Option<Duration>,
    events: Option<EventBus>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        RatingAggregator {
            products: ProductRepository::new(Arc::clone(&store)),
            reviews: ReviewRepository::new(store),
            concurrency: DEFAULT_BULK_CONCURRENCY,
            deadline: None,
            events: None,
        }
    }

    /// Sets how many products a bulk run recomputes at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets an overall deadline for bulk runs.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Publishes rating changes on `events`.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Recomputes and stores the rating summary of one product.
    ///
    /// Returns the summary computed from the product's reviews, whether or
    /// not a product document carried the code.
    ///
    /// ## Errors
    /// * `Validation` - blank product code. Any other code is used exactly
    ///   as given, so products stored outside the catalog service with
    ///   spaces or punctuation in their codes still get recomputed.
    /// * `StoreUnavailable` / `Store` - the store failed a read or the write
    pub async fn recompute_rating(&self, product_code: &str) -> CatalogResult<RatingSummary> {
        let code = require_product_code(product_code)?;

        let scores = self.reviews.scores_for(code).await?;
        let summary = RatingSummary::from_scores(scores);

        let result = self.products.set_rating(code, summary).await?;
        if result.matched_count == 0 {
            warn!(code = %code, "Rating recomputed for a product that does not exist");
            return Ok(summary);
        }

        debug!(
            code = %code,
            rating = %summary.rating,
            reviews = summary.review_count,
            modified = result.modified_count,
            "Rating recomputed"
        );

        if result.modified_count > 0 {
            self.publish(CatalogEvent::ProductRatingChanged {
                product_code: code.to_string(),
                summary,
            });
        }
        Ok(summary)
    }

    /// Recomputes every reviewed product, then zeroes every product
    /// without reviews.
    ///
    /// ## Errors
    /// Only failures listing the reviewed codes or resetting the rest are
    /// returned; per-product failures are counted in the report.
    pub async fn recompute_all_ratings(&self) -> CatalogResult<BulkRecomputeReport> {
        let codes = self.reviews.distinct_product_codes().await?;
        let mut report = BulkRecomputeReport {
            total: u32::try_from(codes.len()).unwrap_or(u32::MAX),
            ..BulkRecomputeReport::default()
        };

        info!(
            total = report.total,
            concurrency = self.concurrency,
            deadline = ?self.deadline,
            "Bulk rating recompute started"
        );

        let deadline = self.deadline.map(|d| Instant::now() + d);
        let mut outcomes = pin!(stream::iter(codes.iter())
            .map(|code| async move { (code, self.recompute_rating(code).await) })
            .buffer_unordered(self.concurrency));

        loop {
            let next = match deadline {
                Some(at) => match timeout_at(at, outcomes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        report.timed_out = true;
                        break;
                    }
                },
                None => outcomes.next().await,
            };

            let Some((code, outcome)) = next else {
                break;
            };
            match outcome {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    warn!(code = %code, error = %e, "Rating recompute failed");
                    report.failed += 1;
                }
            }
        }

        if report.timed_out {
            warn!(
                updated = report.updated,
                failed = report.failed,
                total = report.total,
                "Bulk rating recompute hit its deadline, skipping reset"
            );
            return Ok(report);
        }

        let reset = self.products.reset_ratings_except(&codes).await?;
        report.reset_to_zero = u32::try_from(reset.modified_count).unwrap_or(u32::MAX);

        info!(
            updated = report.updated,
            failed = report.failed,
            reset_to_zero = report.reset_to_zero,
            "Bulk rating recompute finished"
        );

        self.publish(CatalogEvent::RatingsRecomputed {
            updated: report.updated,
        });
        Ok(report)
    }

    fn publish(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::test_support::{
        file_store_with, product, review, sqlite_store_with, store_with, FlakyStore,
    };
    use storefront_core::{Product, Review};

    async fn stored_rating(store: Arc<dyn DocumentStore>, code: &str) -> (u8, u32) {
        let product = ProductRepository::new(store)
            .get_by_code(code)
            .await
            .unwrap()
            .unwrap();
        (product.rating.tenths(), product.reviews)
    }

    #[tokio::test]
    async fn test_mean_rounds_half_up() {
        let store = store_with(
            &[product("P-1", "Fashion", None, &[])],
            &[review("P-1", 4), review("P-1", 5), review("P-1", 5)],
        )
        .await;
        let aggregator = RatingAggregator::new(store.clone());

        let summary = aggregator.recompute_rating("P-1").await.unwrap();
        assert_eq!(summary.rating.tenths(), 47);
        assert_eq!(summary.review_count, 3);
        assert_eq!(stored_rating(store, "P-1").await, (47, 3));
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let store = store_with(
            &[product("P-1", "Fashion", None, &[])],
            &[review("P-1", 1), review("P-1", 2)],
        )
        .await;
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let aggregator = RatingAggregator::new(store.clone()).with_events(events);

        let first = aggregator.recompute_rating("P-1").await.unwrap();
        let second = aggregator.recompute_rating("P-1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(stored_rating(store, "P-1").await, (15, 2));

        // Only the first write changed the document.
        assert!(matches!(
            rx.try_recv(),
            Ok(CatalogEvent::ProductRatingChanged { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_zero_reviews_gives_zero_rating() {
        let mut rated = product("P-1", "Fashion", None, &[]);
        rated.rating = storefront_core::Rating::from_tenths(42);
        rated.reviews = 9;
        let store = store_with(&[rated], &[]).await;

        let summary = RatingAggregator::new(store.clone())
            .recompute_rating("P-1")
            .await
            .unwrap();
        assert_eq!(summary, RatingSummary::empty());
        assert_eq!(stored_rating(store, "P-1").await, (0, 0));
    }

    #[tokio::test]
    async fn test_missing_product_is_not_an_error() {
        let store = store_with(&[], &[review("GONE-1", 5)]).await;
        let summary = RatingAggregator::new(store)
            .recompute_rating("GONE-1")
            .await
            .unwrap();
        assert_eq!(summary.review_count, 1);
    }

    #[tokio::test]
    async fn test_blank_code_rejected() {
        let store = store_with(&[], &[]).await;
        let err = RatingAggregator::new(store)
            .recompute_rating("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_free_form_stored_code_is_recomputed() {
        let mut stale = product("Summer Tee", "Fashion", None, &[]);
        stale.rating = storefront_core::Rating::from_tenths(40);
        stale.reviews = 1;
        let store = store_with(&[stale], &[review("Summer Tee", 2), review("Summer Tee", 3)]).await;

        let report = RatingAggregator::new(store.clone())
            .recompute_all_ratings()
            .await
            .unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(stored_rating(store, "Summer Tee").await, (25, 2));
    }

    #[tokio::test]
    async fn test_bulk_recomputes_and_resets_unreviewed() {
        let mut stale = product("B", "Fashion", None, &[]);
        stale.rating = storefront_core::Rating::from_tenths(30);
        stale.reviews = 1;
        let store = store_with(
            &[product("A", "Fashion", None, &[]), stale],
            &[review("A", 3), review("A", 4)],
        )
        .await;

        let report = RatingAggregator::new(store.clone())
            .recompute_all_ratings()
            .await
            .unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.reset_to_zero, 1);
        assert!(report.is_complete());
        assert_eq!(stored_rating(store.clone(), "A").await, (35, 2));
        assert_eq!(stored_rating(store, "B").await, (0, 0));
    }

    #[tokio::test]
    async fn test_bulk_counts_partial_failures() {
        let store = store_with(
            &[
                product("A", "Fashion", None, &[]),
                product("B", "Fashion", None, &[]),
                product("C", "Fashion", None, &[]),
            ],
            &[review("A", 5), review("B", 4), review("C", 3)],
        )
        .await;
        let flaky = Arc::new(FlakyStore::new(store.clone()).failing_updates_for("B"));

        let report = RatingAggregator::new(flaky)
            .with_concurrency(2)
            .recompute_all_ratings()
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.timed_out);
        assert_eq!(stored_rating(store.clone(), "A").await, (50, 1));
        assert_eq!(stored_rating(store, "C").await, (30, 1));
    }

    #[tokio::test]
    async fn test_bulk_deadline_skips_reset() {
        let mut stale = product("Z", "Fashion", None, &[]);
        stale.rating = storefront_core::Rating::from_tenths(20);
        stale.reviews = 1;
        let store = store_with(
            &[product("A", "Fashion", None, &[]), stale],
            &[review("A", 5)],
        )
        .await;
        let flaky =
            Arc::new(FlakyStore::new(store.clone()).slow_updates_for("A", Duration::from_secs(30)));

        let report = RatingAggregator::new(flaky)
            .with_deadline(Duration::from_millis(100))
            .recompute_all_ratings()
            .await
            .unwrap();

        assert!(report.timed_out);
        assert_eq!(report.updated, 0);
        assert_eq!(report.reset_to_zero, 0);
        assert_eq!(stored_rating(store, "Z").await, (20, 1));
    }

    #[tokio::test]
    async fn test_bulk_propagates_unavailable_store() {
        let store = store_with(&[], &[review("A", 5)]).await;
        store.set_available(false);

        let err = RatingAggregator::new(store)
            .recompute_all_ratings()
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_bulk_on_sqlite_resets_past_a_thousand_reviewed_products() {
        let mut products: Vec<Product> = (0..1100)
            .map(|i| product(&format!("P-{i:04}"), "Fashion", None, &[]))
            .collect();
        let mut stale = product("UNREVIEWED", "Fashion", None, &[]);
        stale.rating = storefront_core::Rating::from_tenths(30);
        stale.reviews = 1;
        products.push(stale);

        let mut reviews: Vec<Review> = products[..1100]
            .iter()
            .map(|p| review(&p.product_code, 4))
            .collect();
        reviews.push(review("P-0000", 5));
        reviews.push(review("P-0000", 5));

        let store = sqlite_store_with(&products, &reviews).await;
        let report = RatingAggregator::new(store.clone())
            .recompute_all_ratings()
            .await
            .unwrap();

        assert_eq!(report.total, 1100);
        assert_eq!(report.updated, 1100);
        assert_eq!(report.failed, 0);
        assert_eq!(report.reset_to_zero, 1);
        assert_eq!(stored_rating(store.clone(), "P-0000").await, (47, 3));
        assert_eq!(stored_rating(store.clone(), "P-1099").await, (40, 1));
        assert_eq!(stored_rating(store, "UNREVIEWED").await, (0, 0));
    }

    #[tokio::test]
    async fn test_concurrent_recomputes_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let products: Vec<Product> = (0..300)
            .map(|i| product(&format!("P-{i:03}"), "Fashion", None, &[]))
            .collect();
        let reviews: Vec<Review> = products
            .iter()
            .flat_map(|p| [3, 4, 5].map(|stars| review(&p.product_code, stars)))
            .collect();
        let store = file_store_with(dir.path(), &products, &reviews).await;
        let aggregator = RatingAggregator::new(store.clone()).with_concurrency(8);

        for _ in 0..2 {
            let report = aggregator.recompute_all_ratings().await.unwrap();
            assert_eq!(report.total, 300);
            assert_eq!(report.updated, 300, "{report:?}");
            assert_eq!(report.failed, 0);
        }
        assert_eq!(stored_rating(store.clone(), "P-123").await, (40, 3));

        let single: Vec<_> = (0..50)
            .map(|i| {
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    aggregator.recompute_rating(&format!("P-{:03}", i % 10)).await
                })
            })
            .collect();
        for handle in single {
            assert_eq!(handle.await.unwrap().unwrap().review_count, 3);
        }
    }

    #[tokio::test]
    async fn test_bulk_publishes_summary_event() {
        let store = store_with(&[product("A", "Fashion", None, &[])], &[review("A", 2)]).await;
        let events = EventBus::new();
        let mut rx = events.subscribe();

        RatingAggregator::new(store)
            .with_events(events)
            .recompute_all_ratings()
            .await
            .unwrap();

        let mut saw_summary = false;
        while let Ok(event) = rx.try_recv() {
            if event == (CatalogEvent::RatingsRecomputed { updated: 1 }) {
                saw_summary = true;
            }
        }
        assert!(saw_summary);
    }
}
