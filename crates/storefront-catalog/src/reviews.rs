//! # Review Service
//!
//! Accepts customer reviews and keeps the product rating current.
//!
//! ```text
//! submit(NewReview)
//!   ├─▶ validate (code, 1..=5 stars, name, text length)
//!   ├─▶ product exists?            no ──▶ CoreError::ProductNotFound
//!   ├─▶ insert review (createdAt = clock.now())
//!   ├─▶ RatingAggregator::recompute_rating
//!   │      failure ──▶ warn; the review stays stored and the next
//!   │                  bulk recompute repairs the product
//!   └─▶ CatalogEvent::ReviewAdded
//! ```

use std::sync::Arc;

use serde::Serialize;
use storefront_core::validation::validate_new_review;
use storefront_core::{CoreError, NewReview, RatingSummary, Review};
use storefront_db::{DocumentStore, ProductRepository, ReviewRepository};
use tracing::{info, warn};

use crate::cache::Clock;
use crate::error::CatalogResult;
use crate::events::{CatalogEvent, EventBus};
use crate::rating::RatingAggregator;

/// A stored review and the product's refreshed rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub review: Review,
    /// `None` when the rating refresh failed.
    pub summary: Option<RatingSummary>,
}

/// Review submission and listing.
#[derive(Clone)]
pub struct ReviewService {
    products: ProductRepository,
    reviews: ReviewRepository,
    aggregator: RatingAggregator,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl ReviewService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        aggregator: RatingAggregator,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        ReviewService {
            products: ProductRepository::new(Arc::clone(&store)),
            reviews: ReviewRepository::new(store),
            aggregator,
            clock,
            events,
        }
    }

    /// Validates and stores a review, then recomputes the product rating.
    pub async fn submit(&self, new_review: NewReview) -> CatalogResult<ReviewReceipt> {
        validate_new_review(&new_review)?;

        let mut review = new_review.into_review(self.clock.now());
        if self.products.get_by_code(&review.product_code).await?.is_none() {
            return Err(CoreError::ProductNotFound(review.product_code).into());
        }

        review.id = self.reviews.insert(&review).await?;
        info!(code = %review.product_code, stars = review.rating, "Review stored");

        let summary = match self.aggregator.recompute_rating(&review.product_code).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(
                    code = %review.product_code,
                    error = %e,
                    "Rating refresh after review failed"
                );
                None
            }
        };

        self.events.publish(CatalogEvent::ReviewAdded {
            product_code: review.product_code.clone(),
        });

        Ok(ReviewReceipt { review, summary })
    }

    /// Reviews of a product, newest first.
    pub async fn list(&self, product_code: &str) -> CatalogResult<Vec<Review>> {
        Ok(self.reviews.find_by_product(product_code.trim()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::CatalogError;
    use crate::test_support::{product, review, store_with, FlakyStore};
    use chrono::{TimeZone, Utc};

    fn new_review(code: &str, rating: i64) -> NewReview {
        NewReview {
            product_code: code.to_string(),
            rating,
            text: "  Fits well.  ".to_string(),
            name: "Grace".to_string(),
            verified: true,
        }
    }

    fn service(store: Arc<dyn DocumentStore>, events: EventBus) -> ReviewService {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        ));
        let aggregator = RatingAggregator::new(Arc::clone(&store));
        ReviewService::new(store, aggregator, clock, events)
    }

    #[tokio::test]
    async fn test_submit_stores_review_and_refreshes_rating() {
        let store = store_with(&[product("P-1", "Fashion", None, &[])], &[review("P-1", 4)]).await;
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let reviews = service(store, events);

        let receipt = reviews.submit(new_review(" P-1 ", 5)).await.unwrap();

        assert!(!receipt.review.id.is_empty());
        assert_eq!(receipt.review.product_code, "P-1");
        assert_eq!(receipt.review.text, "Fits well.");
        assert_eq!(
            receipt.review.created_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
        );
        let summary = receipt.summary.unwrap();
        assert_eq!(summary.rating.tenths(), 45);
        assert_eq!(summary.review_count, 2);

        let mut saw_review_added = false;
        while let Ok(event) = rx.try_recv() {
            saw_review_added |= matches!(event, CatalogEvent::ReviewAdded { .. });
        }
        assert!(saw_review_added);

        assert_eq!(reviews.list("P-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_reviews() {
        let store = store_with(&[product("P-1", "Fashion", None, &[])], &[]).await;
        let reviews = service(store, EventBus::new());

        let err = reviews.submit(new_review("P-1", 6)).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let mut nameless = new_review("P-1", 3);
        nameless.name = " ".into();
        let err = reviews.submit(nameless).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        assert!(reviews.list("P-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_for_unknown_product() {
        let store = store_with(&[], &[]).await;
        let err = service(store, EventBus::new())
            .submit(new_review("NOPE-1", 4))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_review_kept_when_rating_refresh_fails() {
        let store = store_with(&[product("P-1", "Fashion", None, &[])], &[]).await;
        let flaky = Arc::new(FlakyStore::new(store.clone()).failing_updates_for("P-1"));
        let reviews = service(flaky, EventBus::new());

        let receipt = reviews.submit(new_review("P-1", 4)).await.unwrap();
        assert!(receipt.summary.is_none());
        assert_eq!(reviews.list("P-1").await.unwrap().len(), 1);
    }
}
