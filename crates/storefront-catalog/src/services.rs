//! # Service Wiring
//!
//! Builds every catalog service from one configuration and one store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Storefront                                 │
//! │                                                                         │
//! │   StorefrontConfig ─┐                                                   │
//! │   DocumentStore ────┼──▶ RatingAggregator ──┐                           │
//! │   Clock ────────────┘    RelatedProductMatcher                          │
//! │                          ReviewService ◀────┘                           │
//! │                          Catalog ──▶ CatalogCache                       │
//! │                          CredentialResolver                             │
//! │                                                                         │
//! │   EventBus: shared by all of the above                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use storefront_db::DocumentStore;
use tokio::task::JoinHandle;

use crate::auth::{CredentialResolver, JwtVerifier};
use crate::cache::{CatalogCache, Clock};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::events::EventBus;
use crate::rating::RatingAggregator;
use crate::related::{RelatedOptions, RelatedProductMatcher};
use crate::reviews::ReviewService;

/// All catalog services, sharing one store, clock and event bus.
pub struct Storefront {
    pub ratings: RatingAggregator,
    pub related: RelatedProductMatcher,
    pub reviews: ReviewService,
    pub catalog: Catalog,
    pub credentials: CredentialResolver,
    pub events: EventBus,
    cache: Arc<CatalogCache>,
    default_related_limit: usize,
}

impl Storefront {
    pub fn new(
        config: &StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventBus::new();

        let mut ratings = RatingAggregator::new(Arc::clone(&store))
            .with_concurrency(config.ratings.bulk_concurrency)
            .with_events(events.clone());
        if let Some(deadline) = config.ratings.bulk_deadline() {
            ratings = ratings.with_deadline(deadline);
        }

        let related =
            RelatedProductMatcher::new(Arc::clone(&store)).with_strategy(config.related.strategy);

        let reviews = ReviewService::new(
            Arc::clone(&store),
            ratings.clone(),
            Arc::clone(&clock),
            events.clone(),
        );

        let cache = Arc::new(CatalogCache::new(
            Duration::from_secs(config.cache.ttl_secs),
            Arc::clone(&clock),
        ));
        let catalog = Catalog::new(store, Arc::clone(&cache), clock, events.clone());

        let credentials = CredentialResolver::standard(
            &config.auth.session_cookie,
            JwtVerifier::new(config.auth.jwt_secret.clone()),
        );

        Storefront {
            ratings,
            related,
            reviews,
            catalog,
            credentials,
            events,
            cache,
            default_related_limit: config.related.default_limit,
        }
    }

    /// Related-product options with the configured default limit.
    pub fn related_options(&self) -> RelatedOptions {
        RelatedOptions::new(self.default_related_limit)
    }

    /// Keeps the catalog cache in line with events published by every
    /// service. Stops when the bus is dropped.
    pub fn spawn_cache_invalidation(&self) -> JoinHandle<()> {
        Arc::clone(&self.cache).spawn_invalidation_listener(self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::related::RelatedStrategy;
    use crate::test_support::{product, review, store_with};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_wiring_follows_config() {
        let mut config = StorefrontConfig::default();
        config.related.strategy = RelatedStrategy::Widening;
        config.related.default_limit = 2;

        let store = store_with(
            &[
                product("A", "Home", Some("Decor"), &["gift"]),
                product("B", "Home", Some("Kitchen"), &[]),
                product("C", "Home", Some("Decor"), &["gift"]),
            ],
            &[review("A", 5)],
        )
        .await;
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let storefront = Storefront::new(&config, store, clock);

        assert_eq!(storefront.related.strategy(), RelatedStrategy::Widening);
        let found = storefront
            .related
            .find_related("A", storefront.related_options())
            .await
            .unwrap();
        let codes: Vec<_> = found.iter().map(|p| p.product_code.as_str()).collect();
        assert_eq!(codes, vec!["C", "B"]);

        let report = storefront.ratings.recompute_all_ratings().await.unwrap();
        assert_eq!(report.updated, 1);
    }

    #[tokio::test]
    async fn test_rating_change_invalidates_listing() {
        let store = store_with(&[product("A", "Home", None, &[])], &[review("A", 4)]).await;
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let storefront = Storefront::new(&StorefrontConfig::default(), store, clock);
        let listener = storefront.spawn_cache_invalidation();

        let before = storefront.catalog.products().await.unwrap();
        assert!(before[0].rating.is_zero());

        storefront.ratings.recompute_rating("A").await.unwrap();

        // The listener runs on its own task; poll until it has caught up.
        let mut after = storefront.catalog.products().await.unwrap();
        for _ in 0..50 {
            if !after[0].rating.is_zero() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            after = storefront.catalog.products().await.unwrap();
        }
        assert_eq!(after[0].rating.tenths(), 40);

        listener.abort();
    }
}
