//! # Catalog Cache
//!
//! Time-bounded cache of the product and combo listings.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   get_or_try_load ──▶ fresh entry? ──yes──▶ Arc<Vec<_>>                 │
//! │                          │                                              │
//! │                          no (empty / older than ttl)                    │
//! │                          ▼                                              │
//! │                     loader().await ──▶ store (unless invalidated        │
//! │                                        while loading) ──▶ Arc<Vec<_>>   │
//! │                                                                         │
//! │   CatalogEvent ──▶ CatalogCache::apply ──▶ invalidate products/combos   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time comes from an injected [`Clock`] so expiry is testable without
//! sleeping. A TTL of zero disables caching.

use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use storefront_core::{Combo, Product};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::CatalogEvent;

// =============================================================================
// Clock
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(later) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|by| now.checked_add_signed(by))
        {
            *now = later;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// TtlCache
// =============================================================================

#[derive(Debug)]
struct Slot<T> {
    entry: Option<(DateTime<Utc>, Arc<T>)>,
    /// Bumped on every invalidation; a load that started under an older
    /// generation is not stored.
    generation: u64,
}

/// Single-value cache with a time-to-live.
#[derive(Debug)]
pub struct TtlCache<T> {
    slot: RwLock<Slot<T>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            slot: RwLock::new(Slot {
                entry: None,
                generation: 0,
            }),
            ttl,
            clock,
        }
    }

    /// Returns the cached value if it is still fresh.
    pub async fn get(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        let (stored_at, value) = slot.entry.as_ref()?;
        self.is_fresh(*stored_at).then(|| Arc::clone(value))
    }

    /// Stores a value, stamped with the current time.
    pub async fn put(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        if !self.ttl.is_zero() {
            let mut slot = self.slot.write().await;
            slot.entry = Some((self.clock.now(), Arc::clone(&value)));
        }
        value
    }

    /// Drops the cached value.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        slot.entry = None;
        slot.generation += 1;
    }

    /// Returns the cached value, or runs `loader` and caches its result.
    ///
    /// Loader errors are returned as-is and nothing is cached.
    pub async fn get_or_try_load<F, Fut, E>(&self, loader: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get().await {
            return Ok(hit);
        }

        let generation = self.slot.read().await.generation;
        let value = Arc::new(loader().await?);

        if !self.ttl.is_zero() {
            let mut slot = self.slot.write().await;
            if slot.generation == generation {
                slot.entry = Some((self.clock.now(), Arc::clone(&value)));
            } else {
                debug!("Cache invalidated during load, not storing result");
            }
        }
        Ok(value)
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| stored_at.checked_add_signed(ttl))
        {
            Some(expires_at) => self.clock.now() < expires_at,
            None => true,
        }
    }
}

// =============================================================================
// CatalogCache
// =============================================================================

/// Cached product and combo listings.
#[derive(Debug)]
pub struct CatalogCache {
    products: TtlCache<Vec<Product>>,
    combos: TtlCache<Vec<Combo>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        CatalogCache {
            products: TtlCache::new(ttl, Arc::clone(&clock)),
            combos: TtlCache::new(ttl, clock),
        }
    }

    pub fn products(&self) -> &TtlCache<Vec<Product>> {
        &self.products
    }

    pub fn combos(&self) -> &TtlCache<Vec<Combo>> {
        &self.combos
    }

    /// Invalidates whatever the event made stale.
    pub async fn apply(&self, event: &CatalogEvent) {
        if event.touches_products() {
            self.products.invalidate().await;
        }
        if event.touches_combos() {
            self.combos.invalidate().await;
        }
    }

    pub async fn invalidate_all(&self) {
        self.products.invalidate().await;
        self.combos.invalidate().await;
    }

    /// Spawns a task applying every event from `rx` until the bus closes.
    pub fn spawn_invalidation_listener(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<CatalogEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.apply(&event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Cache listener lagged, dropping all cached listings");
                        self.invalidate_all().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Cache invalidation listener stopped");
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use chrono::TimeZone;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let clock = clock();
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), clock.clone());

        cache.put(7).await;
        assert_eq!(cache.get().await.as_deref(), Some(&7));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get().await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_loader_runs_once_while_fresh() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), clock());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_load(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(42)
                })
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60), clock());

        let err = cache
            .get_or_try_load(|| async { Err::<u32, _>("offline") })
            .await
            .unwrap_err();
        assert_eq!(err, "offline");
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_caching() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::ZERO, clock());
        cache.put(1).await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_events_invalidate_matching_listing() {
        let cache = CatalogCache::new(Duration::from_secs(60), clock());
        cache.products().put(Vec::new()).await;
        cache.combos().put(Vec::new()).await;

        cache
            .apply(&CatalogEvent::ComboCreated {
                combo_code: "C-1".into(),
            })
            .await;
        assert!(cache.products().get().await.is_some());
        assert!(cache.combos().get().await.is_none());

        cache
            .apply(&CatalogEvent::ReviewAdded {
                product_code: "P-1".into(),
            })
            .await;
        assert!(cache.products().get().await.is_none());
    }

    #[tokio::test]
    async fn test_listener_stops_when_bus_dropped() {
        let cache = Arc::new(CatalogCache::new(Duration::from_secs(60), clock()));
        cache.products().put(Vec::new()).await;

        let bus = EventBus::new();
        let handle = Arc::clone(&cache).spawn_invalidation_listener(bus.subscribe());

        bus.publish(CatalogEvent::ProductCreated {
            product_code: "P-9".into(),
        });
        drop(bus);
        handle.await.unwrap();

        assert!(cache.products().get().await.is_none());
    }
}
