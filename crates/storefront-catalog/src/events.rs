//! # Catalog Events
//!
//! In-process notifications about catalog writes.
//!
//! ```text
//! ┌────────────────┐   publish    ┌──────────────┐   recv    ┌──────────────────┐
//! │ RatingAggregator│ ──────────▶ │   EventBus   │ ────────▶ │ CatalogCache     │
//! │ ReviewService  │              │ (broadcast,  │           │ invalidation     │
//! │ Catalog        │              │  256 slots)  │ ────────▶ │ other listeners  │
//! └────────────────┘              └──────────────┘           └──────────────────┘
//! ```
//!
//! Publishing never fails: without subscribers the event is dropped. A slow
//! subscriber that falls more than 256 events behind sees `Lagged` and must
//! assume it missed anything.

use serde::Serialize;
use storefront_core::RatingSummary;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something changed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CatalogEvent {
    /// A product was inserted.
    #[serde(rename_all = "camelCase")]
    ProductCreated { product_code: String },

    /// A product's stored rating summary was modified.
    #[serde(rename_all = "camelCase")]
    ProductRatingChanged {
        product_code: String,
        summary: RatingSummary,
    },

    /// A review was stored for a product.
    #[serde(rename_all = "camelCase")]
    ReviewAdded { product_code: String },

    /// A combo was inserted.
    #[serde(rename_all = "camelCase")]
    ComboCreated { combo_code: String },

    /// A bulk recompute finished.
    RatingsRecomputed { updated: u32 },
}

impl CatalogEvent {
    /// Whether the event changes product documents.
    pub fn touches_products(&self) -> bool {
        !matches!(self, CatalogEvent::ComboCreated { .. })
    }

    /// Whether the event changes combo documents.
    pub fn touches_combos(&self) -> bool {
        matches!(self, CatalogEvent::ComboCreated { .. })
    }
}

/// Broadcast bus for [`CatalogEvent`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventBus { tx }
    }

    /// Publishes an event to every current subscriber.
    pub fn publish(&self, event: CatalogEvent) {
        trace!(?event, "Publishing catalog event");
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(CatalogEvent::ReviewAdded {
            product_code: "P-1".into(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            CatalogEvent::ReviewAdded {
                product_code: "P-1".into()
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(CatalogEvent::RatingsRecomputed { updated: 3 });
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(CatalogEvent::ComboCreated {
            combo_code: "C-1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "comboCreated");
        assert_eq!(json["comboCode"], "C-1");
    }
}
