//! # Catalog
//!
//! Product and combo listings for the storefront pages, served from the
//! [`CatalogCache`], plus the admin writes that create new entries.
//!
//! New products always start unrated: `rating` and `reviews` are owned by
//! the [`RatingAggregator`](crate::rating::RatingAggregator).

use std::sync::Arc;

use storefront_core::validation::{
    require_combo_code, require_product_code, validate_combo_code, validate_product_code,
};
use storefront_core::{Combo, CoreError, Product, Rating, ValidationError};
use storefront_db::{ComboRepository, DocumentStore, ProductRepository};
use tracing::{info, warn};

use crate::cache::{CatalogCache, Clock};
use crate::error::{CatalogError, CatalogResult};
use crate::events::{CatalogEvent, EventBus};

/// Cached catalog reads and product/combo creation.
#[derive(Clone)]
pub struct Catalog {
    products: ProductRepository,
    combos: ComboRepository,
    cache: Arc<CatalogCache>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<CatalogCache>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Catalog {
            products: ProductRepository::new(Arc::clone(&store)),
            combos: ComboRepository::new(store),
            cache,
            clock,
            events,
        }
    }

    /// All products, in `_id` order.
    pub async fn products(&self) -> CatalogResult<Arc<Vec<Product>>> {
        self.cache
            .products()
            .get_or_try_load(|| async { self.products.list(None).await })
            .await
            .map_err(CatalogError::from)
    }

    /// All combos, in `_id` order.
    pub async fn combos(&self) -> CatalogResult<Arc<Vec<Combo>>> {
        self.cache
            .combos()
            .get_or_try_load(|| async { self.combos.list().await })
            .await
            .map_err(CatalogError::from)
    }

    /// One product by code. Reads the store directly.
    pub async fn product(&self, code: &str) -> CatalogResult<Product> {
        let code = require_product_code(code)?;
        self.products
            .get_by_code(code)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(code.to_string()).into())
    }

    /// One combo by code.
    pub async fn combo(&self, code: &str) -> CatalogResult<Combo> {
        let code = require_combo_code(code)?;
        self.combos
            .get_by_code(code)
            .await?
            .ok_or_else(|| CoreError::ComboNotFound(code.to_string()).into())
    }

    /// Stores a new product and returns it with its `_id`.
    pub async fn create_product(&self, mut product: Product) -> CatalogResult<Product> {
        product.product_code = validate_product_code(&product.product_code)?.to_string();
        if product.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "name".into(),
            }
            .into());
        }
        if product.category.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "category".into(),
            }
            .into());
        }
        if !(product.price.is_finite() && product.price >= 0.0) {
            return Err(ValidationError::InvalidFormat {
                field: "price".into(),
                reason: "must be a non-negative number".into(),
            }
            .into());
        }
        if self
            .products
            .get_by_code(&product.product_code)
            .await?
            .is_some()
        {
            return Err(ValidationError::Duplicate {
                field: "productCode".into(),
                value: product.product_code,
            }
            .into());
        }

        product.rating = Rating::zero();
        product.reviews = 0;
        if product.created_at.is_none() {
            product.created_at = Some(self.clock.now());
        }
        product.id = self.products.insert(&product).await?;

        info!(code = %product.product_code, id = %product.id, "Product created");
        self.notify(CatalogEvent::ProductCreated {
            product_code: product.product_code.clone(),
        })
        .await;
        Ok(product)
    }

    /// Stores a new combo and returns it with its `_id`.
    ///
    /// Every product option must exist. Suggested selections outside the
    /// options are accepted with a warning.
    pub async fn create_combo(&self, mut combo: Combo) -> CatalogResult<Combo> {
        combo.combo_code = validate_combo_code(&combo.combo_code)?.to_string();
        if combo.product_options.is_empty() {
            return Err(ValidationError::Required {
                field: "productOptions".into(),
            }
            .into());
        }
        if combo.pick_count == 0 || combo.pick_count as usize > combo.product_options.len() {
            return Err(ValidationError::OutOfRange {
                field: "pickCount".into(),
                min: 1,
                max: i64::try_from(combo.product_options.len()).unwrap_or(i64::MAX),
            }
            .into());
        }
        if self.combos.get_by_code(&combo.combo_code).await?.is_some() {
            return Err(ValidationError::Duplicate {
                field: "comboCode".into(),
                value: combo.combo_code,
            }
            .into());
        }
        for code in &combo.product_options {
            if self.products.get_by_code(code).await?.is_none() {
                return Err(CoreError::ProductNotFound(code.clone()).into());
            }
        }
        let dangling = combo.dangling_selections().len();
        if dangling > 0 {
            warn!(code = %combo.combo_code, dangling, "Combo suggests products outside its options");
        }

        combo.id = self.combos.insert(&combo).await?;

        info!(code = %combo.combo_code, id = %combo.id, "Combo created");
        self.notify(CatalogEvent::ComboCreated {
            combo_code: combo.combo_code.clone(),
        })
        .await;
        Ok(combo)
    }

    /// Invalidates this process's cache right away, then tells everyone else.
    async fn notify(&self, event: CatalogEvent) {
        self.cache.apply(&event).await;
        self.events.publish(event);
    }
}
