//! Fixtures shared by the service tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use storefront_core::query::{Collection, Document, Filter, FindOptions, Update};
use storefront_core::types::fields;
use storefront_core::{Product, Rating, Review};
use storefront_db::{
    Database, DbConfig, DbError, DbResult, DocumentStore, InMemoryDocumentStore,
    ProductRepository, ReviewRepository, SqliteDocumentStore, UpdateResult,
};

pub fn product(code: &str, category: &str, subcategory: Option<&str>, tags: &[&str]) -> Product {
    Product {
        id: String::new(),
        product_code: code.to_string(),
        name: format!("Product {code}"),
        description: None,
        price: 10.0,
        images: Vec::new(),
        category: category.to_string(),
        subcategory: subcategory.map(str::to_string),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        top_selling: false,
        rating: Rating::zero(),
        reviews: 0,
        created_at: None,
    }
}

pub fn review(code: &str, rating: u8) -> Review {
    Review {
        id: String::new(),
        product_code: code.to_string(),
        rating,
        text: String::new(),
        name: "Ada".to_string(),
        verified: false,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    }
}

/// An in-memory store holding `products` (inserted in order, so `_id`
/// order follows slice order) and `reviews`.
pub async fn store_with(products: &[Product], reviews: &[Review]) -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    fill(store.clone(), products, reviews).await;
    store
}

/// Same fixture on an in-memory SQLite database.
pub async fn sqlite_store_with(
    products: &[Product],
    reviews: &[Review],
) -> Arc<SqliteDocumentStore> {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let store = db.store();
    fill(store.clone(), products, reviews).await;
    store
}

/// Same fixture on a SQLite file in `dir`, with the default pool settings.
pub async fn file_store_with(
    dir: &Path,
    products: &[Product],
    reviews: &[Review],
) -> Arc<SqliteDocumentStore> {
    let db = Database::new(DbConfig::new(dir.join("catalog.db")))
        .await
        .unwrap();
    let store = db.store();
    fill(store.clone(), products, reviews).await;
    store
}

async fn fill(store: Arc<dyn DocumentStore>, products: &[Product], reviews: &[Review]) {
    let product_repo = ProductRepository::new(Arc::clone(&store));
    let review_repo = ReviewRepository::new(store);

    for (index, product) in products.iter().enumerate() {
        let mut product = product.clone();
        if product.id.is_empty() {
            product.id = format!("{index:04}");
        }
        product_repo.insert(&product).await.unwrap();
    }
    for review in reviews {
        review_repo.insert(review).await.unwrap();
    }
}

/// Wraps a store and injects failures or delays into product updates.
pub struct FlakyStore {
    inner: Arc<dyn DocumentStore>,
    failing: HashSet<String>,
    slow: Option<(String, Duration)>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        FlakyStore {
            inner,
            failing: HashSet::new(),
            slow: None,
        }
    }

    /// `update_one` on this product code fails.
    pub fn failing_updates_for(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    /// `update_one` on this product code sleeps first.
    pub fn slow_updates_for(mut self, code: &str, delay: Duration) -> Self {
        self.slow = Some((code.to_string(), delay));
        self
    }
}

fn targeted_code(filter: &Filter) -> Option<&str> {
    match filter {
        Filter::Eq(field, Value::String(code)) if field == fields::PRODUCT_CODE => Some(code),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> DbResult<Vec<Document>> {
        self.inner.find_many(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> DbResult<UpdateResult> {
        if let Some(code) = targeted_code(filter) {
            if self.failing.contains(code) {
                return Err(DbError::QueryFailed(format!("injected failure for {code}")));
            }
            if let Some((slow, delay)) = &self.slow {
                if slow == code {
                    tokio::time::sleep(*delay).await;
                }
            }
        }
        self.inner.update_one(collection, filter, update).await
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> DbResult<UpdateResult> {
        self.inner.update_many(collection, filter, update).await
    }

    async fn distinct(&self, collection: Collection, field: &str) -> DbResult<Vec<Value>> {
        self.inner.distinct(collection, field).await
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> DbResult<String> {
        self.inner.insert_one(collection, doc).await
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> DbResult<u64> {
        self.inner.delete_one(collection, filter).await
    }
}
