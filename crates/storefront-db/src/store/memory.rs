//! In-memory document store.
//!
//! Interprets filters with [`Filter::matches`]. Used by unit tests across
//! the workspace, and can be switched "offline" to exercise the
//! store-unavailable paths of the services.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use storefront_core::query::{
    compare_by, compare_values, lookup, project, values_equal, Collection, Document, Filter,
    FindOptions, SortDirection, Update, ID_FIELD,
};
use tokio::sync::RwLock;

use super::{take_id, DocumentStore, UpdateResult};
use crate::error::{DbError, DbResult};

type Table = BTreeMap<String, Document>;

/// A [`DocumentStore`] kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Table>>,
    available: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        InMemoryDocumentStore {
            collections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates an outage: while unavailable every operation fails with
    /// [`DbError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of documents in a collection.
    pub async fn document_count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    fn ensure_available(&self) -> DbResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DbError::Unavailable("in-memory store is offline".to_string()))
        }
    }

    async fn update_matching(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        limit: Option<usize>,
    ) -> DbResult<UpdateResult> {
        self.ensure_available()?;
        let mut collections = self.collections.write().await;
        let mut result = UpdateResult::default();

        let Some(table) = collections.get_mut(&collection) else {
            return Ok(result);
        };

        for doc in table.values_mut().filter(|doc| filter.matches(doc)) {
            if limit.is_some_and(|limit| result.matched_count >= limit as u64) {
                break;
            }
            result.matched_count += 1;
            if update.apply(doc) {
                result.modified_count += 1;
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> DbResult<Vec<Document>> {
        self.ensure_available()?;
        let collections = self.collections.read().await;
        let Some(table) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        // BTreeMap iteration is already in id order.
        let mut docs: Vec<&Document> = table.values().filter(|doc| filter.matches(doc)).collect();

        let (field, direction) = options.sort_key();
        if field != ID_FIELD {
            docs.sort_by(|a, b| compare_by(a, b, field).then_with(|| compare_by(a, b, ID_FIELD)));
        }
        if direction == SortDirection::Descending {
            docs.reverse();
        }
        if let Some(limit) = options.limit {
            docs.truncate(limit);
        }

        Ok(docs
            .into_iter()
            .map(|doc| match &options.projection {
                Some(fields) => project(doc, fields),
                None => doc.clone(),
            })
            .collect())
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> DbResult<UpdateResult> {
        self.update_matching(collection, filter, update, Some(1)).await
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> DbResult<UpdateResult> {
        self.update_matching(collection, filter, update, None).await
    }

    async fn distinct(&self, collection: Collection, field: &str) -> DbResult<Vec<Value>> {
        self.ensure_available()?;
        let collections = self.collections.read().await;
        let mut values: Vec<Value> = Vec::new();

        let mut push = |value: &Value| {
            if !value.is_null() && !values.iter().any(|v| values_equal(v, value)) {
                values.push(value.clone());
            }
        };

        for doc in collections.get(&collection).into_iter().flat_map(BTreeMap::values) {
            match lookup(doc, field) {
                Some(Value::Array(items)) => items.iter().for_each(&mut push),
                Some(value) => push(value),
                None => {}
            }
        }

        values.sort_by(compare_values);
        Ok(values)
    }

    async fn insert_one(&self, collection: Collection, mut doc: Document) -> DbResult<String> {
        self.ensure_available()?;
        let id = take_id(&mut doc)?;
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        let table = collections.entry(collection).or_default();
        if table.contains_key(&id) {
            return Err(DbError::duplicate(ID_FIELD, id));
        }
        table.insert(id.clone(), doc);
        Ok(id)
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> DbResult<u64> {
        self.ensure_available()?;
        let mut collections = self.collections.write().await;
        let Some(table) = collections.get_mut(&collection) else {
            return Ok(0);
        };

        let id = table
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone());

        Ok(match id {
            Some(id) => {
                table.remove(&id);
                1
            }
            None => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_find_sorted_and_projected() {
        let store = InMemoryDocumentStore::new();
        for (id, code, price) in [("b", "P-2", 5.0), ("a", "P-1", 9.0), ("c", "P-3", 1.0)] {
            store
                .insert_one(
                    Collection::Products,
                    doc(json!({"_id": id, "productCode": code, "price": price})),
                )
                .await
                .unwrap();
        }

        let by_id = store
            .find_many(Collection::Products, &Filter::All, &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(by_id[0]["_id"], json!("a"));

        let cheapest = store
            .find_many(
                Collection::Products,
                &Filter::All,
                &FindOptions::new()
                    .sort("price", SortDirection::Ascending)
                    .limit(1)
                    .project(["productCode"]),
            )
            .await
            .unwrap();
        assert_eq!(cheapest.len(), 1);
        assert_eq!(cheapest[0]["productCode"], json!("P-3"));
        assert!(!cheapest[0].contains_key("price"));
    }

    #[tokio::test]
    async fn test_update_one_touches_first_match_only() {
        let store = InMemoryDocumentStore::new();
        for id in ["1", "2"] {
            store
                .insert_one(Collection::Products, doc(json!({"_id": id, "category": "Home"})))
                .await
                .unwrap();
        }

        let result = store
            .update_one(
                Collection::Products,
                &Filter::equals("category", "Home"),
                &Update::new().set("topSelling", true),
            )
            .await
            .unwrap();
        assert_eq!(result, UpdateResult { matched_count: 1, modified_count: 1 });

        let top = store
            .find_many(
                Collection::Products,
                &Filter::equals("topSelling", true),
                &FindOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0]["_id"], json!("1"));
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_operation() {
        let store = InMemoryDocumentStore::new();
        store.set_available(false);

        let err = store
            .find_one(Collection::Products, &Filter::All)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.distinct(Collection::Reviews, "productCode").await.is_err());

        store.set_available(true);
        assert!(store.find_one(Collection::Products, &Filter::All).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one(Collection::Combos, doc(json!({"_id": "x"})))
            .await
            .unwrap();
        let err = store
            .insert_one(Collection::Combos, doc(json!({"_id": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(store.document_count(Collection::Combos).await, 1);
    }
}
