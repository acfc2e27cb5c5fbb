//! # Document Store
//!
//! The collaborator the catalog services talk to.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DocumentStore (trait)                              │
//! │   find_many · find_one · update_one · update_many · distinct           │
//! │   insert_one · delete_one                                               │
//! │                  │                               │                      │
//! │                  ▼                               ▼                      │
//! │  ┌───────────────────────────────┐   ┌───────────────────────────────┐ │
//! │  │ SqliteDocumentStore           │   │ InMemoryDocumentStore         │ │
//! │  │ JSON bodies + JSON1 functions │   │ BTreeMap per collection       │ │
//! │  │ production, seed, CLI         │   │ tests, outage simulation      │ │
//! │  └───────────────────────────────┘   └───────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both implementations order results by `_id` ascending unless asked
//! otherwise, and both interpret [`Filter`] with the same semantics as
//! [`Filter::matches`].

mod memory;
mod sqlite;

pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use storefront_core::query::{Collection, Document, Filter, FindOptions, Update, ID_FIELD};

use crate::error::{DbError, DbResult};

/// Outcome of an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents the filter selected.
    pub matched_count: u64,
    /// Documents whose content actually changed.
    pub modified_count: u64,
}

/// A store of JSON documents grouped in collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the documents matching `filter`.
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> DbResult<Vec<Document>>;

    /// Returns the first matching document in `_id` order.
    async fn find_one(&self, collection: Collection, filter: &Filter) -> DbResult<Option<Document>> {
        let mut docs = self
            .find_many(collection, filter, &FindOptions::new().limit(1))
            .await?;
        Ok(docs.pop())
    }

    /// Applies `update` to the first matching document in `_id` order.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> DbResult<UpdateResult>;

    /// Applies `update` to every matching document.
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> DbResult<UpdateResult>;

    /// Returns the distinct values of `field`. Array fields contribute
    /// their elements. Missing and null values are skipped.
    async fn distinct(&self, collection: Collection, field: &str) -> DbResult<Vec<Value>>;

    /// Inserts a document and returns its `_id`. A missing `_id` is assigned.
    async fn insert_one(&self, collection: Collection, doc: Document) -> DbResult<String>;

    /// Deletes the first matching document in `_id` order. Returns the
    /// number of deleted documents (0 or 1).
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> DbResult<u64>;
}

// =============================================================================
// Helpers
// =============================================================================

/// Creates a new document identifier. v7 ids sort by creation time.
pub fn new_document_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Splits the `_id` off a document, generating one when absent.
pub(crate) fn take_id(doc: &mut Document) -> DbResult<String> {
    match doc.remove(ID_FIELD) {
        None | Some(Value::Null) => Ok(new_document_id()),
        Some(Value::String(id)) if id.is_empty() => Ok(new_document_id()),
        Some(Value::String(id)) => Ok(id),
        Some(other) => Err(DbError::InvalidQuery(format!(
            "{ID_FIELD} must be a string, got {other}"
        ))),
    }
}

/// Serializes a typed entity into a document.
pub fn to_document<T: Serialize>(value: &T) -> DbResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DbError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Deserializes a document into a typed entity.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> DbResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_id() {
        let mut doc = json!({"_id": "abc", "name": "x"}).as_object().cloned().unwrap();
        assert_eq!(take_id(&mut doc).unwrap(), "abc");
        assert!(!doc.contains_key("_id"));

        let mut doc = json!({"name": "x"}).as_object().cloned().unwrap();
        assert_eq!(take_id(&mut doc).unwrap().len(), 32);

        let mut doc = json!({"_id": 7}).as_object().cloned().unwrap();
        assert!(take_id(&mut doc).is_err());
    }

    #[test]
    fn test_new_ids_sort_by_creation() {
        let first = new_document_id();
        let second = new_document_id();
        assert!(first < second);
    }
}
