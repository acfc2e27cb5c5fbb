//! # Combo Repository
//!
//! Combos are read-only for the catalog services; they are created by the
//! admin tooling and the seed binary.

use std::sync::Arc;
use storefront_core::query::{Collection, Filter, FindOptions};
use storefront_core::types::fields;
use storefront_core::Combo;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::store::{from_document, to_document, DocumentStore};

/// Repository for combo documents.
#[derive(Clone)]
pub struct ComboRepository {
    store: Arc<dyn DocumentStore>,
}

impl ComboRepository {
    /// Creates a new ComboRepository.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        ComboRepository { store }
    }

    /// Gets a combo by its combo code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Combo>> {
        let doc = self
            .store
            .find_one(Collection::Combos, &Filter::equals(fields::COMBO_CODE, code))
            .await?;
        doc.map(from_document).transpose()
    }

    /// Inserts a combo and returns its `_id`.
    ///
    /// Suggested selections outside the combo's product options are
    /// accepted but logged.
    pub async fn insert(&self, combo: &Combo) -> DbResult<String> {
        let dangling = combo.dangling_selections();
        if !dangling.is_empty() {
            warn!(
                code = %combo.combo_code,
                dangling = dangling.len(),
                "Combo suggests products outside its options"
            );
        }
        debug!(code = %combo.combo_code, "Inserting combo");
        self.store
            .insert_one(Collection::Combos, to_document(combo)?)
            .await
    }

    /// Lists all combos in `_id` order.
    pub async fn list(&self) -> DbResult<Vec<Combo>> {
        self.store
            .find_many(Collection::Combos, &Filter::All, &FindOptions::new())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;

    #[tokio::test]
    async fn test_insert_get_and_list() {
        let repo = ComboRepository::new(Arc::new(InMemoryDocumentStore::new()));
        let combo = Combo {
            id: String::new(),
            combo_code: "SUMMER-DUO".to_string(),
            name: "Summer Duo".to_string(),
            price: 49.0,
            pick_count: 2,
            product_options: vec!["TEE-1".to_string(), "SHORTS-1".to_string()],
            suggested_combinations: vec![],
        };
        repo.insert(&combo).await.unwrap();

        let found = repo.get_by_code("SUMMER-DUO").await.unwrap().unwrap();
        assert_eq!(found.pick_count, 2);
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.get_by_code("NONE").await.unwrap().is_none());
    }
}
