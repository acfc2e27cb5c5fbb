//! # Review Repository
//!
//! Reviews are append-only: inserted once, never updated. They reference
//! products by `productCode` only.

use serde_json::Value;
use std::sync::Arc;
use storefront_core::query::{Collection, Filter, FindOptions, SortDirection};
use storefront_core::types::fields;
use storefront_core::Review;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::store::{from_document, to_document, DocumentStore};

/// Repository for review documents.
#[derive(Clone)]
pub struct ReviewRepository {
    store: Arc<dyn DocumentStore>,
}

impl ReviewRepository {
    /// Creates a new ReviewRepository.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        ReviewRepository { store }
    }

    /// Inserts a review and returns its `_id`.
    pub async fn insert(&self, review: &Review) -> DbResult<String> {
        debug!(code = %review.product_code, rating = review.rating, "Inserting review");
        self.store
            .insert_one(Collection::Reviews, to_document(review)?)
            .await
    }

    /// Lists the reviews of a product, newest first.
    pub async fn find_by_product(&self, code: &str) -> DbResult<Vec<Review>> {
        self.store
            .find_many(
                Collection::Reviews,
                &Filter::equals(fields::PRODUCT_CODE, code),
                &FindOptions::new().sort(fields::CREATED_AT, SortDirection::Descending),
            )
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Returns the raw star scores stored for a product.
    ///
    /// Only the `rating` field is read. Scores that are not numbers are
    /// skipped with a warning; fractional scores round to the nearest star.
    pub async fn scores_for(&self, code: &str) -> DbResult<Vec<i64>> {
        let docs = self
            .store
            .find_many(
                Collection::Reviews,
                &Filter::equals(fields::PRODUCT_CODE, code),
                &FindOptions::new().project([fields::RATING]),
            )
            .await?;

        let mut scores = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.get(fields::RATING).and_then(Value::as_f64) {
                Some(score) => scores.push(score.round() as i64),
                None => warn!(
                    code = %code,
                    id = ?doc.get(fields::ID),
                    "Review without a numeric rating skipped"
                ),
            }
        }
        Ok(scores)
    }

    /// Returns every product code that has at least one review.
    pub async fn distinct_product_codes(&self) -> DbResult<Vec<String>> {
        let values = self
            .store
            .distinct(Collection::Reviews, fields::PRODUCT_CODE)
            .await?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(code) if !code.is_empty() => Some(code),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn review(code: &str, rating: u8, age_days: i64) -> Review {
        Review {
            id: String::new(),
            product_code: code.to_string(),
            rating,
            text: String::new(),
            name: "Ada".to_string(),
            verified: false,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_scores_and_distinct_codes() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = ReviewRepository::new(store.clone());

        repo.insert(&review("A", 4, 3)).await.unwrap();
        repo.insert(&review("A", 5, 2)).await.unwrap();
        repo.insert(&review("B", 2, 1)).await.unwrap();
        // A malformed document written by another client.
        store
            .insert_one(
                Collection::Reviews,
                json!({"productCode": "A", "rating": "five"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();

        let mut scores = repo.scores_for("A").await.unwrap();
        scores.sort();
        assert_eq!(scores, vec![4, 5]);

        let codes = repo.distinct_product_codes().await.unwrap();
        assert_eq!(codes, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_find_by_product_newest_first() {
        let repo = ReviewRepository::new(Arc::new(InMemoryDocumentStore::new()));
        repo.insert(&review("A", 3, 10)).await.unwrap();
        repo.insert(&review("A", 5, 1)).await.unwrap();

        let reviews = repo.find_by_product("A").await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].rating, 5);
    }
}
