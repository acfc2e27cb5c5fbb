//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Review      │   │     Combo       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  _id (store)    │◄──│  productCode    │   │  comboCode      │       │
//! │  │  productCode    │   │  rating (1-5)   │   │  productOptions │──►    │
//! │  │  category       │   │  text, name     │   │  suggested...   │       │
//! │  │  rating, reviews│   │  verified       │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  ┌─────────────────┐   ┌─────────────────────┐                          │
//! │  │ ProductSummary  │   │ BulkRecomputeReport │                          │
//! │  │ (related list)  │   │ (admin response)    │                          │
//! │  └─────────────────┘   └─────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every catalog entity has:
//! - `_id`: assigned by the document store, used for ordering
//! - Business ID: (`productCode`, `comboCode`) - human-readable, used in URLs
//!
//! Documents use camelCase field names; see [`fields`] for the ones the
//! core queries on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::rating::{Rating, RatingSummary};

/// Document field names the core filters and updates on.
pub mod fields {
    pub const ID: &str = crate::query::ID_FIELD;
    pub const PRODUCT_CODE: &str = "productCode";
    pub const COMBO_CODE: &str = "comboCode";
    pub const CATEGORY: &str = "category";
    pub const SUBCATEGORY: &str = "subcategory";
    pub const TAGS: &str = "tags";
    pub const TOP_SELLING: &str = "topSelling";
    pub const RATING: &str = "rating";
    pub const REVIEWS: &str = "reviews";
    pub const NAME: &str = "name";
    pub const PRICE: &str = "price";
    pub const IMAGES: &str = "images";
    pub const CREATED_AT: &str = "createdAt";
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-assigned identifier. Empty until inserted.
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Human-readable unique catalog identifier.
    pub product_code: String,

    /// Display name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display price in the store currency.
    pub price: f64,

    /// Image URLs; the first one is the thumbnail.
    #[serde(default)]
    pub images: Vec<String>,

    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    /// Free-form tags used for related-product matching.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Merchandising flag for best sellers.
    #[serde(default)]
    pub top_selling: bool,

    /// Average review score. Maintained by the rating aggregator.
    #[serde(default)]
    #[ts(type = "number")]
    pub rating: Rating,

    /// Number of reviews. Maintained by the rating aggregator.
    #[serde(default)]
    pub reviews: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns the stored rating summary.
    pub fn rating_summary(&self) -> RatingSummary {
        RatingSummary {
            rating: self.rating,
            review_count: self.reviews,
        }
    }

    /// Returns the thumbnail image, if any.
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Checks if the product carries any of the given tags.
    pub fn shares_tag_with(&self, other: &Product) -> bool {
        self.tags.iter().any(|tag| other.tags.contains(tag))
    }
}

// =============================================================================
// Product Summary
// =============================================================================

/// The slice of a product shown in related-product carousels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub product_code: String,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[ts(type = "number")]
    pub rating: Rating,
    pub reviews: u32,
    pub top_selling: bool,
}

impl ProductSummary {
    /// Fields a store needs to return to build a summary.
    pub const PROJECTION: &'static [&'static str] = &[
        fields::PRODUCT_CODE,
        fields::NAME,
        fields::PRICE,
        fields::IMAGES,
        fields::CATEGORY,
        fields::SUBCATEGORY,
        fields::RATING,
        fields::REVIEWS,
        fields::TOP_SELLING,
    ];
}

impl From<Product> for ProductSummary {
    fn from(p: Product) -> Self {
        ProductSummary {
            image: p.images.into_iter().next(),
            product_code: p.product_code,
            name: p.name,
            price: p.price,
            category: p.category,
            subcategory: p.subcategory,
            rating: p.rating,
            reviews: p.reviews,
            top_selling: p.top_selling,
        }
    }
}

// =============================================================================
// Review
// =============================================================================

/// A customer review of a product.
///
/// Reviews reference products by `productCode` only; deleting a product
/// leaves its reviews in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub product_code: String,

    /// Star score, 1 to 5.
    pub rating: u8,

    #[serde(default)]
    pub text: String,

    /// Display name of the reviewer.
    pub name: String,

    /// Reviewer bought the product.
    #[serde(default)]
    pub verified: bool,

    /// Older documents call this field `date`.
    #[serde(alias = "date")]
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for submitting a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_code: String,
    pub rating: i64,
    #[serde(default)]
    pub text: String,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
}

impl NewReview {
    /// Turns validated input into a review stamped at `now`.
    pub fn into_review(self, now: DateTime<Utc>) -> Review {
        Review {
            id: String::new(),
            product_code: self.product_code.trim().to_string(),
            rating: self.rating.clamp(1, 5) as u8,
            text: self.text.trim().to_string(),
            name: self.name.trim().to_string(),
            verified: self.verified,
            created_at: now,
        }
    }
}

// =============================================================================
// Combo
// =============================================================================

/// One slot of a curated combination: a product in a fixed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ComboSelection {
    pub product_code: String,
    pub size: String,
}

/// A named, pre-selected subset of a combo's product options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedCombination {
    pub name: String,
    pub selections: Vec<ComboSelection>,
}

/// A bundle offer over several products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub combo_code: String,

    pub name: String,

    pub price: f64,

    /// Number of products a customer picks from `product_options`.
    #[serde(default)]
    pub pick_count: u32,

    /// Product codes the customer can choose from.
    #[serde(default)]
    pub product_options: Vec<String>,

    #[serde(default)]
    pub suggested_combinations: Vec<SuggestedCombination>,
}

impl Combo {
    /// Returns suggested selections that reference products outside
    /// `product_options`.
    pub fn dangling_selections(&self) -> Vec<&ComboSelection> {
        self.suggested_combinations
            .iter()
            .flat_map(|c| c.selections.iter())
            .filter(|s| !self.product_options.contains(&s.product_code))
            .collect()
    }
}

// =============================================================================
// Bulk Recompute Report
// =============================================================================

/// Outcome of recomputing every product's rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkRecomputeReport {
    /// Product codes recomputed successfully.
    pub updated: u32,

    /// Distinct product codes found across reviews.
    pub total: u32,

    /// Products without reviews that were reset to zero.
    pub reset_to_zero: u32,

    /// Product codes whose recomputation failed.
    pub failed: u32,

    /// The overall deadline expired before all codes completed.
    pub timed_out: bool,
}

impl BulkRecomputeReport {
    /// Checks if every candidate completed without error.
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.failed == 0 && self.updated == self.total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_json() -> serde_json::Value {
        json!({
            "_id": "65a1",
            "productCode": "TSHIRT-001",
            "name": "Linen Tee",
            "price": 29.5,
            "images": ["https://cdn.example.com/tee.jpg"],
            "category": "Fashion",
            "subcategory": "Shirts",
            "tags": ["summer", "linen"],
            "topSelling": true,
            "rating": 4.7,
            "reviews": 3
        })
    }

    #[test]
    fn test_product_document_shape() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        assert_eq!(product.id, "65a1");
        assert_eq!(product.product_code, "TSHIRT-001");
        assert_eq!(product.rating.tenths(), 47);
        assert_eq!(product.thumbnail(), Some("https://cdn.example.com/tee.jpg"));

        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["topSelling"], json!(true));
        assert_eq!(back["rating"], json!(4.7));
    }

    #[test]
    fn test_product_defaults_for_missing_rating_fields() {
        let product: Product = serde_json::from_value(json!({
            "productCode": "NEW-1",
            "name": "New",
            "price": 10.0,
            "category": "Home"
        }))
        .unwrap();
        assert!(product.rating.is_zero());
        assert_eq!(product.reviews, 0);
        assert!(product.tags.is_empty());

        // Unsaved products do not serialize an empty id.
        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn test_summary_from_product() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        let summary = ProductSummary::from(product);
        assert_eq!(summary.image.as_deref(), Some("https://cdn.example.com/tee.jpg"));
        assert_eq!(summary.reviews, 3);
    }

    #[test]
    fn test_review_accepts_legacy_date_field() {
        let review: Review = serde_json::from_value(json!({
            "productCode": "TSHIRT-001",
            "rating": 5,
            "name": "Ada",
            "date": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(review.rating, 5);
        assert!(!review.verified);
    }

    #[test]
    fn test_combo_dangling_selections() {
        let combo = Combo {
            id: String::new(),
            combo_code: "DUO".into(),
            name: "Tee Duo".into(),
            price: 49.0,
            pick_count: 2,
            product_options: vec!["A".into(), "B".into()],
            suggested_combinations: vec![SuggestedCombination {
                name: "Classic".into(),
                selections: vec![
                    ComboSelection { product_code: "A".into(), size: "M".into() },
                    ComboSelection { product_code: "Z".into(), size: "L".into() },
                ],
            }],
        };
        let dangling = combo.dangling_selections();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].product_code, "Z");
    }
}
