//! # Related-Product Queries
//!
//! Builds the filters the related-product matcher sends to the store.
//!
//! ## Query Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source: TSHIRT-001 { category: Fashion, subcategory: Shirts,           │
//! │                       tags: [summer, linen] }                           │
//! │                                                                         │
//! │  And[                                                                   │
//! │    NotIn(productCode, [TSHIRT-001, <exclude>])   ← always               │
//! │    Eq(category, "Fashion")                       ← always               │
//! │    Eq(subcategory, "Shirts")                     ← Strict tier only     │
//! │    Or[ ContainsAny(tags, [summer, linen]),       ← when source has tags │
//! │        Eq(topSelling, true) ]                                           │
//! │  ]                                                                      │
//! │                                                                         │
//! │  Tiers (widening strategy):                                             │
//! │    Strict ──► CategoryWithBoost ──► CategoryOnly                        │
//! │    each later tier also excludes codes already found                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The category filter is never dropped, in any tier.

use serde_json::Value;

use crate::query::Filter;
use crate::types::{fields, Product};

/// How much of the preference a related-product query keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedTier {
    /// Category, subcategory (if any) and tag boost (if any).
    Strict,
    /// Category and tag boost.
    CategoryWithBoost,
    /// Category only.
    CategoryOnly,
}

impl RelatedTier {
    /// Tiers tried by the widening strategy, in order.
    pub const WIDENING: [RelatedTier; 3] = [
        RelatedTier::Strict,
        RelatedTier::CategoryWithBoost,
        RelatedTier::CategoryOnly,
    ];
}

/// Returns the product codes a related query must never return.
pub fn excluded_codes(source_code: &str, exclude: Option<&str>) -> Vec<String> {
    let mut codes = vec![source_code.to_string()];
    if let Some(extra) = exclude.map(str::trim).filter(|c| !c.is_empty()) {
        if extra != source_code {
            codes.push(extra.to_string());
        }
    }
    codes
}

/// Builds the related-product filter for a source at the given tier.
///
/// `excluded` lists product codes that must not appear: at least the
/// source itself (see [`excluded_codes`]).
///
/// ## Example
/// ```rust
/// use storefront_core::query::{Document, Filter};
/// use storefront_core::related::{related_filter, RelatedTier};
/// use storefront_core::Product;
/// use serde_json::json;
///
/// let source: Product = serde_json::from_value(json!({
///     "productCode": "P-1", "name": "Tee", "price": 10.0, "category": "Fashion"
/// })).unwrap();
///
/// let filter = related_filter(&source, &["P-1".to_string()], RelatedTier::Strict);
/// let other: Document = json!({"productCode": "P-2", "category": "Fashion"})
///     .as_object().cloned().unwrap();
/// assert!(filter.matches(&other));
/// ```
pub fn related_filter(source: &Product, excluded: &[String], tier: RelatedTier) -> Filter {
    let mut clauses = vec![
        Filter::not_in(fields::PRODUCT_CODE, excluded.iter().cloned()),
        Filter::equals(fields::CATEGORY, source.category.clone()),
    ];

    if tier == RelatedTier::Strict {
        if let Some(subcategory) = source.subcategory.as_deref().filter(|s| !s.is_empty()) {
            clauses.push(Filter::equals(fields::SUBCATEGORY, subcategory));
        }
    }

    if tier != RelatedTier::CategoryOnly {
        if let Some(boost) = boost_filter(&source.tags) {
            clauses.push(boost);
        }
    }

    Filter::And(clauses)
}

/// Filter used when the source product cannot be found: any product other
/// than the excluded ones.
pub fn fallback_filter(excluded: &[String]) -> Filter {
    Filter::not_in(fields::PRODUCT_CODE, excluded.iter().cloned())
}

/// `tags ∩ source_tags ≠ ∅ OR topSelling == true`, or `None` without tags.
///
/// The clause is ANDed with the mandatory filters, so for a tagged source it
/// narrows the result: a same-subcategory product sharing no tag and not a
/// top seller is left out.
fn boost_filter(tags: &[String]) -> Option<Filter> {
    if tags.is_empty() {
        return None;
    }
    Some(Filter::Or(vec![
        Filter::contains_any(fields::TAGS, tags.iter().cloned()),
        Filter::Eq(fields::TOP_SELLING.to_string(), Value::Bool(true)),
    ]))
}

// =============================================================================
// Unit Tests
// =============================================================================
