//! # Query Language
//!
//! The filter, update and find-option types every document store speaks.
//!
//! ## Why a Typed Filter?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Filter → Store Translation                         │
//! │                                                                         │
//! │  RelatedProductMatcher builds:                                          │
//! │    And[ NotIn(productCode, [P-1]), Eq(category, "Fashion"), ... ]       │
//! │       │                                                                 │
//! │       ├──► SqliteDocumentStore: json_extract(body, '$.category') = ?    │
//! │       │                                                                 │
//! │       └──► InMemoryDocumentStore: Filter::matches(&doc)                 │
//! │                                                                         │
//! │  One description of the query, two interpreters, same answers.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names are dotted JSON paths (`"tags"`, `"seo.slug"`). The store
//! identifier is the reserved field [`ID_FIELD`].

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Reserved field holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

// =============================================================================
// Collections
// =============================================================================

/// The collections of the storefront document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Reviews,
    Combos,
    Orders,
    Users,
    Wishlists,
}

impl Collection {
    /// Returns the collection name as stored.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Reviews => "reviews",
            Collection::Combos => "combos",
            Collection::Orders => "orders",
            Collection::Users => "users",
            Collection::Wishlists => "wishlists",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Filter
// =============================================================================

/// A predicate over documents.
///
/// ## Semantics
/// - `Eq` / `In` compare scalars; numbers compare by value (`1 == 1.0`).
/// - `Ne` / `NotIn` also match documents where the field is missing.
/// - `Eq(field, null)` matches a missing or null field.
/// - `ContainsAny` matches when an array field shares at least one element.
/// - `And([])` matches everything, `Or([])` matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    Ne(String, Value),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    ContainsAny(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// `field == value`
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// `field != value` (or missing)
    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    /// `field ∈ values`
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// `field ∉ values` (or missing)
    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::NotIn(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Array `field` shares at least one element with `values`.
    pub fn contains_any<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::ContainsAny(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, Value::Null) => lookup(doc, field).is_none(),
            Filter::Ne(field, Value::Null) => lookup(doc, field).is_some(),
            Filter::Eq(field, value) => lookup(doc, field).is_some_and(|v| values_equal(v, value)),
            Filter::Ne(field, value) => !lookup(doc, field).is_some_and(|v| values_equal(v, value)),
            Filter::In(field, values) => lookup(doc, field)
                .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate))),
            Filter::NotIn(field, values) => !lookup(doc, field)
                .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate))),
            Filter::ContainsAny(field, values) => match lookup(doc, field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| values.iter().any(|candidate| values_equal(item, candidate))),
                _ => false,
            },
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }

    /// Returns every field path the filter reads.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::All => {}
            Filter::Eq(field, _)
            | Filter::Ne(field, _)
            | Filter::In(field, _)
            | Filter::NotIn(field, _)
            | Filter::ContainsAny(field, _) => out.push(field),
            Filter::And(filters) | Filter::Or(filters) => {
                for filter in filters {
                    filter.collect_fields(out);
                }
            }
        }
    }
}

// =============================================================================
// Update
// =============================================================================

/// A `$set`-style update: assigns each listed field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Vec<(String, Value)>,
}

impl Update {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field assignment.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    /// Returns the field assignments in insertion order.
    pub fn assignments(&self) -> &[(String, Value)] {
        &self.set
    }

    /// Checks if the update assigns nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Applies the update to a document. Returns `true` when the document
    /// changed.
    ///
    /// Intermediate objects along a dotted path are created when missing.
    /// The identifier field is never rewritten.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.set {
            if field == ID_FIELD {
                continue;
            }
            changed |= set_path(doc, field, value);
        }
        changed
    }
}

// =============================================================================
// Find Options
// =============================================================================

/// Sort direction for [`FindOptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Options for `find_many`.
///
/// Without an explicit sort, stores order by [`ID_FIELD`] ascending so that
/// repeated calls return the same sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    /// Creates default options (id order, no limit, full documents).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts by a field.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some((field.into(), direction));
        self
    }

    /// Limits the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keeps only the listed fields (plus the identifier).
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the effective sort key and direction.
    pub fn sort_key(&self) -> (&str, SortDirection) {
        match &self.sort {
            Some((field, direction)) => (field.as_str(), *direction),
            None => (ID_FIELD, SortDirection::Ascending),
        }
    }
}

// =============================================================================
// Document Helpers
// =============================================================================

/// Looks up a dotted path in a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}

/// Returns a document reduced to the given fields plus the identifier.
pub fn project(doc: &Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        // Projection keeps top-level fields; dotted paths keep their root.
        let root = field.split('.').next().unwrap_or(field);
        if let Some(value) = doc.get(root) {
            out.insert(root.to_string(), value.clone());
        }
    }
    out
}

/// Compares two documents by a field for sorting. Missing values sort first.
pub fn compare_by(a: &Document, b: &Document, field: &str) -> Ordering {
    match (lookup(a, field), lookup(b, field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

/// Total order over scalar JSON values: bool < number < string < other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Equality with numeric comparison by value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn set_path(doc: &mut Document, path: &str, value: &Value) -> bool {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return false;
    };

    let mut current = doc;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return false,
        };
    }

    match current.get(last) {
        Some(existing) if values_equal(existing, value) => false,
        _ => {
            current.insert(last.to_string(), value.clone());
            true
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_eq_and_numeric_equality() {
        let d = doc(json!({"category": "Fashion", "rating": 4.0}));
        assert!(Filter::equals("category", "Fashion").matches(&d));
        assert!(Filter::equals("rating", 4).matches(&d));
        assert!(!Filter::equals("category", "Home").matches(&d));
    }

    #[test]
    fn test_ne_and_not_in_match_missing_fields() {
        let d = doc(json!({"productCode": "P-1"}));
        assert!(Filter::not_equals("subcategory", "Shirts").matches(&d));
        assert!(Filter::not_in("subcategory", ["Shirts"]).matches(&d));
        assert!(!Filter::not_in("productCode", ["P-1", "P-2"]).matches(&d));
    }

    #[test]
    fn test_contains_any() {
        let d = doc(json!({"tags": ["summer", "linen"]}));
        assert!(Filter::contains_any("tags", ["linen", "wool"]).matches(&d));
        assert!(!Filter::contains_any("tags", ["wool"]).matches(&d));
        assert!(!Filter::contains_any("missing", ["wool"]).matches(&d));
    }

    #[test]
    fn test_empty_and_or() {
        let d = doc(json!({}));
        assert!(Filter::And(vec![]).matches(&d));
        assert!(!Filter::Or(vec![]).matches(&d));
    }

    #[test]
    fn test_update_apply_reports_change() {
        let mut d = doc(json!({"_id": "a", "rating": 4.7, "reviews": 3}));
        let update = Update::new().set("rating", 4.7).set("reviews", 3);
        assert!(!update.apply(&mut d));

        let update = Update::new().set("reviews", 4).set("_id", "b");
        assert!(update.apply(&mut d));
        assert_eq!(d["reviews"], json!(4));
        assert_eq!(d["_id"], json!("a"));
    }

    #[test]
    fn test_update_creates_nested_path() {
        let mut d = doc(json!({}));
        assert!(Update::new().set("seo.slug", "linen-shirt").apply(&mut d));
        assert_eq!(lookup(&d, "seo.slug"), Some(&json!("linen-shirt")));
    }

    #[test]
    fn test_projection_keeps_id() {
        let d = doc(json!({"_id": "x", "rating": 5, "text": "great"}));
        let p = project(&d, &["rating".to_string()]);
        assert_eq!(p.len(), 2);
        assert!(p.contains_key("_id"));
        assert!(!p.contains_key("text"));
    }

    #[test]
    fn test_compare_values_orders_numbers_and_strings() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Ordering::Less);
        assert_eq!(compare_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(1)), Ordering::Less);
    }
}
