//! # SQLite Document Store
//!
//! Documents live in one `documents` table as JSON text; filters are
//! translated to SQL over the JSON1 functions.
//!
//! ## Filter Translation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Filter                         SQL                                     │
//! │  ─────────────────────────────  ──────────────────────────────────────  │
//! │  Eq(category, "Fashion")        json_extract(body, '$.category') = ?    │
//! │  Eq(topSelling, true)           json_type(body, '$.topSelling')='true'  │
//! │  Eq(field, null)                json_extract(body, ?) IS NULL           │
//! │  Ne(field, v)                   json_extract(body, ?) IS NOT ?          │
//! │  In(field, [a, b, ...])         json_extract(body, ?) IN (              │
//! │                                   SELECT value FROM json_each(?))       │
//! │  NotIn(field, [...])            NOT of the In test                      │
//! │  ContainsAny(tags, [a, b])      json_type(..)='array' AND EXISTS (      │
//! │                                   SELECT 1 FROM json_each(body, ?) e    │
//! │                                   WHERE e.value IN (SELECT value        │
//! │                                   FROM json_each(?)))                   │
//! │  Eq(_id, "x")                   id = ?                                  │
//! │  And([]) / Or([])               1 / 0                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Candidate lists are bound as one JSON array, so a filter over thousands
//! of codes stays a single expression instead of running into SQLite's
//! expression depth limit.
//!
//! Updates are read-modify-write inside one `BEGIN IMMEDIATE` transaction:
//! matching rows are loaded, [`Update::apply`] runs in Rust, and only
//! changed bodies are written back. Taking the write lock before the read
//! means concurrent writers queue on the busy timeout instead of failing a
//! read-to-write lock upgrade.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Number, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use storefront_core::query::{
    compare_values, project, values_equal, Collection, Document, Filter, FindOptions,
    SortDirection, Update, ID_FIELD,
};
use tracing::debug;

use super::{take_id, DocumentStore, UpdateResult};
use crate::error::{DbError, DbResult};

/// Document store backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Creates a store over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteDocumentStore { pool }
    }

    /// Loads `(id, body)` rows for an update inside a write transaction.
    async fn update_matching(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        limit: Option<usize>,
    ) -> DbResult<UpdateResult> {
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Internal(msg) => DbError::TransactionFailed(msg),
                other => other,
            })?;

        let mut qb = select_ids_and_bodies(collection, filter)?;
        qb.push(" ORDER BY id ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit_to_i64(limit));
        }
        let rows: Vec<(String, String)> = qb.build_query_as().fetch_all(&mut *tx).await?;

        let mut result = UpdateResult {
            matched_count: rows.len() as u64,
            modified_count: 0,
        };

        let now = Utc::now();
        for (id, body) in rows {
            let mut doc: Document = serde_json::from_str(&body)?;
            if !update.apply(&mut doc) {
                continue;
            }
            doc.remove(ID_FIELD);
            sqlx::query(
                "UPDATE documents SET body = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
            )
            .bind(serde_json::to_string(&doc)?)
            .bind(now)
            .bind(collection.as_str())
            .bind(&id)
            .execute(&mut *tx)
            .await?;
            result.modified_count += 1;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            collection = %collection,
            matched = result.matched_count,
            modified = result.modified_count,
            "Documents updated"
        );
        Ok(result)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> DbResult<Vec<Document>> {
        let mut qb = select_ids_and_bodies(collection, filter)?;

        let (sort_field, direction) = options.sort_key();
        let dir = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        qb.push(" ORDER BY ");
        if sort_field != ID_FIELD {
            qb.push("json_extract(body, ");
            qb.push_bind(json_path(sort_field)?);
            qb.push(") ");
            qb.push(dir);
            qb.push(", ");
        }
        qb.push("id ");
        qb.push(dir);

        if let Some(limit) = options.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit_to_i64(limit));
        }

        let rows: Vec<(String, String)> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut docs = Vec::with_capacity(rows.len());
        for (id, body) in rows {
            let doc = with_id(id, &body)?;
            docs.push(match &options.projection {
                Some(fields) => project(&doc, fields),
                None => doc,
            });
        }

        debug!(collection = %collection, count = docs.len(), "Documents found");
        Ok(docs)
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
        if field == ID_FIELD {
            let ids: Vec<String> =
                sqlx::query_scalar("SELECT id FROM documents WHERE collection = ?1 ORDER BY id")
                    .bind(collection.as_str())
                    .fetch_all(&self.pool)
                    .await?;
            return Ok(ids.into_iter().map(Value::String).collect());
        }

        // json_each over a scalar yields the scalar itself, over an array
        // its elements.
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT DISTINCT j.type, CAST(j.value AS TEXT) \
             FROM documents d, json_each(d.body, ?1) j \
             WHERE d.collection = ?2 AND j.type != 'null'",
        )
        .bind(json_path(field)?)
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut values: Vec<Value> = Vec::with_capacity(rows.len());
        for (kind, text) in rows {
            let value = decode_json_each(&kind, text.as_deref())?;
            if !values.iter().any(|v| values_equal(v, &value)) {
                values.push(value);
            }
        }
        values.sort_by(compare_values);

        debug!(collection = %collection, field, count = values.len(), "Distinct values");
        Ok(values)
    }

    async fn insert_one(&self, collection: Collection, mut doc: Document) -> DbResult<String> {
        let id = take_id(&mut doc)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(collection.as_str())
        .bind(&id)
        .bind(serde_json::to_string(&doc)?)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate(ID_FIELD, id.clone()),
            other => other,
        })?;

        debug!(collection = %collection, id = %id, "Document inserted");
        Ok(id)
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> DbResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "DELETE FROM documents WHERE collection = ",
        );
        qb.push_bind(collection.as_str());
        qb.push(" AND id = (SELECT id FROM documents WHERE collection = ");
        qb.push_bind(collection.as_str());
        qb.push(" AND ");
        push_filter(&mut qb, filter)?;
        qb.push(" ORDER BY id ASC LIMIT 1)");

        let deleted = qb.build().execute(&self.pool).await?.rows_affected();
        debug!(collection = %collection, deleted, "Document deleted");
        Ok(deleted)
    }
}

// =============================================================================
// SQL Construction
// =============================================================================

fn select_ids_and_bodies(
    collection: Collection,
    filter: &Filter,
) -> DbResult<QueryBuilder<'static, Sqlite>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, body FROM documents WHERE collection = ");
    qb.push_bind(collection.as_str());
    qb.push(" AND ");
    push_filter(&mut qb, filter)?;
    Ok(qb)
}

/// A filter operand in the shape SQLite compares it.
enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl Scalar {
    fn from_value(value: &Value) -> DbResult<Self> {
        match value {
            Value::Null => Ok(Scalar::Null),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => Ok(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Real(n.as_f64().unwrap_or(0.0)),
            }),
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            other => Err(DbError::InvalidQuery(format!(
                "only scalar values can be compared, got {other}"
            ))),
        }
    }

    fn push_bind(self, qb: &mut QueryBuilder<'static, Sqlite>) {
        match self {
            Scalar::Null => {
                qb.push("NULL");
            }
            Scalar::Bool(b) => {
                qb.push_bind(i64::from(b));
            }
            Scalar::Int(i) => {
                qb.push_bind(i);
            }
            Scalar::Real(f) => {
                qb.push_bind(f);
            }
            Scalar::Text(s) => {
                qb.push_bind(s);
            }
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'static, Sqlite>, filter: &Filter) -> DbResult<()> {
    match filter {
        Filter::All => {
            qb.push("1");
        }
        Filter::Eq(field, value) => push_comparison(qb, field, value, false)?,
        Filter::Ne(field, value) => push_comparison(qb, field, value, true)?,
        Filter::In(field, values) => push_membership(qb, field, values)?,
        Filter::NotIn(field, values) => {
            qb.push("NOT ");
            push_membership(qb, field, values)?;
        }
        Filter::ContainsAny(field, values) => {
            if field == ID_FIELD || values.is_empty() {
                qb.push("0");
                return Ok(());
            }
            let candidates = Candidates::split(values)?;
            let path = json_path(field)?;
            qb.push("(json_type(body, ");
            qb.push_bind(path.clone());
            qb.push(") = 'array' AND EXISTS (SELECT 1 FROM json_each(body, ");
            qb.push_bind(path);
            qb.push(") e WHERE (e.type IN ('integer', 'real', 'text') AND e.value IN ");
            qb.push("(SELECT value FROM json_each(");
            qb.push_bind(candidates.scalar_list());
            qb.push(")))");
            for value in &candidates.literals {
                qb.push(" OR ");
                push_element_match(qb, value)?;
            }
            qb.push("))");
        }
        Filter::And(filters) => push_junction(qb, filters, " AND ", "1")?,
        Filter::Or(filters) => push_junction(qb, filters, " OR ", "0")?,
    }
    Ok(())
}

fn push_junction(
    qb: &mut QueryBuilder<'static, Sqlite>,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) -> DbResult<()> {
    if filters.is_empty() {
        qb.push(empty);
        return Ok(());
    }
    qb.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_filter(qb, filter)?;
    }
    qb.push(")");
    Ok(())
}

fn push_comparison(
    qb: &mut QueryBuilder<'static, Sqlite>,
    field: &str,
    value: &Value,
    negate: bool,
) -> DbResult<()> {
    let scalar = Scalar::from_value(value)?;

    if field == ID_FIELD {
        match scalar {
            Scalar::Text(id) => {
                qb.push(if negate { "id IS NOT " } else { "id = " });
                qb.push_bind(id);
            }
            // Ids are always strings.
            _ => {
                qb.push(if negate { "1" } else { "0" });
            }
        }
        return Ok(());
    }

    let path = json_path(field)?;
    match scalar {
        Scalar::Null => {
            qb.push("json_extract(body, ");
            qb.push_bind(path);
            qb.push(if negate { ") IS NOT NULL" } else { ") IS NULL" });
        }
        Scalar::Bool(b) => {
            qb.push("json_type(body, ");
            qb.push_bind(path);
            qb.push(if negate { ") IS NOT " } else { ") = " });
            qb.push(if b { "'true'" } else { "'false'" });
        }
        scalar => {
            qb.push("json_extract(body, ");
            qb.push_bind(path);
            qb.push(if negate { ") IS NOT " } else { ") = " });
            scalar.push_bind(qb);
        }
    }
    Ok(())
}

/// Candidate values of an `In`, `NotIn` or `ContainsAny` filter.
///
/// Numbers and strings go into one bound JSON array. JSON `true`/`false`
/// come back from `json_extract` as `1`/`0`, so booleans and `null` are
/// matched by type with separate clauses; there are at most three of them.
struct Candidates {
    scalars: Vec<Value>,
    literals: Vec<Value>,
}

impl Candidates {
    fn split(values: &[Value]) -> DbResult<Self> {
        let mut candidates = Candidates {
            scalars: Vec::new(),
            literals: Vec::new(),
        };
        for value in values {
            match Scalar::from_value(value)? {
                Scalar::Null | Scalar::Bool(_) => {
                    if !candidates.literals.contains(value) {
                        candidates.literals.push(value.clone());
                    }
                }
                _ => candidates.scalars.push(value.clone()),
            }
        }
        Ok(candidates)
    }

    fn scalar_list(&self) -> String {
        Value::Array(self.scalars.clone()).to_string()
    }
}

/// `field IN values` as one expression that is never NULL, so `NOT` in
/// front of it gives the `NotIn` semantics for missing fields too. A `null`
/// candidate matches nothing: null and missing fields both read as absent.
fn push_membership(
    qb: &mut QueryBuilder<'static, Sqlite>,
    field: &str,
    values: &[Value],
) -> DbResult<()> {
    let candidates = Candidates::split(values)?;

    if field == ID_FIELD {
        // Ids are always strings.
        let ids: Vec<Value> = candidates
            .scalars
            .into_iter()
            .filter(Value::is_string)
            .collect();
        qb.push("(id IN (SELECT value FROM json_each(");
        qb.push_bind(Value::Array(ids).to_string());
        qb.push(")))");
        return Ok(());
    }

    let path = json_path(field)?;
    qb.push("(IFNULL(json_type(body, ");
    qb.push_bind(path.clone());
    qb.push(") IN ('integer', 'real', 'text') AND json_extract(body, ");
    qb.push_bind(path);
    qb.push(") IN (SELECT value FROM json_each(");
    qb.push_bind(candidates.scalar_list());
    qb.push(")), 0)");
    for value in candidates.literals.iter().filter(|v| !v.is_null()) {
        qb.push(" OR IFNULL(");
        push_comparison(qb, field, value, false)?;
        qb.push(", 0)");
    }
    qb.push(")");
    Ok(())
}

/// Matches the current `json_each` row (aliased `e`) against a `null` or
/// boolean candidate.
fn push_element_match(qb: &mut QueryBuilder<'static, Sqlite>, value: &Value) -> DbResult<()> {
    match value {
        Value::Null => {
            qb.push("e.type = 'null'");
        }
        Value::Bool(b) => {
            qb.push(if *b { "e.type = 'true'" } else { "e.type = 'false'" });
        }
        other => {
            return Err(DbError::InvalidQuery(format!(
                "{other} is matched through the candidate list"
            )))
        }
    }
    Ok(())
}

/// Converts a dotted field name into a JSON path (`seo.slug` → `$.seo.slug`).
fn json_path(field: &str) -> DbResult<String> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(DbError::InvalidQuery(format!("unsupported field path '{field}'")));
    }
    Ok(format!("$.{field}"))
}

fn limit_to_i64(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn with_id(id: String, body: &str) -> DbResult<Document> {
    let mut doc: Document = serde_json::from_str(body)?;
    doc.insert(ID_FIELD.to_string(), Value::String(id));
    Ok(doc)
}

/// Rebuilds a JSON value from a `json_each` row.
fn decode_json_each(kind: &str, text: Option<&str>) -> DbResult<Value> {
    let text = text.unwrap_or_default();
    let bad = || DbError::Serialization(format!("unexpected {kind} value '{text}'"));
    Ok(match kind {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "integer" => Value::from(text.parse::<i64>().map_err(|_| bad())?),
        "real" => {
            let f = text.parse::<f64>().map_err(|_| bad())?;
            Number::from_f64(f).map(Value::Number).ok_or_else(bad)?
        }
        "text" => Value::String(text.to_string()),
        _ => serde_json::from_str(text)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
