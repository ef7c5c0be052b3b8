//! Document store query model.
//!
//! The service consumes its backing store through a narrow,
//! Mongo-flavoured surface: find with filter/projection/sort/skip/limit,
//! count, insert, upsert, single-document update, and remove with a
//! reported affected count. Filters are data, which is what lets the
//! authorization gate rewrite them before execution.

use async_trait::async_trait;
use serde_json::Value;

/// A stored document: the id column plus the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub doc: Value,
}

/// One constraint inside a [`Filter`].
///
/// Paths are dot-separated (`"user.id"`); the reserved path `_id`
/// addresses the id column rather than the document body.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field equals the given JSON value.
    Eq(String, Value),
    /// Field differs from the given JSON value; a missing field counts
    /// as different.
    NotEq(String, Value),
    /// Id column is one of the given ids.
    IdIn(Vec<String>),
    /// Numeric field is less than or equal to the given integer.
    LteI64(String, i64),
}

/// A conjunction of clauses. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

impl Filter {
    /// A filter matching every document in a collection.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Match a single document by id.
    #[must_use]
    pub fn by_id(id: &str) -> Self {
        Self::all().eq("_id", Value::String(id.to_string()))
    }

    /// Match documents whose id is in the given set.
    #[must_use]
    pub fn by_ids(ids: Vec<String>) -> Self {
        Self {
            clauses: vec![Clause::IdIn(ids)],
        }
    }

    /// Add an equality constraint.
    #[must_use]
    pub fn eq(mut self, path: &str, value: Value) -> Self {
        self.clauses.push(Clause::Eq(path.to_string(), value));
        self
    }

    /// Add an inequality constraint (missing field matches).
    #[must_use]
    pub fn not_eq(mut self, path: &str, value: Value) -> Self {
        self.clauses.push(Clause::NotEq(path.to_string(), value));
        self
    }

    /// Add a `<=` constraint on an integer field.
    #[must_use]
    pub fn lte(mut self, path: &str, bound: i64) -> Self {
        self.clauses.push(Clause::LteI64(path.to_string(), bound));
        self
    }
}

/// Sort direction for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Options for a find call.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Dotted paths to retain in returned documents. `None` keeps all.
    pub projection: Option<Vec<String>>,
    /// Sort keys, applied in order. Missing fields sort lowest.
    pub sort: Vec<(String, Order)>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    #[must_use]
    pub fn projection(mut self, paths: &[&str]) -> Self {
        self.projection = Some(paths.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn sort(mut self, path: &str, order: Order) -> Self {
        self.sort.push((path.to_string(), order));
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Store-level failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("duplicate id {0}")]
    DuplicateId(String),
}

/// The persistence contract consumed by every service component.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
    ) -> Result<(), StoreError>;

    /// Insert or fully replace the document with the given id.
    async fn upsert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
    ) -> Result<(), StoreError>;

    /// Set fields on the documents matching the filter, returning the
    /// affected count. Callers address a single document by id.
    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        sets: &[(&str, Value)],
    ) -> Result<u64, StoreError>;

    /// Remove matching documents, returning the affected count.
    async fn remove(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}

/// Read a dotted path out of a JSON document.
#[must_use]
pub fn path_get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Set a dotted path in a JSON document, creating intermediate objects.
pub fn path_set(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let map = match current {
            Value::Object(map) => map,
            other => {
                *other = Value::Object(serde_json::Map::new());
                match other {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                }
            }
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
}

/// Keep only the given dotted paths of a document.
#[must_use]
pub fn apply_projection(doc: &Value, paths: &[String]) -> Value {
    let mut out = Value::Object(serde_json::Map::new());
    for path in paths {
        if let Some(value) = path_get(doc, path) {
            path_set(&mut out, path, value.clone());
        }
    }
    out
}

/// Total order over JSON values used for in-memory sorting: null lowest,
/// then booleans, numbers, strings; everything else compares equal.
#[must_use]
pub fn json_cmp(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
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

/// Generate a fresh canonical document id.
#[must_use]
pub fn new_object_id() -> String {
    qb_common::ItemId::generate().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_get_nested() {
        let doc = json!({ "user": { "id": "u1", "name": "Ada" } });
        assert_eq!(path_get(&doc, "user.id"), Some(&json!("u1")));
        assert_eq!(path_get(&doc, "user.photo"), None);
        assert_eq!(path_get(&doc, "missing.deep"), None);
    }

    #[test]
    fn test_projection_keeps_only_named_paths() {
        let doc = json!({
            "title": "t",
            "content": { "a": "x" },
            "user": { "id": "u1", "name": "Ada", "photo": null }
        });
        let projected = apply_projection(
            &doc,
            &["title".to_string(), "user.name".to_string()],
        );
        assert_eq!(projected, json!({ "title": "t", "user": { "name": "Ada" } }));
    }

    #[test]
    fn test_json_cmp_orders_missing_below_values() {
        assert_eq!(
            json_cmp(&Value::Null, &json!(true)),
            std::cmp::Ordering::Less
        );
        assert_eq!(json_cmp(&json!(false), &json!(true)), std::cmp::Ordering::Less);
        assert_eq!(json_cmp(&json!(2), &json!(10)), std::cmp::Ordering::Less);
    }

    #[test]
    fn test_filter_builder() {
        let filter = Filter::by_id("a".repeat(24).as_str()).eq("user.id", json!("u1"));
        assert_eq!(filter.clauses.len(), 2);
        assert!(matches!(&filter.clauses[1], Clause::Eq(p, _) if p == "user.id"));
    }
}
