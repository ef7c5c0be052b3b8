//! In-memory document store.
//!
//! `DashMap`-backed implementation of [`DocumentStore`] with the same
//! filter/sort/projection semantics as the Postgres store. Used by the
//! test suites and handy for local development without a database.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::store::{
    apply_projection, json_cmp, path_get, path_set, Clause, Document, DocumentStore, Filter,
    FindOptions, Order, StoreError,
};

/// Lock-free map of collection name to documents.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(id: &str, doc: &Value, filter: &Filter) -> bool {
        filter.clauses.iter().all(|clause| match clause {
            Clause::Eq(path, value) => {
                if path == "_id" {
                    value.as_str() == Some(id)
                } else {
                    path_get(doc, path) == Some(value)
                }
            }
            Clause::NotEq(path, value) => path_get(doc, path) != Some(value),
            Clause::IdIn(ids) => ids.iter().any(|candidate| candidate == id),
            Clause::LteI64(path, bound) => path_get(doc, path)
                .and_then(Value::as_i64)
                .is_some_and(|v| v <= *bound),
        })
    }

    fn matching(&self, collection: &str, filter: &Filter) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|entry| Self::matches(entry.key(), entry.value(), filter))
                    .map(|entry| Document {
                        id: entry.key().clone(),
                        doc: entry.value().clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut results = self.matching(collection, filter);

        // Secondary id ordering keeps paging deterministic across calls.
        results.sort_by(|a, b| a.id.cmp(&b.id));
        if !options.sort.is_empty() {
            results.sort_by(|a, b| {
                for (path, order) in &options.sort {
                    let null = Value::Null;
                    let left = path_get(&a.doc, path).unwrap_or(&null);
                    let right = path_get(&b.doc, path).unwrap_or(&null);
                    let cmp = match order {
                        Order::Asc => json_cmp(left, right),
                        Order::Desc => json_cmp(right, left),
                    };
                    if cmp != std::cmp::Ordering::Equal {
                        return cmp;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let mut page: Vec<Document> = results.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            page.truncate(limit as usize);
        }

        if let Some(paths) = &options.projection {
            for document in &mut page {
                document.doc = apply_projection(&document.doc, paths);
            }
        }

        Ok(page)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.matching(collection, filter).into_iter().next())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.matching(collection, filter).len() as u64)
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
    ) -> Result<(), StoreError> {
        let docs = self.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        docs.insert(id.to_string(), doc);
        Ok(())
    }

    async fn upsert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
    ) -> Result<(), StoreError> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        sets: &[(&str, Value)],
    ) -> Result<u64, StoreError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(0);
        };
        let mut affected = 0;
        for mut entry in docs.iter_mut() {
            let id = entry.key().clone();
            if Self::matches(&id, entry.value(), filter) {
                for (path, value) in sets {
                    path_set(entry.value_mut(), path, value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn remove(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(0);
        };
        let doomed: Vec<String> = docs
            .iter()
            .filter(|entry| Self::matches(entry.key(), entry.value(), filter))
            .map(|entry| entry.key().clone())
            .collect();
        let mut affected = 0;
        for id in doomed {
            if docs.remove(&id).is_some() {
                affected += 1;
            }
        }
        Ok(affected)
    }
}
