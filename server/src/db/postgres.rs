//! `PostgreSQL` document store.
//!
//! Documents live in a single `documents(collection, id, doc JSONB)`
//! table; filters compile to JSONB path expressions at runtime. The
//! `(collection, id)` primary key doubles as the uniqueness constraint
//! for moderation records keyed by identity.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::store::{
    apply_projection, Clause, Document, DocumentStore, Filter, FindOptions, Order, StoreError,
};

/// [`DocumentStore`] backed by a `PgPool`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Render a dotted path as a JSONB path literal (`'{user,id}'`).
///
/// Paths come from code, never from callers; non-identifier characters
/// are stripped as a hard stop against injection.
fn jsonb_path(path: &str) -> String {
    let segments: Vec<String> = path
        .split('.')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect()
        })
        .collect();
    format!("'{{{}}}'", segments.join(","))
}

fn id_string(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), ToString::to_string)
}

fn push_clauses(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for clause in &filter.clauses {
        qb.push(" AND ");
        match clause {
            Clause::Eq(path, value) if path == "_id" => {
                qb.push("id = ");
                qb.push_bind(id_string(value));
            }
            Clause::Eq(path, value) => {
                qb.push(format!("doc #> {} = ", jsonb_path(path)));
                qb.push_bind(value.clone());
            }
            Clause::NotEq(path, value) => {
                qb.push(format!("doc #> {} IS DISTINCT FROM ", jsonb_path(path)));
                qb.push_bind(value.clone());
            }
            Clause::IdIn(ids) => {
                qb.push("id = ANY(");
                qb.push_bind(ids.clone());
                qb.push(")");
            }
            Clause::LteI64(path, bound) => {
                qb.push(format!("(doc #>> {})::bigint <= ", jsonb_path(path)));
                qb.push_bind(*bound);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT id, doc FROM documents WHERE collection = ");
        qb.push_bind(collection);
        push_clauses(&mut qb, filter);

        if options.sort.is_empty() {
            // Deterministic paging even without an explicit sort.
            qb.push(" ORDER BY id ASC");
        } else {
            qb.push(" ORDER BY ");
            for (i, (path, order)) in options.sort.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(format!("doc #> {} ", jsonb_path(path)));
                qb.push(match order {
                    Order::Asc => "ASC NULLS FIRST",
                    Order::Desc => "DESC NULLS LAST",
                });
            }
            qb.push(", id ASC");
        }

        if let Some(limit) = options.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit as i64);
        }
        if let Some(skip) = options.skip {
            qb.push(" OFFSET ");
            qb.push_bind(skip as i64);
        }

        let rows: Vec<(String, Value)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        Ok(rows
            .into_iter()
            .map(|(id, doc)| {
                let doc = match &options.projection {
                    Some(paths) => apply_projection(&doc, paths),
                    None => doc,
                };
                Document { id, doc }
            })
            .collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let options = FindOptions::default().limit(1);
        Ok(self.find(collection, filter, &options).await?.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents WHERE collection = ");
        qb.push_bind(collection);
        push_clauses(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(count.max(0) as u64)
    }

    async fn insert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::DuplicateId(id.to_string())
                }
                _ => StoreError::Database(e),
            })?;
        Ok(())
    }

    async fn upsert_one(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(collection)
        .bind(id)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        sets: &[(&str, Value)],
    ) -> Result<u64, StoreError> {
        if sets.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE documents SET doc = ");
        for _ in sets {
            qb.push("jsonb_set(");
        }
        qb.push("doc");
        for (path, value) in sets {
            qb.push(format!(", {}, ", jsonb_path(path)));
            qb.push_bind(value.clone());
            qb.push(", true)");
        }
        qb.push(" WHERE collection = ");
        qb.push_bind(collection);
        push_clauses(&mut qb, filter);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(result.rows_affected())
    }

    async fn remove(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM documents WHERE collection = ");
        qb.push_bind(collection);
        push_clauses(&mut qb, filter);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(result.rows_affected())
    }
}
