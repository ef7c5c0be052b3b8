//! Moderation state machine.
//!
//! Classification is recomputed from the store on every call; nothing
//! is cached per request. Kicks expire lazily: a kicked record whose
//! release time has elapsed classifies as `ok` even before the sweep
//! removes it, so correctness never depends on the background task.

use std::sync::Arc;

use serde_json::{json, Value};

use qb_common::{ItemId, UserProfile, UserStatus};

use crate::db::{DocumentStore, Filter, StoreError, USERS_COLLECTION};

use super::types::{ModerationError, ModerationRecord, RecordStatus, ResourceLocator};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Tracks which identities are currently banned or kicked.
///
/// Carries no notion of the caller's own privilege; admin gating
/// happens in the handlers.
#[derive(Clone)]
pub struct ModerationState {
    store: Arc<dyn DocumentStore>,
}

impl ModerationState {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Classify a caller.
    ///
    /// No identity is `error`; banned wins over kicked; an elapsed kick
    /// is already `ok`.
    pub async fn classify(&self, identity: Option<&str>) -> Result<UserStatus, StoreError> {
        let Some(identity) = identity else {
            return Ok(UserStatus::Error);
        };

        let Some(record) = self
            .store
            .find_one(USERS_COLLECTION, &Filter::by_id(identity))
            .await?
        else {
            return Ok(UserStatus::Ok);
        };
        let record: ModerationRecord = serde_json::from_value(record.doc)?;

        Ok(match record.permission {
            RecordStatus::Banned => UserStatus::Banned,
            RecordStatus::Kicked if record.release_time.is_some_and(|t| t > now_ms()) => {
                UserStatus::Kicked
            }
            RecordStatus::Kicked | RecordStatus::Admin => UserStatus::Ok,
        })
    }

    /// All moderation records, with the identity merged in as `_id`.
    pub async fn records(&self) -> Result<Vec<Value>, StoreError> {
        let documents = self
            .store
            .find(USERS_COLLECTION, &Filter::all(), &Default::default())
            .await?;
        Ok(documents
            .into_iter()
            .map(|mut document| {
                if let Value::Object(map) = &mut document.doc {
                    map.insert("_id".to_string(), Value::String(document.id.clone()));
                }
                document.doc
            })
            .collect())
    }

    /// Resolve the owner of the resource a locator points at.
    async fn resolve_owner(
        &self,
        locator: &ResourceLocator,
        item_id: &ItemId,
    ) -> Result<UserProfile, ModerationError> {
        let document = self
            .store
            .find_one(&locator.collection_name(), &Filter::by_id(item_id.as_str()))
            .await?
            .ok_or(ModerationError::NotFound)?;
        let owner = document
            .doc
            .get("user")
            .cloned()
            .ok_or(ModerationError::NotFound)?;
        Ok(serde_json::from_value(owner).map_err(StoreError::Decode)?)
    }

    /// Kick the owner of a resource for `duration_ms`.
    ///
    /// Upserts keyed by identity, so re-kicking supersedes any existing
    /// record instead of duplicating it.
    #[tracing::instrument(skip(self))]
    pub async fn kick(
        &self,
        locator: &ResourceLocator,
        item_id: &ItemId,
        duration_ms: i64,
    ) -> Result<(), ModerationError> {
        let user = self.resolve_owner(locator, item_id).await?;
        let record = ModerationRecord {
            permission: RecordStatus::Kicked,
            release_time: Some(now_ms() + duration_ms),
            user,
        };
        let identity = record.user.id.clone();
        self.store
            .upsert_one(
                USERS_COLLECTION,
                &identity,
                serde_json::to_value(&record).map_err(StoreError::Decode)?,
            )
            .await?;
        Ok(())
    }

    /// Ban the owner of a resource, with no expiry.
    #[tracing::instrument(skip(self))]
    pub async fn ban(
        &self,
        locator: &ResourceLocator,
        item_id: &ItemId,
    ) -> Result<(), ModerationError> {
        let user = self.resolve_owner(locator, item_id).await?;
        let record = ModerationRecord {
            permission: RecordStatus::Banned,
            release_time: None,
            user,
        };
        let identity = record.user.id.clone();
        self.store
            .upsert_one(
                USERS_COLLECTION,
                &identity,
                serde_json::to_value(&record).map_err(StoreError::Decode)?,
            )
            .await?;
        Ok(())
    }

    /// Remove a banned record. Returns whether one existed.
    #[tracing::instrument(skip(self))]
    pub async fn unban(&self, identity: &str) -> Result<bool, StoreError> {
        let removed = self
            .store
            .remove(
                USERS_COLLECTION,
                &Filter::by_id(identity).eq("permission", json!("banned")),
            )
            .await?;
        Ok(removed == 1)
    }

    /// Remove any moderation record. Returns whether one existed.
    #[tracing::instrument(skip(self))]
    pub async fn remove_record(&self, identity: &str) -> Result<bool, StoreError> {
        let removed = self
            .store
            .remove(USERS_COLLECTION, &Filter::by_id(identity))
            .await?;
        Ok(removed == 1)
    }

    /// Rewrite an existing kick's release time without re-resolving the
    /// owner. Returns whether a kicked record existed.
    #[tracing::instrument(skip(self))]
    pub async fn update_kick(
        &self,
        identity: &str,
        new_duration_ms: i64,
    ) -> Result<bool, StoreError> {
        let affected = self
            .store
            .update(
                USERS_COLLECTION,
                &Filter::by_id(identity).eq("permission", json!("kicked")),
                &[("releaseTime", json!(now_ms() + new_duration_ms))],
            )
            .await?;
        Ok(affected == 1)
    }

    /// Purge kicked records whose release time has elapsed. Storage
    /// hygiene only; classification does not depend on it.
    pub async fn sweep_expired(&self) -> Result<u64, StoreError> {
        self.store
            .remove(
                USERS_COLLECTION,
                &Filter::all()
                    .eq("permission", json!("kicked"))
                    .lte("releaseTime", now_ms()),
            )
            .await
    }
}
