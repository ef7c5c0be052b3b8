//! Refreshable cache of admin identities.
//!
//! Admin grants live in the users collection as records with
//! `permission: "admin"`. The set is loaded at startup and reloaded
//! after every moderation mutation, so membership changes take effect
//! without a restart. Reads are lock-cheap; a reload swaps the whole
//! set at once.

use std::collections::HashSet;
use std::sync::RwLock;

use serde_json::json;
use tracing::info;

use crate::db::{DocumentStore, Filter, FindOptions, StoreError, USERS_COLLECTION};

/// The set of identities with elevated privilege.
#[derive(Default)]
pub struct AdminSet {
    inner: RwLock<HashSet<String>>,
}

impl AdminSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the identity currently holds elevated privilege.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.inner
            .read()
            .is_ok_and(|set| set.contains(identity))
    }

    /// Replace the whole set. Used by [`reload`](Self::reload) and by
    /// tests that need a known membership.
    pub fn replace<I>(&self, identities: I)
    where
        I: IntoIterator<Item = String>,
    {
        let fresh: HashSet<String> = identities.into_iter().collect();
        if let Ok(mut set) = self.inner.write() {
            *set = fresh;
        }
    }

    /// Reload admin membership from the store, returning the new size.
    pub async fn reload(&self, store: &dyn DocumentStore) -> Result<usize, StoreError> {
        let records = store
            .find(
                USERS_COLLECTION,
                &Filter::all().eq("permission", json!("admin")),
                &FindOptions::default(),
            )
            .await?;
        let count = records.len();
        self.replace(records.into_iter().map(|record| record.id));
        info!(admins = count, "Admin set reloaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_empty_set_contains_nobody() {
        let admins = AdminSet::new();
        assert!(!admins.contains("anyone"));
    }

    #[test]
    fn test_replace_swaps_membership() {
        let admins = AdminSet::new();
        admins.replace(["root".to_string()]);
        assert!(admins.contains("root"));

        admins.replace(["other".to_string()]);
        assert!(!admins.contains("root"));
        assert!(admins.contains("other"));
    }

    #[tokio::test]
    async fn test_reload_picks_up_admin_records() {
        let store = MemoryStore::new();
        store
            .upsert_one(
                USERS_COLLECTION,
                "root",
                json!({ "permission": "admin", "user": { "id": "root", "name": "r", "photo": null } }),
            )
            .await
            .unwrap();
        store
            .upsert_one(
                USERS_COLLECTION,
                "troll",
                json!({ "permission": "banned", "user": { "id": "troll", "name": "t", "photo": null } }),
            )
            .await
            .unwrap();

        let admins = AdminSet::new();
        assert_eq!(admins.reload(&store).await.unwrap(), 1);
        assert!(admins.contains("root"));
        assert!(!admins.contains("troll"));
    }
}
