//! Item access orchestration.
//!
//! Composes the permission evaluator, the authorization gate, and the
//! pagination planner over the item and reply collections of one
//! `(group, collection)` namespace, keeping the listing counters in
//! lockstep with writes.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use qb_common::{ItemId, UserProfile, UserStatus};

use crate::auth::Caller;
use crate::db::{DocumentStore, Filter, FindOptions, Order, StoreError};
use crate::moderation::ModerationState;
use crate::pagination::{coerce_page, page_count, plan, plan_normal};
use crate::permissions::{authorize, evaluate, AdminSet};

use super::counters::CounterCache;
use super::escape::{escape_lt, map_strings};
use super::types::{
    CreateItemRequest, CreateReplyRequest, ItemDetail, ItemError, ItemRecord, ItemSummary,
    ListResponse, ReplyRecord, ReplyView, SummaryAuthor,
};

/// The `(group, collection)` pair every item route is scoped by.
#[derive(Debug, Clone, Deserialize)]
pub struct Namespace {
    pub group: String,
    pub collection: String,
}

impl Namespace {
    /// Collection holding the namespace's items.
    #[must_use]
    pub fn item_collection(&self) -> String {
        format!("{}-{}", self.group, self.collection)
    }

    /// Collection holding the namespace's replies ("questions" items
    /// keep their replies in "question-replys").
    #[must_use]
    pub fn reply_collection(&self) -> String {
        format!(
            "{}-{}-replys",
            self.group,
            self.collection.trim_end_matches('s')
        )
    }
}

const ITEM_DETAIL_FIELDS: &[&str] = &[
    "title",
    "content",
    "date",
    "user.name",
    "user.photo",
    "user.id",
    "sticky",
];
const ITEM_SUMMARY_FIELDS: &[&str] = &["title", "user.name", "date", "sticky"];
const REPLY_FIELDS: &[&str] = &["answer", "image", "date", "user.name", "user.photo", "user.id"];

/// Projected shape behind [`ItemSummary`].
#[derive(Deserialize)]
struct SummaryRecord {
    title: String,
    date: i64,
    user: SummaryAuthor,
    #[serde(default)]
    sticky: bool,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_all(raw_ids: &[String]) -> Result<Vec<String>, ItemError> {
    raw_ids
        .iter()
        .map(|raw| ItemId::parse(raw).map(String::from).map_err(ItemError::from))
        .collect()
}

/// Orchestrator for item and reply access.
#[derive(Clone)]
pub struct ItemAccessService {
    store: Arc<dyn DocumentStore>,
    admins: Arc<AdminSet>,
    moderation: ModerationState,
    counters: Arc<CounterCache>,
    page_length: u64,
}

impl ItemAccessService {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        admins: Arc<AdminSet>,
        moderation: ModerationState,
        page_length: u64,
    ) -> Self {
        Self {
            store,
            admins,
            moderation,
            counters: Arc::new(CounterCache::new()),
            page_length,
        }
    }

    /// Classify the caller and reject anything but `ok`. Returns the
    /// caller identity, which `ok` guarantees exists.
    async fn ensure_unrestricted(&self, caller: &Caller) -> Result<String, ItemError> {
        match self.moderation.classify(caller.identity()).await? {
            UserStatus::Ok => caller
                .identity()
                .map(ToString::to_string)
                .ok_or(ItemError::Denied(UserStatus::Error)),
            denied => Err(ItemError::Denied(denied)),
        }
    }

    fn is_admin(&self, caller: &Caller) -> bool {
        caller
            .identity()
            .is_some_and(|identity| self.admins.contains(identity))
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Fetch one item with its permission view applied.
    pub async fn get_item(
        &self,
        ns: &Namespace,
        raw_id: &str,
        caller: &Caller,
    ) -> Result<ItemDetail, ItemError> {
        let id = ItemId::parse(raw_id)?;
        let options = FindOptions::default()
            .projection(ITEM_DETAIL_FIELDS)
            .limit(1);
        let document = self
            .store
            .find(&ns.item_collection(), &Filter::by_id(id.as_str()), &options)
            .await?
            .into_iter()
            .next()
            .ok_or(ItemError::NotFound)?;

        let record: ItemRecord =
            serde_json::from_value(document.doc).map_err(StoreError::Decode)?;
        let permission = evaluate(caller.identity(), &record.user.id, &self.admins);

        Ok(ItemDetail {
            title: record.title,
            content: record.content,
            date: record.date,
            user: record.user.into(),
            permission,
            sticky: record.sticky,
        })
    }

    /// Bulk summary fetch, sticky items first.
    pub async fn items_by_ids(
        &self,
        ns: &Namespace,
        raw_ids: &[String],
    ) -> Result<Vec<ItemSummary>, ItemError> {
        let ids = parse_all(raw_ids)?;
        let options = FindOptions::default()
            .projection(ITEM_SUMMARY_FIELDS)
            .sort("sticky", Order::Desc)
            .sort("date", Order::Desc);
        let documents = self
            .store
            .find(&ns.item_collection(), &Filter::by_ids(ids), &options)
            .await?;

        documents
            .into_iter()
            .map(|document| {
                let record: SummaryRecord =
                    serde_json::from_value(document.doc).map_err(StoreError::Decode)?;
                Ok(ItemSummary {
                    id: document.id,
                    title: record.title,
                    date: record.date,
                    user: record.user,
                    sticky: record.sticky,
                })
            })
            .collect()
    }

    /// One page of item ids from either partition.
    pub async fn list_items(
        &self,
        ns: &Namespace,
        raw_page: &str,
        sticky: bool,
    ) -> Result<ListResponse, ItemError> {
        let page = coerce_page(raw_page);
        let collection = ns.item_collection();
        let counters = self
            .counters
            .get_or_count(self.store.as_ref(), &collection)
            .await?;

        if sticky {
            let window = plan(page, self.page_length);
            let options = FindOptions::default()
                .sort("sticky", Order::Desc)
                .sort("date", Order::Desc)
                .skip(window.skip)
                .limit(window.limit);
            let documents = self
                .store
                .find(&collection, &Filter::all().eq("sticky", json!(true)), &options)
                .await?;
            return Ok(ListResponse {
                ids: documents.into_iter().map(|d| d.id).collect(),
                number_of_pages: page_count(counters.sticky(), self.page_length),
            });
        }

        // The normal partition pretends sticky items occupy the first
        // combined positions without re-querying them here.
        let number_of_pages = page_count(counters.total(), self.page_length);
        let Some(window) = plan_normal(page, self.page_length, counters.sticky()) else {
            return Ok(ListResponse {
                ids: Vec::new(),
                number_of_pages,
            });
        };

        let options = FindOptions::default()
            .sort("date", Order::Desc)
            .skip(window.skip)
            .limit(window.limit);
        let documents = self
            .store
            .find(
                &collection,
                &Filter::all().not_eq("sticky", json!(true)),
                &options,
            )
            .await?;

        Ok(ListResponse {
            ids: documents.into_iter().map(|d| d.id).collect(),
            number_of_pages,
        })
    }

    /// Persist a new item. Content strings are escaped; ownership is
    /// pinned to the caller identity, not whatever the body claims.
    pub async fn create_item(
        &self,
        ns: &Namespace,
        request: CreateItemRequest,
        caller: &Caller,
    ) -> Result<(), ItemError> {
        let identity = self.ensure_unrestricted(caller).await?;

        let mut content = request.content;
        map_strings(&mut content, &escape_lt);
        let record = ItemRecord {
            title: escape_lt(&request.title),
            content,
            date: now_ms(),
            user: UserProfile {
                id: identity,
                name: request.user.name,
                photo: request.user.photo,
            },
            sticky: false,
        };

        let collection = ns.item_collection();
        // Counter handle taken before the write: a cold-cache recount
        // must not already include the document the delta accounts for.
        let counters = self
            .counters
            .get_or_count(self.store.as_ref(), &collection)
            .await?;
        self.store
            .insert_one(
                &collection,
                &crate::db::new_object_id(),
                serde_json::to_value(&record).map_err(StoreError::Decode)?,
            )
            .await?;
        counters.add_total(1);
        Ok(())
    }

    /// Delete an item through the authorization gate. Only when exactly
    /// one document went away does the reply cascade run and do the
    /// counters move.
    pub async fn delete_item(
        &self,
        ns: &Namespace,
        raw_id: &str,
        caller: &Caller,
    ) -> Result<(), ItemError> {
        let id = ItemId::parse(raw_id)?;
        self.ensure_unrestricted(caller).await?;

        let collection = ns.item_collection();
        let reply_collection = ns.reply_collection();
        let filter = authorize(
            caller.identity(),
            &self.admins,
            Filter::by_id(id.as_str()),
        );

        // Counter handles taken before the writes: a cold-cache recount
        // must not already exclude the documents the deltas account for.
        let counters = self
            .counters
            .get_or_count(self.store.as_ref(), &collection)
            .await?;
        let reply_counters = self
            .counters
            .get_or_count(self.store.as_ref(), &reply_collection)
            .await?;

        // Sticky flag read up front so the sticky counter can follow
        // the delete; counters are best-effort, the race is tolerable.
        let was_sticky = self
            .store
            .find_one(&collection, &filter)
            .await?
            .and_then(|d| d.doc.get("sticky").and_then(Value::as_bool))
            .unwrap_or(false);

        let removed = self.store.remove(&collection, &filter).await?;
        if removed != 1 {
            return Ok(());
        }

        let replies_removed = self
            .store
            .remove(
                &reply_collection,
                &Filter::all().eq("itemId", json!(id.as_str())),
            )
            .await?;

        counters.add_total(-1);
        if was_sticky {
            counters.add_sticky(-1);
        }
        reply_counters.add_total(-(replies_removed as i64));
        Ok(())
    }

    /// Admin-only sticky toggle with *set* semantics: the flag becomes
    /// `value`, and the sticky counter moves only on an actual change.
    pub async fn set_sticky(
        &self,
        ns: &Namespace,
        raw_id: &str,
        value: bool,
        caller: &Caller,
    ) -> Result<(), ItemError> {
        if !self.is_admin(caller) {
            return Err(ItemError::NotAuthorized);
        }
        let id = ItemId::parse(raw_id)?;

        let collection = ns.item_collection();
        // Counter handle taken before the write: a cold-cache recount
        // must not already include the flag flip the delta accounts for.
        let counters = self
            .counters
            .get_or_count(self.store.as_ref(), &collection)
            .await?;
        let current = self
            .store
            .find_one(&collection, &Filter::by_id(id.as_str()))
            .await?
            .ok_or(ItemError::NotFound)?;
        let current_sticky = current
            .doc
            .get("sticky")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if current_sticky == value {
            return Ok(());
        }

        let affected = self
            .store
            .update(
                &collection,
                &Filter::by_id(id.as_str()),
                &[("sticky", json!(value))],
            )
            .await?;
        if affected == 1 {
            counters.add_sticky(if value { 1 } else { -1 });
        } else {
            // The item vanished between the read and the update; drop
            // the cached counts and recount on next access.
            self.counters.invalidate(&collection);
        }
        Ok(())
    }

    // ========================================================================
    // Replies
    // ========================================================================

    /// Bulk reply fetch with permission views applied.
    pub async fn replies_by_ids(
        &self,
        ns: &Namespace,
        raw_item_id: &str,
        raw_ids: &[String],
        caller: &Caller,
    ) -> Result<Vec<ReplyView>, ItemError> {
        let item = ItemId::parse(raw_item_id)?;
        let ids = parse_all(raw_ids)?;

        let filter = Filter::by_ids(ids).eq("itemId", json!(item.as_str()));
        let options = FindOptions::default().projection(REPLY_FIELDS);
        let documents = self
            .store
            .find(&ns.reply_collection(), &filter, &options)
            .await?;

        documents
            .into_iter()
            .map(|document| {
                let record: ReplyRecord =
                    serde_json::from_value(document.doc).map_err(StoreError::Decode)?;
                let permission = evaluate(caller.identity(), &record.user.id, &self.admins);
                Ok(ReplyView {
                    id: document.id,
                    answer: record.answer,
                    image: record.image,
                    date: record.date,
                    user: record.user.into(),
                    permission,
                })
            })
            .collect()
    }

    /// One page of reply ids for an item, oldest first.
    ///
    /// The page count comes from a per-item count rather than the
    /// global reply counter, so items with different reply volumes
    /// paginate correctly.
    pub async fn list_replies(
        &self,
        ns: &Namespace,
        raw_item_id: &str,
        raw_page: &str,
    ) -> Result<ListResponse, ItemError> {
        let item = ItemId::parse(raw_item_id)?;
        let page = coerce_page(raw_page);

        let filter = Filter::all().eq("itemId", json!(item.as_str()));
        let total = self.store.count(&ns.reply_collection(), &filter).await?;

        let window = plan(page, self.page_length);
        let options = FindOptions::default()
            .sort("date", Order::Asc)
            .skip(window.skip)
            .limit(window.limit);
        let documents = self
            .store
            .find(&ns.reply_collection(), &filter, &options)
            .await?;

        Ok(ListResponse {
            ids: documents.into_iter().map(|d| d.id).collect(),
            number_of_pages: page_count(total, self.page_length),
        })
    }

    /// Persist a new reply under an item.
    pub async fn create_reply(
        &self,
        ns: &Namespace,
        raw_item_id: &str,
        request: CreateReplyRequest,
        caller: &Caller,
    ) -> Result<(), ItemError> {
        let item = ItemId::parse(raw_item_id)?;
        let identity = self.ensure_unrestricted(caller).await?;

        let record = ReplyRecord {
            answer: escape_lt(&request.answer),
            image: request.image,
            date: now_ms(),
            user: UserProfile {
                id: identity,
                name: request.user.name,
                photo: request.user.photo,
            },
        };
        let mut doc = serde_json::to_value(&record).map_err(StoreError::Decode)?;
        doc["itemId"] = json!(item.as_str());

        let collection = ns.reply_collection();
        let counters = self
            .counters
            .get_or_count(self.store.as_ref(), &collection)
            .await?;
        self.store
            .insert_one(&collection, &crate::db::new_object_id(), doc)
            .await?;
        counters.add_total(1);
        Ok(())
    }

    /// Delete a reply through the authorization gate, scoped to its
    /// parent item.
    pub async fn delete_reply(
        &self,
        ns: &Namespace,
        raw_item_id: &str,
        raw_reply_id: &str,
        caller: &Caller,
    ) -> Result<(), ItemError> {
        let item = ItemId::parse(raw_item_id)?;
        let id = ItemId::parse(raw_reply_id)?;
        self.ensure_unrestricted(caller).await?;

        let filter = authorize(
            caller.identity(),
            &self.admins,
            Filter::by_id(id.as_str()).eq("itemId", json!(item.as_str())),
        );
        let collection = ns.reply_collection();
        let counters = self
            .counters
            .get_or_count(self.store.as_ref(), &collection)
            .await?;
        let removed = self.store.remove(&collection, &filter).await?;
        if removed == 1 {
            counters.add_total(-1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use qb_common::Permission;

    const PAGE: u64 = 2;

    fn ns() -> Namespace {
        Namespace {
            group: "g".to_string(),
            collection: "questions".to_string(),
        }
    }

    fn caller(identity: &str) -> Caller {
        Caller::new(Some(identity.to_string()))
    }

    fn anonymous() -> Caller {
        Caller::new(None)
    }

    fn id(n: u8) -> String {
        format!("{n:02x}").repeat(12)
    }

    fn service_with(admin: Option<&str>) -> (ItemAccessService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let admins = Arc::new(AdminSet::default());
        if let Some(identity) = admin {
            admins.replace([identity.to_string()]);
        }
        let moderation = ModerationState::new(store.clone());
        let service = ItemAccessService::new(store.clone(), admins, moderation, PAGE);
        (service, store)
    }

    async fn seed_item(store: &MemoryStore, item: &str, owner: &str, date: i64, sticky: bool) {
        store
            .insert_one(
                "g-questions",
                item,
                json!({ "title": "t", "content": {}, "date": date, "sticky": sticky,
                        "user": { "id": owner, "name": "Ada", "photo": null } }),
            )
            .await
            .unwrap();
    }

    async fn seed_reply(store: &MemoryStore, reply: &str, item: &str, owner: &str, date: i64) {
        store
            .insert_one(
                "g-question-replys",
                reply,
                json!({ "answer": "a", "date": date, "itemId": item,
                        "user": { "id": owner, "name": "Ada", "photo": null } }),
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_reply_collection_is_singularized() {
        assert_eq!(ns().item_collection(), "g-questions");
        assert_eq!(ns().reply_collection(), "g-question-replys");
    }

    #[tokio::test]
    async fn test_create_escapes_and_pins_ownership() {
        let (service, store) = service_with(None);
        let request = CreateItemRequest {
            title: "<script>".to_string(),
            content: json!({ "body": "1 < 2", "tags": ["<i>"] }),
            user: UserProfile {
                id: "forged".to_string(),
                name: "Ada".to_string(),
                photo: None,
            },
        };
        service.create_item(&ns(), request, &caller("u1")).await.unwrap();

        let docs = store
            .find("g-questions", &Filter::all(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0].doc;
        assert_eq!(doc["title"], "&lt;script>");
        assert_eq!(doc["content"]["body"], "1 &lt; 2");
        assert_eq!(doc["content"]["tags"][0], "&lt;i>");
        assert_eq!(doc["user"]["id"], "u1");
        assert_eq!(doc["sticky"], false);
    }

    #[tokio::test]
    async fn test_anonymous_create_is_denied() {
        let (service, _) = service_with(None);
        let request = CreateItemRequest {
            title: "t".to_string(),
            content: json!({}),
            user: UserProfile {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                photo: None,
            },
        };
        let result = service.create_item(&ns(), request, &anonymous()).await;
        assert!(matches!(
            result,
            Err(ItemError::Denied(UserStatus::Error))
        ));
    }

    #[tokio::test]
    async fn test_banned_caller_cannot_delete() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 10, false).await;
        store
            .upsert_one(
                crate::db::USERS_COLLECTION,
                "u1",
                json!({ "permission": "banned",
                        "user": { "id": "u1", "name": "Ada", "photo": null } }),
            )
            .await
            .unwrap();

        let result = service.delete_item(&ns(), &id(1), &caller("u1")).await;
        assert!(matches!(
            result,
            Err(ItemError::Denied(UserStatus::Banned))
        ));
        assert_eq!(
            store.count("g-questions", &Filter::all()).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_get_item_permission_views() {
        let (service, store) = service_with(Some("root"));
        seed_item(&store, &id(1), "u1", 10, false).await;

        let detail = service.get_item(&ns(), &id(1), &caller("u1")).await.unwrap();
        assert_eq!(detail.permission, Permission::You);

        let detail = service.get_item(&ns(), &id(1), &caller("root")).await.unwrap();
        assert_eq!(detail.permission, Permission::Admin);

        let detail = service.get_item(&ns(), &id(1), &anonymous()).await.unwrap();
        assert_eq!(detail.permission, Permission::None);
    }

    #[tokio::test]
    async fn test_get_item_rejects_bad_id_and_missing() {
        let (service, _) = service_with(None);
        assert!(matches!(
            service.get_item(&ns(), "nope", &anonymous()).await,
            Err(ItemError::InvalidId(_))
        ));
        assert!(matches!(
            service.get_item(&ns(), &id(9), &anonymous()).await,
            Err(ItemError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_leaves_item_untouched() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 10, false).await;

        service.delete_item(&ns(), &id(1), &caller("u2")).await.unwrap();
        assert_eq!(
            store.count("g-questions", &Filter::all()).await.unwrap(),
            1
        );

        let listing = service.list_items(&ns(), "1", false).await.unwrap();
        assert_eq!(listing.number_of_pages, 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_replies_and_counters() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 10, false).await;
        seed_item(&store, &id(2), "u2", 20, false).await;
        for n in 3..6 {
            seed_reply(&store, &id(n), &id(1), "u2", i64::from(n)).await;
        }
        seed_reply(&store, &id(6), &id(2), "u2", 6).await;

        // Prime the counters so the delete adjusts live values.
        assert_eq!(
            service.list_items(&ns(), "1", false).await.unwrap().number_of_pages,
            1
        );

        service.delete_item(&ns(), &id(1), &caller("u1")).await.unwrap();

        assert_eq!(
            store.count("g-questions", &Filter::all()).await.unwrap(),
            1
        );
        // Only the sibling item's reply survives the cascade.
        let remaining = store
            .find("g-question-replys", &Filter::all(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, id(6));

        let listing = service.list_items(&ns(), "1", false).await.unwrap();
        assert_eq!(listing.ids, vec![id(2)]);
        assert_eq!(listing.number_of_pages, 1);
    }

    #[tokio::test]
    async fn test_admin_deletes_others_items() {
        let (service, store) = service_with(Some("root"));
        seed_item(&store, &id(1), "u1", 10, false).await;

        service.delete_item(&ns(), &id(1), &caller("root")).await.unwrap();
        assert_eq!(
            store.count("g-questions", &Filter::all()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_set_sticky_requires_admin() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 10, false).await;

        let result = service.set_sticky(&ns(), &id(1), true, &caller("u1")).await;
        assert!(matches!(result, Err(ItemError::NotAuthorized)));
    }

    #[tokio::test]
    async fn test_set_sticky_moves_counter_once() {
        let (service, store) = service_with(Some("root"));
        seed_item(&store, &id(1), "u1", 10, false).await;
        seed_item(&store, &id(2), "u1", 20, false).await;

        service.set_sticky(&ns(), &id(1), true, &caller("root")).await.unwrap();
        // Setting the same value again must not double-count.
        service.set_sticky(&ns(), &id(1), true, &caller("root")).await.unwrap();

        let sticky = service.list_items(&ns(), "1", true).await.unwrap();
        assert_eq!(sticky.ids, vec![id(1)]);
        assert_eq!(sticky.number_of_pages, 1);

        service.set_sticky(&ns(), &id(1), false, &caller("root")).await.unwrap();
        let sticky = service.list_items(&ns(), "1", true).await.unwrap();
        assert!(sticky.ids.is_empty());
        assert_eq!(sticky.number_of_pages, 0);
    }

    #[tokio::test]
    async fn test_cold_counters_see_creates_once() {
        // Nothing has touched the counter cache before the writes; the
        // first create both initializes it and adjusts it.
        let (service, _store) = service_with(None);
        for title in ["one", "two"] {
            let request = CreateItemRequest {
                title: title.to_string(),
                content: json!({}),
                user: UserProfile {
                    id: "u1".to_string(),
                    name: "Ada".to_string(),
                    photo: None,
                },
            };
            service.create_item(&ns(), request, &caller("u1")).await.unwrap();
        }

        // Two items at two per page is exactly one page.
        let listing = service.list_items(&ns(), "1", false).await.unwrap();
        assert_eq!(listing.ids.len(), 2);
        assert_eq!(listing.number_of_pages, 1);
    }

    #[tokio::test]
    async fn test_cold_counters_see_pin_once() {
        let (service, store) = service_with(Some("root"));
        seed_item(&store, &id(1), "u1", 10, false).await;
        seed_item(&store, &id(2), "u1", 20, false).await;

        // First cache access happens inside the toggle itself.
        service.set_sticky(&ns(), &id(1), true, &caller("root")).await.unwrap();

        let sticky = service.list_items(&ns(), "1", true).await.unwrap();
        assert_eq!(sticky.ids, vec![id(1)]);
        assert_eq!(sticky.number_of_pages, 1);

        // One sticky slot leaves room for the normal item on page 1.
        let normal = service.list_items(&ns(), "1", false).await.unwrap();
        assert_eq!(normal.ids, vec![id(2)]);
        assert_eq!(normal.number_of_pages, 1);
    }

    #[tokio::test]
    async fn test_cold_counters_see_delete_once() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 10, false).await;
        seed_item(&store, &id(2), "u1", 20, false).await;
        seed_item(&store, &id(3), "u1", 30, false).await;

        // First cache access happens inside the delete itself.
        service.delete_item(&ns(), &id(1), &caller("u1")).await.unwrap();

        let listing = service.list_items(&ns(), "1", false).await.unwrap();
        assert_eq!(listing.ids, vec![id(3), id(2)]);
        assert_eq!(listing.number_of_pages, 1);
    }

    #[tokio::test]
    async fn test_set_sticky_missing_item_is_not_found() {
        let (service, _) = service_with(Some("root"));
        let result = service.set_sticky(&ns(), &id(9), true, &caller("root")).await;
        assert!(matches!(result, Err(ItemError::NotFound)));
    }

    #[tokio::test]
    async fn test_normal_listing_offsets_for_sticky_slots() {
        // Three sticky and three normal items, two per page. Combined
        // ordering: page 1 holds two sticky, page 2 holds the last
        // sticky plus the newest normal, page 3 the remaining two.
        let (service, store) = service_with(None);
        for n in 1..4 {
            seed_item(&store, &id(n), "u1", i64::from(n), true).await;
        }
        for n in 4..7 {
            seed_item(&store, &id(n), "u1", i64::from(n), false).await;
        }

        let page1 = service.list_items(&ns(), "1", false).await.unwrap();
        assert!(page1.ids.is_empty());
        assert_eq!(page1.number_of_pages, 3);

        let page2 = service.list_items(&ns(), "2", false).await.unwrap();
        assert_eq!(page2.ids, vec![id(6)]);

        let page3 = service.list_items(&ns(), "3", false).await.unwrap();
        assert_eq!(page3.ids, vec![id(5), id(4)]);

        let page4 = service.list_items(&ns(), "4", false).await.unwrap();
        assert!(page4.ids.is_empty());
    }

    #[tokio::test]
    async fn test_sticky_listing_is_its_own_partition() {
        let (service, store) = service_with(None);
        for n in 1..4 {
            seed_item(&store, &id(n), "u1", i64::from(n), true).await;
        }
        seed_item(&store, &id(4), "u1", 99, false).await;

        let page1 = service.list_items(&ns(), "1", true).await.unwrap();
        assert_eq!(page1.ids, vec![id(3), id(2)]);
        assert_eq!(page1.number_of_pages, 2);

        let page2 = service.list_items(&ns(), "2", true).await.unwrap();
        assert_eq!(page2.ids, vec![id(1)]);
    }

    #[tokio::test]
    async fn test_non_numeric_page_coerces_to_first() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 10, false).await;

        let listing = service.list_items(&ns(), "garbage", false).await.unwrap();
        assert_eq!(listing.ids, vec![id(1)]);
    }

    #[tokio::test]
    async fn test_items_by_ids_sorts_sticky_first() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 30, false).await;
        seed_item(&store, &id(2), "u1", 10, true).await;
        seed_item(&store, &id(3), "u1", 20, false).await;

        let summaries = service
            .items_by_ids(&ns(), &[id(1), id(2), id(3)])
            .await
            .unwrap();
        let order: Vec<String> = summaries.iter().map(|s| s.id.clone()).collect();
        assert_eq!(order, vec![id(2), id(1), id(3)]);
        assert!(summaries[0].sticky);
    }

    #[tokio::test]
    async fn test_reply_pages_count_per_item() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 1, false).await;
        seed_item(&store, &id(2), "u1", 2, false).await;
        for n in 3..8 {
            seed_reply(&store, &id(n), &id(1), "u2", i64::from(n)).await;
        }
        seed_reply(&store, &id(8), &id(2), "u2", 8).await;

        // Five replies at two per page, oldest first.
        let busy = service.list_replies(&ns(), &id(1), "1").await.unwrap();
        assert_eq!(busy.ids, vec![id(3), id(4)]);
        assert_eq!(busy.number_of_pages, 3);

        // The sibling item's count is its own, not the global total.
        let quiet = service.list_replies(&ns(), &id(2), "1").await.unwrap();
        assert_eq!(quiet.ids, vec![id(8)]);
        assert_eq!(quiet.number_of_pages, 1);
    }

    #[tokio::test]
    async fn test_replies_by_ids_scoped_to_item() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 1, false).await;
        seed_reply(&store, &id(3), &id(1), "u2", 3).await;
        seed_reply(&store, &id(4), &id(2), "u2", 4).await;

        let views = service
            .replies_by_ids(&ns(), &id(1), &[id(3), id(4)], &caller("u2"))
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, id(3));
        assert_eq!(views[0].permission, Permission::You);
    }

    #[tokio::test]
    async fn test_create_and_delete_reply() {
        let (service, store) = service_with(None);
        seed_item(&store, &id(1), "u1", 1, false).await;

        let request = CreateReplyRequest {
            answer: "1 < 2".to_string(),
            image: None,
            user: UserProfile {
                id: "ignored".to_string(),
                name: "Bea".to_string(),
                photo: None,
            },
        };
        service
            .create_reply(&ns(), &id(1), request, &caller("u2"))
            .await
            .unwrap();

        let replies = store
            .find("g-question-replys", &Filter::all(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].doc["answer"], "1 &lt; 2");
        assert_eq!(replies[0].doc["user"]["id"], "u2");
        assert_eq!(replies[0].doc["itemId"], id(1));

        let reply_id = replies[0].id.clone();

        // A stranger's delete is a silent no-op.
        service
            .delete_reply(&ns(), &id(1), &reply_id, &caller("u3"))
            .await
            .unwrap();
        assert_eq!(
            store.count("g-question-replys", &Filter::all()).await.unwrap(),
            1
        );

        service
            .delete_reply(&ns(), &id(1), &reply_id, &caller("u2"))
            .await
            .unwrap();
        assert_eq!(
            store.count("g-question-replys", &Filter::all()).await.unwrap(),
            0
        );
    }
}
