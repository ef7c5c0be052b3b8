//! HTTP surface for items and replies.
//!
//! Mounted under `/group/{group}/{collection}`, so every handler sees
//! the namespace in its path parameters. Mutations answer a bare `OK`;
//! errors carry a JSON body with an error code and message.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::Caller;

use super::service::Namespace;
use super::types::{
    CreateItemRequest, CreateReplyRequest, ItemDetail, ItemError, ItemSummary, ListResponse,
    ReplyView, SetStickyRequest,
};

#[derive(Deserialize)]
struct NamespacePath {
    group: String,
    collection: String,
}

impl From<NamespacePath> for Namespace {
    fn from(path: NamespacePath) -> Self {
        Self {
            group: path.group,
            collection: path.collection,
        }
    }
}

#[derive(Deserialize)]
struct ItemPath {
    group: String,
    collection: String,
    item_id: String,
}

impl ItemPath {
    fn split(self) -> (Namespace, String) {
        (
            Namespace {
                group: self.group,
                collection: self.collection,
            },
            self.item_id,
        )
    }
}

#[derive(Deserialize)]
struct PagePath {
    group: String,
    collection: String,
    page: String,
}

#[derive(Deserialize)]
struct ReplyPagePath {
    group: String,
    collection: String,
    item_id: String,
    page: String,
}

#[derive(Deserialize)]
struct ReplyPath {
    group: String,
    collection: String,
    item_id: String,
    reply_id: String,
}

async fn get_item(
    State(state): State<AppState>,
    Path(path): Path<ItemPath>,
    caller: Caller,
) -> Result<Json<ItemDetail>, ItemError> {
    let (ns, item_id) = path.split();
    let detail = state.items.get_item(&ns, &item_id, &caller).await?;
    Ok(Json(detail))
}

async fn items_by_ids(
    State(state): State<AppState>,
    Path(path): Path<NamespacePath>,
    Json(ids): Json<Vec<String>>,
) -> Result<Json<Vec<ItemSummary>>, ItemError> {
    let summaries = state.items.items_by_ids(&path.into(), &ids).await?;
    Ok(Json(summaries))
}

async fn list_items(
    State(state): State<AppState>,
    Path(path): Path<PagePath>,
) -> Result<Json<ListResponse>, ItemError> {
    let ns = Namespace {
        group: path.group,
        collection: path.collection,
    };
    let listing = state.items.list_items(&ns, &path.page, false).await?;
    Ok(Json(listing))
}

async fn list_sticky_items(
    State(state): State<AppState>,
    Path(path): Path<PagePath>,
) -> Result<Json<ListResponse>, ItemError> {
    let ns = Namespace {
        group: path.group,
        collection: path.collection,
    };
    let listing = state.items.list_items(&ns, &path.page, true).await?;
    Ok(Json(listing))
}

async fn create_item(
    State(state): State<AppState>,
    Path(path): Path<NamespacePath>,
    caller: Caller,
    Json(request): Json<CreateItemRequest>,
) -> Result<&'static str, ItemError> {
    state.items.create_item(&path.into(), request, &caller).await?;
    Ok("OK")
}

async fn delete_item(
    State(state): State<AppState>,
    Path(path): Path<ItemPath>,
    caller: Caller,
) -> Result<&'static str, ItemError> {
    let (ns, item_id) = path.split();
    state.items.delete_item(&ns, &item_id, &caller).await?;
    Ok("OK")
}

async fn set_sticky(
    State(state): State<AppState>,
    Path(path): Path<ItemPath>,
    caller: Caller,
    Json(request): Json<SetStickyRequest>,
) -> Result<&'static str, ItemError> {
    let (ns, item_id) = path.split();
    state
        .items
        .set_sticky(&ns, &item_id, request.value, &caller)
        .await?;
    Ok("OK")
}

async fn replies_by_ids(
    State(state): State<AppState>,
    Path(path): Path<ItemPath>,
    caller: Caller,
    Json(ids): Json<Vec<String>>,
) -> Result<Json<Vec<ReplyView>>, ItemError> {
    let (ns, item_id) = path.split();
    let views = state
        .items
        .replies_by_ids(&ns, &item_id, &ids, &caller)
        .await?;
    Ok(Json(views))
}

async fn list_replies(
    State(state): State<AppState>,
    Path(path): Path<ReplyPagePath>,
) -> Result<Json<ListResponse>, ItemError> {
    let ns = Namespace {
        group: path.group,
        collection: path.collection,
    };
    let listing = state
        .items
        .list_replies(&ns, &path.item_id, &path.page)
        .await?;
    Ok(Json(listing))
}

async fn create_reply(
    State(state): State<AppState>,
    Path(path): Path<ItemPath>,
    caller: Caller,
    Json(request): Json<CreateReplyRequest>,
) -> Result<&'static str, ItemError> {
    let (ns, item_id) = path.split();
    state
        .items
        .create_reply(&ns, &item_id, request, &caller)
        .await?;
    Ok("OK")
}

async fn delete_reply(
    State(state): State<AppState>,
    Path(path): Path<ReplyPath>,
    caller: Caller,
) -> Result<&'static str, ItemError> {
    let ns = Namespace {
        group: path.group,
        collection: path.collection,
    };
    state
        .items
        .delete_reply(&ns, &path.item_id, &path.reply_id, &caller)
        .await?;
    Ok("OK")
}

/// Item routes, to be nested under `/group/{group}/{collection}`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(items_by_ids).put(create_item))
        .route("/list/{page}", get(list_items))
        .route("/sticky/{page}", get(list_sticky_items))
        .route("/{item_id}", get(get_item).delete(delete_item))
        .route("/{item_id}/sticky", put(set_sticky))
        .route("/{item_id}/replys", post(replies_by_ids).put(create_reply))
        .route("/{item_id}/replys/list/{page}", get(list_replies))
        .route("/{item_id}/replys/{reply_id}", delete(delete_reply))
}
