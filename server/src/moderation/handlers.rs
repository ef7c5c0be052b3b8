//! Admin-gated moderation endpoints.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::Value;

use qb_common::ItemId;

use crate::api::AppState;
use crate::auth::Caller;

use super::types::{KickTarget, ModerationError, ResourceLocator};

/// Require an admin caller, returning the identity.
fn ensure_admin(caller: &Caller, state: &AppState) -> Result<String, ModerationError> {
    let identity = caller.identity().ok_or(ModerationError::NoIdentity)?;
    if state.admins.contains(identity) {
        Ok(identity.to_string())
    } else {
        Err(ModerationError::NotAuthorized)
    }
}

/// Kick durations arrive as a path segment; garbage collapses to 0,
/// i.e. a kick that expires immediately.
fn parse_duration(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

/// GET /users/list
/// All moderation records, admins included.
async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Value>>, ModerationError> {
    ensure_admin(&caller, &state)?;
    Ok(Json(state.moderation.records().await?))
}

/// PUT /users/kick/{kickTime}
/// Kick the owner of the resource named in the body.
async fn kick_user(
    State(state): State<AppState>,
    Path(kick_time): Path<String>,
    caller: Caller,
    Json(target): Json<KickTarget>,
) -> Result<&'static str, ModerationError> {
    ensure_admin(&caller, &state)?;

    let locator = ResourceLocator::parse(&target.prefix)?;
    let item_id = ItemId::parse(&target.item_id)?;
    state
        .moderation
        .kick(&locator, &item_id, parse_duration(&kick_time))
        .await?;
    state.admins.reload(state.store.as_ref()).await?;

    Ok("OK")
}

/// POST /users/kick/{id}/{kickTime}
/// Adjust an existing kick's window.
async fn update_kick(
    State(state): State<AppState>,
    Path((id, kick_time)): Path<(String, String)>,
    caller: Caller,
) -> Result<&'static str, ModerationError> {
    ensure_admin(&caller, &state)?;

    if !state
        .moderation
        .update_kick(&id, parse_duration(&kick_time))
        .await?
    {
        return Err(ModerationError::NotFound);
    }

    Ok("OK")
}

/// PUT /users/ban
/// Ban the owner of the resource named in the body.
async fn ban_user(
    State(state): State<AppState>,
    caller: Caller,
    Json(target): Json<KickTarget>,
) -> Result<&'static str, ModerationError> {
    ensure_admin(&caller, &state)?;

    let locator = ResourceLocator::parse(&target.prefix)?;
    let item_id = ItemId::parse(&target.item_id)?;
    state.moderation.ban(&locator, &item_id).await?;
    state.admins.reload(state.store.as_ref()).await?;

    Ok("OK")
}

/// POST /users/unban/{id}
/// Lift a ban. 404 when no banned record exists.
async fn unban_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<&'static str, ModerationError> {
    ensure_admin(&caller, &state)?;

    if !state.moderation.unban(&id).await? {
        return Err(ModerationError::NotFound);
    }
    state.admins.reload(state.store.as_ref()).await?;

    Ok("OK")
}

/// POST /users/remove/{id}
/// Remove any moderation record for an identity.
async fn remove_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<&'static str, ModerationError> {
    ensure_admin(&caller, &state)?;

    if !state.moderation.remove_record(&id).await? {
        return Err(ModerationError::NotFound);
    }
    state.admins.reload(state.store.as_ref()).await?;

    Ok("OK")
}

/// Moderation routes, mounted at `/users`.
///
/// The two kick routes share their first parameter name; the router
/// requires consistent names at the same position, and extraction is
/// positional anyway.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_users))
        .route("/kick/{id}", put(kick_user))
        .route("/kick/{id}/{kick_time}", post(update_kick))
        .route("/ban", put(ban_user))
        .route("/unban/{id}", post(unban_user))
        .route("/remove/{id}", post(remove_record))
}
