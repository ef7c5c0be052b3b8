//! Item and reply wire types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use qb_common::{ParseIdError, Permission, PublicProfile, UserProfile, UserStatus};

use crate::db::StoreError;

// ============================================================================
// Persisted shapes
// ============================================================================

/// An item as persisted (after projection on reads).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub title: String,
    pub content: Value,
    pub date: i64,
    pub user: UserProfile,
    #[serde(default)]
    pub sticky: bool,
}

/// A reply as persisted (after projection on reads).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    pub date: i64,
    pub user: UserProfile,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    /// Free-form nested content; every string leaf gets escaped.
    pub content: Value,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    pub answer: String,
    /// Opaque upload reference (`{filename, mimeType}`), stored as-is.
    pub image: Option<Value>,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct SetStickyRequest {
    pub value: bool,
}

// ============================================================================
// Response Types
// ============================================================================

/// Full item view. Built from [`ItemRecord`]; carries the permission
/// label and, by construction, no raw owner identity.
#[derive(Debug, Serialize)]
pub struct ItemDetail {
    pub title: String,
    pub content: Value,
    pub date: i64,
    pub user: PublicProfile,
    pub permission: Permission,
    pub sticky: bool,
}

/// Listing summary for the bulk item fetch.
#[derive(Debug, Serialize)]
pub struct ItemSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub date: i64,
    pub user: SummaryAuthor,
    pub sticky: bool,
}

/// Only the author's display name survives into summaries.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryAuthor {
    pub name: String,
}

/// A reply with its permission view applied.
#[derive(Debug, Serialize)]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    pub date: i64,
    pub user: PublicProfile,
    pub permission: Permission,
}

/// An id page plus the total page count.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub ids: Vec<String>,
    #[serde(rename = "numberOfPages")]
    pub number_of_pages: u64,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),

    #[error("item not found")]
    NotFound,

    #[error("you are not authorized")]
    NotAuthorized,

    /// The caller's moderation status forbids the operation.
    #[error("{}", denial_reason(*.0))]
    Denied(UserStatus),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn denial_reason(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Error => "no identity presented",
        UserStatus::Banned => "you are banned",
        UserStatus::Kicked => "you are kicked",
        UserStatus::Ok => "ok",
    }
}

impl IntoResponse for ItemError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::InvalidId(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            Self::NotAuthorized | Self::Denied(_) => {
                (StatusCode::FORBIDDEN, "NOT_AUTHORIZED", self.to_string())
            }
            Self::Store(err) => {
                tracing::error!("Store error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "error".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": code, "message": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_messages() {
        assert_eq!(
            ItemError::Denied(UserStatus::Banned).to_string(),
            "you are banned"
        );
        assert_eq!(
            ItemError::Denied(UserStatus::Error).to_string(),
            "no identity presented"
        );
    }

    #[test]
    fn test_list_response_wire_shape() {
        let response = ListResponse {
            ids: vec!["a".repeat(24)],
            number_of_pages: 3,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["numberOfPages"], 3);
        assert!(json["ids"].is_array());
    }
}
