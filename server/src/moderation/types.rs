//! Moderation Types

use std::sync::LazyLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde::{Deserialize, Serialize};

use qb_common::{ParseIdError, UserProfile};

use crate::db::StoreError;

/// What a moderation record does to its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Elevated privilege grant (not a restriction, but it lives in the
    /// same collection and is swept into the admin set).
    Admin,
    /// Unbounded restriction.
    Banned,
    /// Restriction until `release_time`.
    Kicked,
}

/// A moderation record, stored keyed by the restricted identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub permission: RecordStatus,
    /// Epoch milliseconds at which a kick expires. Absent for bans and
    /// admin grants.
    #[serde(rename = "releaseTime", skip_serializing_if = "Option::is_none")]
    pub release_time: Option<i64>,
    /// Snapshot of the owner's display identity at moderation time.
    pub user: UserProfile,
}

/// Request body naming the resource whose owner is being moderated.
#[derive(Debug, Deserialize)]
pub struct KickTarget {
    /// Resource locator, e.g. `/boardgames/questions` or
    /// `/boardgames/questions/{itemId}/replys`.
    pub prefix: String,
    #[serde(rename = "itemId")]
    pub item_id: String,
}

static LOCATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([\w-]+)/([\w-]+)(?:/\w+/(replys))?").expect("locator regex")
});

/// A parsed resource locator: the collection an item lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    pub group: String,
    pub collection: String,
    pub replies: bool,
}

impl ResourceLocator {
    /// Parse a locator of the shape `/{group}/{collection}[/{id}/replys]`.
    pub fn parse(prefix: &str) -> Result<Self, ModerationError> {
        let captures = LOCATOR
            .captures(prefix)
            .ok_or_else(|| ModerationError::InvalidLocator(prefix.to_string()))?;
        Ok(Self {
            group: captures[1].to_string(),
            collection: captures[2].to_string(),
            replies: captures.get(3).is_some(),
        })
    }

    /// The store collection this locator resolves to.
    #[must_use]
    pub fn collection_name(&self) -> String {
        if self.replies {
            format!(
                "{}-{}-replys",
                self.group,
                self.collection.trim_end_matches('s')
            )
        } else {
            format!("{}-{}", self.group, self.collection)
        }
    }
}

/// Moderation failures.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("no identity presented")]
    NoIdentity,

    #[error("you are not authorized")]
    NotAuthorized,

    #[error("record not found")]
    NotFound,

    #[error("\"{0}\" is not a valid resource locator")]
    InvalidLocator(String),

    #[error(transparent)]
    InvalidId(#[from] ParseIdError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::NoIdentity => (StatusCode::FORBIDDEN, "NO_IDENTITY", self.to_string()),
            Self::NotAuthorized => (StatusCode::FORBIDDEN, "NOT_AUTHORIZED", self.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            Self::InvalidLocator(_) | Self::InvalidId(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
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
    fn test_locator_for_items() {
        let locator = ResourceLocator::parse("/boardgames/questions").unwrap();
        assert_eq!(locator.collection_name(), "boardgames-questions");
        assert!(!locator.replies);
    }

    #[test]
    fn test_locator_for_replies_singularizes_parent() {
        let locator =
            ResourceLocator::parse("/boardgames/questions/0123456789abcdef01234567/replys")
                .unwrap();
        assert!(locator.replies);
        assert_eq!(locator.collection_name(), "boardgames-question-replys");
    }

    #[test]
    fn test_locator_rejects_garbage() {
        assert!(ResourceLocator::parse("questions").is_err());
        assert!(ResourceLocator::parse("").is_err());
    }

    #[test]
    fn test_record_roundtrip_uses_wire_field_names() {
        let record = ModerationRecord {
            permission: RecordStatus::Kicked,
            release_time: Some(1234),
            user: UserProfile {
                id: "u1".into(),
                name: "Ada".into(),
                photo: None,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["permission"], "kicked");
        assert_eq!(json["releaseTime"], 1234);
    }
}
