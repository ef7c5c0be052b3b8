//! User Types

use serde::{Deserialize, Serialize};

/// A resource owner as persisted with every item and reply.
///
/// The `id` is the caller's opaque identity token; it never leaves the
/// server (responses use [`PublicProfile`] instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque identity token. Compared, never parsed.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar image URL.
    pub photo: Option<String>,
}

/// The caller-facing projection of a [`UserProfile`].
///
/// Structurally lacks the identity token, so a response built from it
/// cannot leak the raw owner id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    /// Display name.
    pub name: String,
    /// Avatar image URL.
    pub photo: Option<String>,
}

impl From<UserProfile> for PublicProfile {
    fn from(user: UserProfile) -> Self {
        Self {
            name: user.name,
            photo: user.photo,
        }
    }
}

/// A caller's relationship to an owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Caller holds elevated privilege.
    Admin,
    /// Caller owns the resource.
    You,
    /// No relationship.
    None,
}

/// Moderation classification of a caller, recomputed on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Caller may proceed.
    Ok,
    /// No identity was presented.
    Error,
    /// Caller is banned (no expiry).
    Banned,
    /// Caller is kicked and the release time has not elapsed.
    Kicked,
}
