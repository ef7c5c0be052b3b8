//! Quorum Board Common Library
//!
//! Shared types used by both the server and clients: canonical item
//! ids, user profiles, and the permission/moderation labels.

pub mod id;
pub mod types;

pub use id::{ItemId, ParseIdError};
pub use types::*;
