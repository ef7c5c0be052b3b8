//! Canonical item ids.
//!
//! Every stored document is addressed by a 24-character lowercase hex
//! string (12 random bytes). Ids arriving over the wire are validated
//! for shape before anything touches the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Length of a canonical id in hex characters.
pub const ID_LENGTH: usize = 24;

/// A validated item/reply/record id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

/// Error returned when an incoming id fails the shape check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid id")]
pub struct ParseIdError(pub String);

impl ItemId {
    /// Generate a fresh random id (12 random bytes, hex encoded).
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; ID_LENGTH / 2] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Validate an incoming string as a canonical id.
    pub fn parse(raw: &str) -> Result<Self, ParseIdError> {
        if raw.len() == ID_LENGTH && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(ParseIdError(raw.to_string()))
        }
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}
