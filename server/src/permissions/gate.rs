//! Query-rewriting authorization gate.
//!
//! The single privilege boundary for mutating operations: every delete
//! or update runs through [`authorize`] before it reaches the store, so
//! ownership is enforced by the query itself rather than checked after
//! the fact.

use serde_json::Value;

use super::AdminSet;
use crate::db::Filter;

/// Scope a mutation filter to the caller's own resources.
///
/// Admins pass the filter through untouched. Everyone else gets a
/// `user.id == caller` constraint appended; an anonymous caller is
/// pinned to the empty identity, which no persisted resource carries,
/// so the rewritten filter matches nothing.
#[must_use]
pub fn authorize(caller: Option<&str>, admins: &AdminSet, filter: Filter) -> Filter {
    match caller {
        Some(identity) if admins.contains(identity) => filter,
        _ => filter.eq(
            "user.id",
            Value::String(caller.unwrap_or_default().to_string()),
        ),
    }
}
