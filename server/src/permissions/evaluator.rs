//! Permission evaluation logic.
//!
//! Computes a caller's relationship to a resource owner.

use qb_common::Permission;

use super::AdminSet;

/// Compute the permission label for a caller against a resource owner.
///
/// Resolution order:
/// 1. Admins report `admin` everywhere, including on their own content
/// 2. The owner reports `you`
/// 3. Everyone else, including anonymous callers, reports `none`
#[must_use]
pub fn evaluate(caller: Option<&str>, owner: &str, admins: &AdminSet) -> Permission {
    match caller {
        Some(identity) if admins.contains(identity) => Permission::Admin,
        Some(identity) if identity == owner => Permission::You,
        _ => Permission::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admins_of(ids: &[&str]) -> AdminSet {
        let set = AdminSet::new();
        set.replace(ids.iter().map(ToString::to_string));
        set
    }

    #[test]
    fn test_admin_everywhere() {
        let admins = admins_of(&["root"]);
        assert_eq!(evaluate(Some("root"), "someone", &admins), Permission::Admin);
        assert_eq!(evaluate(Some("root"), "other", &admins), Permission::Admin);
    }

    #[test]
    fn test_admin_dominates_ownership() {
        let admins = admins_of(&["root"]);
        // An admin viewing their own content still reports admin.
        assert_eq!(evaluate(Some("root"), "root", &admins), Permission::Admin);
    }

    #[test]
    fn test_owner_is_you() {
        let admins = admins_of(&[]);
        assert_eq!(evaluate(Some("u1"), "u1", &admins), Permission::You);
    }

    #[test]
    fn test_stranger_is_none() {
        let admins = admins_of(&[]);
        assert_eq!(evaluate(Some("u1"), "u2", &admins), Permission::None);
    }

    #[test]
    fn test_anonymous_is_none() {
        let admins = admins_of(&["root"]);
        assert_eq!(evaluate(None, "u1", &admins), Permission::None);
    }
}
