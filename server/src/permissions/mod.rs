//! Permission evaluation and query-level authorization.
//!
//! Three pieces: a pure evaluator mapping a caller onto a resource
//! owner (`admin` / `you` / `none`), a refreshable cache of admin
//! identities, and the gate that rewrites mutation filters so
//! non-admins can only touch what they own.

mod admin_set;
mod evaluator;
mod gate;

pub use admin_set::AdminSet;
pub use evaluator::evaluate;
pub use gate::authorize;
