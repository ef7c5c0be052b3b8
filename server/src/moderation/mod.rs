//! User moderation.
//!
//! Time-boxed kicks and unbounded bans, recorded per caller identity
//! and recomputed into a [`qb_common::UserStatus`] on every request.

mod handlers;
mod state;
mod types;

pub use handlers::router;
pub use state::ModerationState;
pub use types::{KickTarget, ModerationError, ModerationRecord, RecordStatus, ResourceLocator};
