//! Items, replies, and their paginated listings.

mod counters;
mod escape;
mod handlers;
mod service;
mod types;

pub use handlers::router;
pub use service::{ItemAccessService, Namespace};
pub use types::{ItemDetail, ItemError, ItemSummary, ListResponse, ReplyView};
