//! Application state and router assembly.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::DocumentStore;
use crate::items::{self, ItemAccessService};
use crate::moderation::{self, ModerationState};
use crate::permissions::AdminSet;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub admins: Arc<AdminSet>,
    pub moderation: ModerationState,
    pub items: ItemAccessService,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        let admins = Arc::new(AdminSet::new());
        let moderation = ModerationState::new(store.clone());
        let items = ItemAccessService::new(
            store.clone(),
            admins.clone(),
            moderation.clone(),
            config.page_length,
        );
        Self {
            store,
            admins,
            moderation,
            items,
            config: Arc::new(config),
        }
    }
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/group/{group}/{collection}", items::router())
        .nest("/users", moderation::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
