use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use qb_server::api::{create_router, AppState};
use qb_server::config::Config;
use qb_server::db::{create_pool, run_migrations, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qb_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env()?;
    info!("Starting Quorum Board server on {}", config.bind_address);

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let state = AppState::new(store, config.clone());
    state.admins.reload(state.store.as_ref()).await?;

    if config.kick_sweep_interval > 0 {
        let moderation = state.moderation.clone();
        let period = Duration::from_secs(config.kick_sweep_interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match moderation.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Swept expired kicks"),
                    Err(err) => error!("Kick sweep failed: {}", err),
                }
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install shutdown handler: {}", err);
        return;
    }
    info!("Shutdown signal received");
}
