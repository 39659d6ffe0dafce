use std::error::Error;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ban_pick_backend::config::{Config, StoreBackend};
use ban_pick_backend::routes;
use ban_pick_backend::services::champion_catalog::ChampionCatalogClient;
use ban_pick_backend::services::turn_timer::TurnWatchers;
use ban_pick_backend::store::{DraftStore, MemoryStore, RetryPolicy, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let retry = RetryPolicy::with_attempts(config.tx_max_attempts);

    match config.store {
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&config.database_url, retry).await?;
            serve(store, config).await
        }
        StoreBackend::Memory => {
            info!("Using in-memory draft store.");
            serve(MemoryStore::new(retry), config).await
        }
    }
}

async fn serve<S: DraftStore>(store: S, config: Config) -> Result<(), Box<dyn Error>> {
    let catalog = ChampionCatalogClient::new(&config.catalog_base_url, &config.catalog_locale);
    let app = routes::router(
        Arc::new(store),
        Arc::new(config.draft.clone()),
        Arc::new(catalog),
        Arc::new(TurnWatchers::new()),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Started server.");
    axum::serve(listener, app).await?;
    Ok(())
}
