use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use equityeye_backend::app;
use equityeye_backend::config::{AppConfig, StoreBackend};
use equityeye_backend::external::newsapi::NewsApiProvider;
use equityeye_backend::external::polygon::PolygonProvider;
use equityeye_backend::logging::{self, LoggingConfig};
use equityeye_backend::state::AppState;
use equityeye_backend::store::{MemoryStore, PgStore, PortfolioStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!(e))?;

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let store: Arc<dyn PortfolioStore> = match &config.store {
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            info!("🗄️ Using Postgres store ({} connections)", max_connections);
            Arc::new(
                PgStore::connect(database_url, *max_connections)
                    .await
                    .context("Failed to connect to the database")?,
            )
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState {
        store: store.clone(),
        price_provider: Arc::new(PolygonProvider::new(
            &config.polygon_base_url,
            config.polygon_api_key.clone(),
        )),
        news_provider: Arc::new(NewsApiProvider::new(&config.news_base_url, config.news_api_key.clone())),
        valuation: config.valuation.clone(),
        jwt_secret: Arc::from(config.jwt_secret.as_str()),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 EquityEye backend running at http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Store closed, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
