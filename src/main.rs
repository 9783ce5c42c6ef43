use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use loglens::api::{self, AppState};
use loglens::auth::AuthService;
use loglens::config::Config;
use loglens::logs::{GeneratorConfig, LogGenerator};
use loglens::storage::{LogStore, TableCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let store = LogStore::new(&config.storage.log_file);
    if store.exists() {
        info!("Using log table: {}", store.path().display());
    } else {
        info!(
            "Log table {} does not exist yet; it will be created on first generate",
            store.path().display()
        );
    }

    match config.geoip.city_db_path.as_ref() {
        Some(path) => info!("GeoIP enrichment available from {}", path.display()),
        None => info!("GEOIP_CITY_DB_PATH not set; GeoIP enrichment disabled"),
    }

    let generator = LogGenerator::new(GeneratorConfig {
        seed: config.generator.seed,
        ..Default::default()
    });

    let state = Arc::new(AppState {
        store,
        cache: TableCache::new(config.cache.max_entries),
        generator: Mutex::new(generator),
        batch_size: config.generator.batch_size,
        max_batch_size: config.generator.max_batch_size,
        geoip_db: config.geoip.city_db_path.clone(),
        split_seed: config.prediction.split_seed,
    });
    let auth_service = Arc::new(AuthService::new(&config.auth));

    let router = api::create_api_router(state, auth_service);

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Protected endpoints require the API_KEY header");

    axum::serve(listener, router).await?;

    Ok(())
}
