//! aquatrace service entry point.
//!
//! Boots the configured store, verifies connectivity and leaves a ready
//! coordinator stack behind for the embedding transport layer.

use std::sync::Arc;

use aquatrace::config::AppConfig;
use aquatrace::logging::init_logging;
use aquatrace::notify::LogNotifier;
use aquatrace::signing::SigningService;
use aquatrace::store::{MemoryStore, PgStore, Store};
use aquatrace::transfer::TransferCoordinator;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--env" && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "default".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(&get_env()).unwrap_or_default();
    let _guard = init_logging(&config);

    let store: Arc<dyn Store> = match &config.postgres_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            store.init_schema().await?;
            store.health_check().await?;
            tracing::info!("using PostgreSQL store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("no postgres_url configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let signer = Arc::new(SigningService::new(
        config.signing.secret_key.as_bytes().to_vec(),
        config.signing.confirmation_base_url.clone(),
        chrono::Duration::hours(config.signing.token_ttl_hours),
        store.clone(),
    ));
    let _coordinator = TransferCoordinator::new(
        store,
        signer,
        Arc::new(LogNotifier),
        config.signing.order_prefix.clone(),
    );

    tracing::info!("aquatrace core ready");
    Ok(())
}
