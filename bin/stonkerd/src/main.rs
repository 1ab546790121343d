use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{CandleStore, Config, HistoricalSource, UniverseConfig};
use engine::{CoinbaseClient, RefreshService};
use store::SqliteCandleStore;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let universe = UniverseConfig::load(&cfg.universe_path);
    info!(
        pairs = universe.pairs.len(),
        periods = universe.periods.len(),
        "Stonker starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let store = SqliteCandleStore::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to open candle store: {e}"));
    let store: Arc<dyn CandleStore> = Arc::new(store);

    // ── Historical source ─────────────────────────────────────────────────────
    let source: Arc<dyn HistoricalSource> = Arc::new(CoinbaseClient::new(&cfg.coinbase_api_url));

    // ── Historical refresh ────────────────────────────────────────────────────
    // One independent task per (pair, period); failures are isolated per unit
    // and skipped until the next cycle. Live tick aggregation and reports are
    // library surfaces consumed by display/request collaborators.
    let refresh = RefreshService::new(
        universe.pairs.clone(),
        universe.periods.clone(),
        Duration::from_secs(cfg.refresh_interval_secs),
        source,
        store,
    );
    refresh.spawn_all();

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await.unwrap();
    info!("Shutdown signal received. Exiting.");
}
