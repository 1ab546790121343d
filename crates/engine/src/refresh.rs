use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use common::{CandleStore, HistoricalSource, Result};

/// How far back each refresh iteration fetches.
const FETCH_WINDOW_DAYS: i64 = 30;

/// Background historical-candle refresh.
///
/// One task per (pair, period) runs independently of all siblings: each
/// cycle fetches a bounded window and flushes it through the store's atomic
/// batch upsert. A failed iteration is logged and skipped until the next
/// cycle (no retry, no backoff) and never blocks or cancels another
/// (pair, period) unit. Tasks live for the process.
pub struct RefreshService {
    pairs: Vec<String>,
    periods: Vec<i64>,
    interval: Duration,
    source: Arc<dyn HistoricalSource>,
    store: Arc<dyn CandleStore>,
}

impl RefreshService {
    pub fn new(
        pairs: Vec<String>,
        periods: Vec<i64>,
        interval: Duration,
        source: Arc<dyn HistoricalSource>,
        store: Arc<dyn CandleStore>,
    ) -> Self {
        Self {
            pairs,
            periods,
            interval,
            source,
            store,
        }
    }

    /// Spawn one refresh task per (pair, period).
    pub fn spawn_all(self) -> Vec<JoinHandle<()>> {
        info!(
            pairs = self.pairs.len(),
            periods = self.periods.len(),
            interval = ?self.interval,
            "Starting candle refresh tasks"
        );

        let mut handles = Vec::new();
        for pair in &self.pairs {
            for &period in &self.periods {
                let pair = pair.clone();
                let interval = self.interval;
                let source = Arc::clone(&self.source);
                let store = Arc::clone(&self.store);

                handles.push(tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        if let Err(e) = refresh_once(&*source, &*store, &pair, period).await {
                            warn!(
                                pair = %pair,
                                period,
                                error = %e,
                                "Candle refresh failed; skipping until next cycle"
                            );
                        }
                    }
                }));
            }
        }
        handles
    }
}

/// One fetch-and-flush iteration for a single (pair, period).
///
/// Fetch and store errors both propagate to the per-task loop, which logs
/// and waits for the next cycle.
pub async fn refresh_once(
    source: &dyn HistoricalSource,
    store: &dyn CandleStore,
    pair: &str,
    period: i64,
) -> Result<()> {
    let end = Utc::now();
    let start = end - chrono::Duration::days(FETCH_WINDOW_DAYS);

    let candles = source
        .candles(pair, period, start.timestamp_millis(), end.timestamp_millis())
        .await?;
    store.insert_candles(&candles).await?;

    debug!(pair, period, count = candles.len(), "Refreshed candle window");
    Ok(())
}
