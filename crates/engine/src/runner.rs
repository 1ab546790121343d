use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use common::{Candle, CandleStore, Tick};

use crate::aggregator::{CandleAggregator, TickOutcome};
use crate::scheduler::RedrawScheduler;

/// Drives one (symbol, period) aggregator from a tick subscription.
///
/// The single writer for its key: applies ticks, upserts completed and
/// late-amended candles, and schedules debounced live-candle emissions for
/// display consumers.
pub struct AggregatorTask {
    aggregator: CandleAggregator,
    scheduler: RedrawScheduler,
    store: Arc<dyn CandleStore>,
    tick_rx: broadcast::Receiver<Tick>,
}

impl AggregatorTask {
    pub fn new(
        aggregator: CandleAggregator,
        scheduler: RedrawScheduler,
        store: Arc<dyn CandleStore>,
        tick_rx: broadcast::Receiver<Tick>,
    ) -> Self {
        Self {
            aggregator,
            scheduler,
            store,
            tick_rx,
        }
    }

    /// Subscribe to this task's debounced live-candle emissions.
    pub fn subscribe_redraws(&self) -> broadcast::Receiver<Candle> {
        self.scheduler.subscribe()
    }

    /// Run the consumption loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(
            symbol = %self.aggregator.symbol(),
            period = self.aggregator.period(),
            "Aggregator task running"
        );

        loop {
            match self.tick_rx.recv().await {
                Ok(tick) => {
                    match self.aggregator.apply(&tick) {
                        TickOutcome::RolledOver { completed } => {
                            self.flush(&[completed]).await;
                        }
                        TickOutcome::AmendedPrevious { amended } => {
                            self.flush(&[amended]).await;
                        }
                        TickOutcome::Updated => {}
                        TickOutcome::Dropped => continue,
                    }

                    if let Some(current) = self.aggregator.current() {
                        self.scheduler.schedule(current.clone());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        symbol = %self.aggregator.symbol(),
                        period = self.aggregator.period(),
                        dropped = n,
                        "Aggregator lagged — dropped ticks"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!(
                        symbol = %self.aggregator.symbol(),
                        period = self.aggregator.period(),
                        "Tick channel closed — stopping aggregator task"
                    );
                    return;
                }
            }
        }
    }

    async fn flush(&self, candles: &[Candle]) {
        if let Err(e) = self.store.insert_candles(candles).await {
            error!(
                symbol = %self.aggregator.symbol(),
                period = self.aggregator.period(),
                error = %e,
                "Failed to persist candle batch"
            );
        }
    }
}
