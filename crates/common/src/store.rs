use async_trait::async_trait;

use crate::{Candle, Exchange, Result};

/// Contract the core requires from the candle persistence engine.
///
/// `SqliteCandleStore` in `crates/store` implements this for production.
/// Storage errors propagate to the caller; the store never retries.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Fetch candles for (exchange, symbol, period) with `time > since_time`,
    /// ordered ascending by `time`.
    async fn get_candles(
        &self,
        exchange: Exchange,
        symbol: &str,
        period: i64,
        since_time: i64,
    ) -> Result<Vec<Candle>>;

    /// Upsert a batch of candles keyed by (exchange, symbol, period, time).
    /// On conflict the OHLCV columns are overwritten (last-write-wins). The
    /// whole batch is applied atomically: all rows or none.
    async fn insert_candles(&self, candles: &[Candle]) -> Result<()>;
}
