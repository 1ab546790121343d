use async_trait::async_trait;

use crate::{Candle, Result};

/// Abstraction over the historical candle provider.
///
/// `CoinbaseClient` in `crates/engine` implements this against the public
/// Coinbase Exchange REST API. The refresh service holds a
/// `dyn HistoricalSource`; fetch errors are caught per (pair, period)
/// iteration by the caller, never inside the source.
#[async_trait]
pub trait HistoricalSource: Send + Sync {
    /// Fetch candles for `symbol` at `granularity` (seconds) covering
    /// `[start_ms, end_ms]`, ordered ascending by bucket start.
    async fn candles(
        &self,
        symbol: &str,
        granularity: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>>;
}
