use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use tracing::debug;

use common::{Candle, Error, Exchange, HistoricalSource, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";

/// REST client for the public Coinbase Exchange candles endpoint.
///
/// Response rows are `[time_s, low, high, open, close, volume]`, newest
/// first; they are normalized to ascending bucket order with epoch-ms
/// timestamps. Only public market data is requested, so nothing is signed.
pub struct CoinbaseClient {
    http: Client,
    base_url: String,
}

impl CoinbaseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .user_agent("stonkerd")
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }
}

impl Default for CoinbaseClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl HistoricalSource for CoinbaseClient {
    async fn candles(
        &self,
        symbol: &str,
        granularity: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>> {
        let start = DateTime::from_timestamp_millis(start_ms)
            .ok_or_else(|| Error::Exchange(format!("start timestamp out of range: {start_ms}")))?;
        let end = DateTime::from_timestamp_millis(end_ms)
            .ok_or_else(|| Error::Exchange(format!("end timestamp out of range: {end_ms}")))?;

        let url = format!("{}/products/{}/candles", self.base_url, symbol);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("granularity", granularity.to_string()),
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }

        let rows: Vec<[f64; 6]> = serde_json::from_str(&body)?;
        let mut candles: Vec<Candle> = rows
            .iter()
            .map(|row| Candle {
                exchange: Exchange::CoinbasePro,
                symbol: symbol.to_string(),
                period: granularity,
                time: (row[0] as i64) * 1000,
                low: row[1],
                high: row[2],
                open: row[3],
                close: row[4],
                volume: row[5],
            })
            .collect();
        candles.sort_by_key(|c| c.time);

        debug!(symbol, granularity, count = candles.len(), "Fetched historical candles");
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_rows_parse_and_sort_ascending() {
        // Shape returned by the exchange: newest first.
        let body = "[[120, 9.0, 11.0, 10.0, 10.5, 3.0], [60, 8.0, 10.0, 9.0, 9.5, 2.0]]";
        let rows: Vec<[f64; 6]> = serde_json::from_str(body).unwrap();
        let mut candles: Vec<Candle> = rows
            .iter()
            .map(|row| Candle {
                exchange: Exchange::CoinbasePro,
                symbol: "BTC-USD".to_string(),
                period: 60,
                time: (row[0] as i64) * 1000,
                low: row[1],
                high: row[2],
                open: row[3],
                close: row[4],
                volume: row[5],
            })
            .collect();
        candles.sort_by_key(|c| c.time);

        assert_eq!(candles[0].time, 60_000);
        assert_eq!(candles[0].open, 9.0);
        assert_eq!(candles[0].high, 10.0);
        assert_eq!(candles[0].low, 8.0);
        assert_eq!(candles[1].time, 120_000);
        assert_eq!(candles[1].close, 10.5);
    }
}
