use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Exchange a candle originates from.
///
/// Stored as TEXT in the candlesticks table; part of the candle's unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
pub enum Exchange {
    CoinbasePro,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exchange::CoinbasePro => write!(f, "coinbase-pro"),
        }
    }
}

impl std::str::FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coinbase-pro" => Ok(Exchange::CoinbasePro),
            other => Err(format!("unknown exchange '{other}'")),
        }
    }
}

/// One OHLCV candle for a fixed-width time bucket.
///
/// Unique per (exchange, symbol, period, time). `time` is the bucket start in
/// epoch milliseconds; `period` is the bucket width in seconds. Invariants:
/// `high >= max(open, close)`, `low <= min(open, close)`, `volume >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub exchange: Exchange,
    pub symbol: String,
    /// Bucket width in seconds.
    pub period: i64,
    /// Bucket start, epoch milliseconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Bucket width in milliseconds.
    pub fn period_ms(&self) -> i64 {
        self.period * 1000
    }

    /// Bucket start time as a UTC datetime.
    pub fn time_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.time)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Floor a timestamp to the start of its bucket.
///
/// `period_ms` must be positive. Both values are epoch milliseconds.
pub fn bucket_start(timestamp_ms: i64, period_ms: i64) -> i64 {
    timestamp_ms - timestamp_ms.rem_euclid(period_ms)
}

/// A single trade event from the live market feed.
///
/// Consumed exactly once by the aggregator for its symbol; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub size: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// One point of an indicator series, aligned 1:1 with its source candles.
/// `value` is `None` where the indicator's lookback is not yet satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    /// Bucket start of the source candle, epoch milliseconds.
    pub time: i64,
    pub value: Option<f64>,
}
