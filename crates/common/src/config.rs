use serde::{Deserialize, Serialize};

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Candle refresh loop
    /// Seconds between historical refresh cycles per (pair, period).
    pub refresh_interval_secs: u64,

    // Live candle publication
    /// Debounce window for live-candle redraw emission, milliseconds.
    pub redraw_debounce_ms: u64,

    // Coinbase Exchange REST base URL (overridable for tests)
    pub coinbase_api_url: String,

    // Pair/period universe file path
    pub universe_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            database_url: required_env("DATABASE_URL"),
            refresh_interval_secs: optional_env("REFRESH_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            redraw_debounce_ms: optional_env("REDRAW_DEBOUNCE_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(250),
            coinbase_api_url: optional_env("COINBASE_API_URL")
                .unwrap_or_else(|| "https://api.exchange.coinbase.com".to_string()),
            universe_path: optional_env("UNIVERSE_PATH")
                .unwrap_or_else(|| "config/stonker.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Pair/period universe loaded from a TOML file.
///
/// Example `config/stonker.toml`:
/// ```toml
/// pairs = ["BTC-USD", "ETH-USD"]
///
/// # bucket widths in seconds
/// periods = [60, 300, 900, 3600, 21600, 86400]
///
/// # subset used for indicator reports
/// report_periods = [300, 900, 3600, 21600, 86400]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UniverseConfig {
    /// Product symbols, e.g. "BTC-USD".
    pub pairs: Vec<String>,
    /// Candle bucket widths in seconds, refreshed and persisted.
    pub periods: Vec<i64>,
    /// Periods included in indicator reports.
    #[serde(default = "default_report_periods")]
    pub report_periods: Vec<i64>,
}

fn default_report_periods() -> Vec<i64> {
    vec![300, 900, 3600, 21600, 86400]
}

impl UniverseConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read universe config at '{path}': {e}"));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse universe config at '{path}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universe_parses_with_default_report_periods() {
        let cfg: UniverseConfig = toml::from_str(
            r#"
            pairs = ["BTC-USD", "ETH-USD"]
            periods = [60, 300]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pairs.len(), 2);
        assert_eq!(cfg.periods, vec![60, 300]);
        assert_eq!(cfg.report_periods, vec![300, 900, 3600, 21600, 86400]);
    }
}
