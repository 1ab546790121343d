use std::sync::Arc;

use tracing::debug;

use common::{CandleStore, Exchange, IndicatorPoint, Result};
use indicators::Stc;

/// How far back report queries look, in days.
pub const LOOKBACK_DAYS: i64 = 90;

/// Schaff Trend Cycle report for one period of a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReport {
    /// Bucket width in seconds.
    pub period: i64,
    /// One point per source candle, ordered ascending by time; `value` is
    /// `None` where the indicator lookback is not yet satisfied.
    pub points: Vec<IndicatorPoint>,
}

/// Composes candle-store queries with the indicator engine to produce
/// multi-period STC reports for a symbol.
pub struct ReportPipeline {
    store: Arc<dyn CandleStore>,
    exchange: Exchange,
    stc: Stc,
}

impl ReportPipeline {
    pub fn new(store: Arc<dyn CandleStore>, exchange: Exchange) -> Self {
        Self {
            store,
            exchange,
            stc: Stc::default(),
        }
    }

    /// Override the indicator parameters.
    pub fn with_stc(mut self, stc: Stc) -> Self {
        self.stc = stc;
        self
    }

    /// Build one report per requested period.
    ///
    /// `now_ms` anchors the lookback horizon. A period with no candle
    /// history yields an empty point series, not an error; store errors
    /// propagate.
    pub async fn report(
        &self,
        symbol: &str,
        periods: &[i64],
        now_ms: i64,
    ) -> Result<Vec<PeriodReport>> {
        let since = now_ms - LOOKBACK_DAYS * 24 * 60 * 60 * 1000;

        let mut reports = Vec::with_capacity(periods.len());
        for &period in periods {
            let candles = self
                .store
                .get_candles(self.exchange, symbol, period, since)
                .await?;

            let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
            let series = self.stc.series(&closes);

            let points: Vec<IndicatorPoint> = candles
                .iter()
                .zip(series)
                .map(|(candle, value)| IndicatorPoint {
                    time: candle.time,
                    value,
                })
                .collect();

            debug!(symbol, period, points = points.len(), "Built STC report");
            reports.push(PeriodReport { period, points });
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Candle;
    use store::SqliteCandleStore;

    fn candle(period: i64, index: i64, close: f64) -> Candle {
        Candle {
            exchange: Exchange::CoinbasePro,
            symbol: "BTC-USD".to_string(),
            period,
            time: index * period * 1000,
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 3.0,
        }
    }

    #[tokio::test]
    async fn empty_history_yields_empty_series_not_error() {
        let store = Arc::new(SqliteCandleStore::in_memory().await.unwrap());
        let pipeline = ReportPipeline::new(store, Exchange::CoinbasePro);

        let reports = pipeline
            .report("BTC-USD", &[300, 900, 3600], 1_700_000_000_000)
            .await
            .unwrap();

        assert_eq!(reports.len(), 3);
        for report in reports {
            assert!(report.points.is_empty());
        }
    }

    #[tokio::test]
    async fn points_align_with_candles_and_respect_lookback() {
        let store = Arc::new(SqliteCandleStore::in_memory().await.unwrap());

        let candles: Vec<Candle> = (0..80)
            .map(|i| candle(300, i, 100.0 + (i as f64 * 0.4).sin() * 5.0))
            .collect();
        store.insert_candles(&candles).await.unwrap();

        let pipeline = ReportPipeline::new(store, Exchange::CoinbasePro);
        // Anchor "now" just past the last candle so everything is in range.
        let now = candles.last().unwrap().time + 1;
        let reports = pipeline.report("BTC-USD", &[300], now).await.unwrap();

        assert_eq!(reports.len(), 1);
        let points = &reports[0].points;
        assert_eq!(points.len(), 80);
        for (point, candle) in points.iter().zip(&candles) {
            assert_eq!(point.time, candle.time);
        }
        // Leading entries undefined until the slow EMA lookback (50).
        assert!(points[49].value.is_none());
        assert!(points[50].value.is_some());
        for p in points.iter().filter_map(|p| p.value) {
            assert!((0.0..=100.0).contains(&p));
        }
    }

    #[tokio::test]
    async fn candles_outside_lookback_are_excluded() {
        let store = Arc::new(SqliteCandleStore::in_memory().await.unwrap());

        let horizon_ms = LOOKBACK_DAYS * 24 * 60 * 60 * 1000;
        let now: i64 = 2 * horizon_ms;
        let stale = Candle {
            time: now - horizon_ms - 1,
            ..candle(300, 0, 50.0)
        };
        let fresh = Candle {
            time: now - 1000,
            ..candle(300, 0, 60.0)
        };
        store.insert_candles(&[stale, fresh.clone()]).await.unwrap();

        let pipeline = ReportPipeline::new(store, Exchange::CoinbasePro);
        let reports = pipeline.report("BTC-USD", &[300], now).await.unwrap();
        assert_eq!(reports[0].points.len(), 1);
        assert_eq!(reports[0].points[0].time, fresh.time);
    }
}
