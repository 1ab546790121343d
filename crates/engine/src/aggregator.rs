use tracing::debug;

use common::{bucket_start, Candle, Exchange, Tick};

/// Outcome of folding one tick into the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The in-progress candle was updated (or opened) in place.
    Updated,
    /// The bucket rolled over. `completed` is the candle that just closed
    /// and should be flushed to the store; a fresh candle is now building.
    RolledOver { completed: Candle },
    /// A late tick within the one-bucket grace window amended the candle
    /// that already rolled over; it should be re-upserted.
    AmendedPrevious { amended: Candle },
    /// Tick older than the grace window; silently ignored.
    Dropped,
}

/// Per-(symbol, period) bucketing state machine.
///
/// Folds an irregular tick stream into fixed-width candles: *empty →
/// building → rolled-over → building(next)*, cycling for the session.
/// Exactly one writer owns an instance (the tick consumer for its key), so
/// no locking is involved. Ticks for the symbol must arrive in
/// non-decreasing timestamp order; there is no reordering buffer beyond the
/// one-bucket grace window.
#[derive(Debug)]
pub struct CandleAggregator {
    exchange: Exchange,
    symbol: String,
    /// Bucket width in seconds.
    period: i64,
    current: Option<Candle>,
    /// The candle that most recently rolled over, kept so one late tick for
    /// the old bucket can still amend it. Grace is exactly one bucket.
    previous: Option<Candle>,
}

impl CandleAggregator {
    pub fn new(exchange: Exchange, symbol: impl Into<String>, period: i64) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            period,
            current: None,
            previous: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn period(&self) -> i64 {
        self.period
    }

    /// The candle currently building, if any tick or seed has arrived.
    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// The candle that last rolled over, still within its amend grace.
    pub fn previous(&self) -> Option<&Candle> {
        self.previous.as_ref()
    }

    /// Install a candle fetched from history as the in-progress candle.
    ///
    /// Replaces any live-built candle for the same or an older bucket, so
    /// the persisted volume becomes the baseline the next live tick adds to
    /// instead of compounding on top of volume the live session never
    /// observed accumulating. Seeds older than the current bucket are
    /// ignored; a seed for a newer bucket rolls the current candle over.
    pub fn seed_from_history(&mut self, fetched: Candle) {
        match self.current.as_ref().map(|c| c.time) {
            None => self.current = Some(fetched),
            Some(time) if fetched.time == time => self.current = Some(fetched),
            Some(time) if fetched.time > time => {
                self.previous = self.current.take();
                self.current = Some(fetched);
            }
            Some(_) => {
                debug!(
                    symbol = %self.symbol,
                    period = self.period,
                    seed_time = fetched.time,
                    "Ignoring historical seed older than the building bucket"
                );
            }
        }
    }

    /// Fold one tick into the state machine.
    pub fn apply(&mut self, tick: &Tick) -> TickOutcome {
        let period_ms = self.period * 1000;
        let bucket = bucket_start(tick.timestamp, period_ms);

        let Some(mut current) = self.current.take() else {
            self.current = Some(self.open_candle(bucket, None, tick));
            return TickOutcome::Updated;
        };

        if bucket == current.time {
            fold_tick(&mut current, tick);
            self.current = Some(current);
            return TickOutcome::Updated;
        }

        if bucket > current.time {
            let completed = current;
            let open = completed.close;
            self.current = Some(self.open_candle(bucket, Some(open), tick));
            self.previous = Some(completed.clone());
            return TickOutcome::RolledOver { completed };
        }

        // Older than the building bucket: put it back untouched, then amend
        // the rolled-over candle if the tick lands exactly in it.
        self.current = Some(current);

        if let Some(previous) = self.previous.as_mut() {
            if bucket == previous.time {
                fold_tick(previous, tick);
                return TickOutcome::AmendedPrevious {
                    amended: previous.clone(),
                };
            }
        }

        debug!(
            symbol = %self.symbol,
            period = self.period,
            tick_time = tick.timestamp,
            bucket,
            "Dropping tick older than the one-bucket grace window"
        );
        TickOutcome::Dropped
    }

    fn open_candle(&self, bucket: i64, open: Option<f64>, tick: &Tick) -> Candle {
        Candle {
            exchange: self.exchange,
            symbol: self.symbol.clone(),
            period: self.period,
            time: bucket,
            open: open.unwrap_or(tick.price),
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.size,
        }
    }
}

fn fold_tick(candle: &mut Candle, tick: &Tick) {
    candle.high = candle.high.max(tick.price);
    candle.low = candle.low.min(tick.price);
    candle.close = tick.price;
    candle.volume += tick.size;
}

/// Splice a live candle onto the tail of a display series.
///
/// Equal bucket → replace the last element; newer bucket → append and drop
/// the oldest (the window length never changes); empty series → seed with
/// the live candle alone. A live candle older than the tail is ignored.
pub fn splice(series: &mut Vec<Candle>, live: &Candle) {
    let Some(last_time) = series.last().map(|c| c.time) else {
        series.push(live.clone());
        return;
    };

    if live.time == last_time {
        if let Some(last) = series.last_mut() {
            *last = live.clone();
        }
    } else if live.time > last_time {
        series.push(live.clone());
        series.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: i64 = 60; // seconds
    const PERIOD_MS: i64 = 60_000;

    fn agg() -> CandleAggregator {
        CandleAggregator::new(Exchange::CoinbasePro, "BTC-USD", PERIOD)
    }

    fn tick(timestamp: i64, price: f64, size: f64) -> Tick {
        Tick {
            symbol: "BTC-USD".to_string(),
            price,
            size,
            timestamp,
        }
    }

    #[test]
    fn one_candle_per_window_with_extremes_and_summed_volume() {
        // Strictly increasing timestamps spaced 1 unit apart: each PERIOD_MS
        // window must yield exactly one completed candle with high = max
        // price, low = min price, volume = sum of sizes.
        let mut agg = agg();
        let mut completed = Vec::new();
        let prices: Vec<f64> = (0..(3 * PERIOD_MS))
            .map(|t| 100.0 + ((t % 97) as f64) - 48.0)
            .collect();

        for (t, &price) in prices.iter().enumerate() {
            match agg.apply(&tick(t as i64, price, 2.0)) {
                TickOutcome::RolledOver { completed: c } => completed.push(c),
                TickOutcome::Updated => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(completed.len(), 2);
        for (w, candle) in completed.iter().enumerate() {
            let window = &prices[w * PERIOD_MS as usize..(w + 1) * PERIOD_MS as usize];
            let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
            assert_eq!(candle.time, w as i64 * PERIOD_MS);
            assert_eq!(candle.high, max);
            assert_eq!(candle.low, min);
            assert_eq!(candle.volume, 2.0 * PERIOD_MS as f64);
        }
    }

    #[test]
    fn rollover_opens_at_previous_close() {
        let mut agg = agg();
        agg.apply(&tick(10, 100.0, 1.0));
        agg.apply(&tick(20, 105.0, 1.0));

        let outcome = agg.apply(&tick(PERIOD_MS + 5, 110.0, 3.0));
        let TickOutcome::RolledOver { completed } = outcome else {
            panic!("expected rollover");
        };
        assert_eq!(completed.close, 105.0);

        let current = agg.current().unwrap();
        assert_eq!(current.time, PERIOD_MS);
        assert_eq!(current.open, 105.0);
        assert_eq!(current.high, 110.0);
        assert_eq!(current.low, 110.0);
        assert_eq!(current.close, 110.0);
        assert_eq!(current.volume, 3.0);
    }

    #[test]
    fn late_tick_amends_previous_bucket_once_rolled_over() {
        let mut agg = agg();
        agg.apply(&tick(10, 100.0, 1.0));
        agg.apply(&tick(PERIOD_MS + 10, 101.0, 1.0)); // rollover

        let outcome = agg.apply(&tick(PERIOD_MS - 1, 120.0, 5.0));
        let TickOutcome::AmendedPrevious { amended } = outcome else {
            panic!("expected late amend, got {outcome:?}");
        };
        assert_eq!(amended.time, 0);
        assert_eq!(amended.high, 120.0);
        assert_eq!(amended.close, 120.0);
        assert_eq!(amended.volume, 6.0);

        // The building candle is untouched.
        assert_eq!(agg.current().unwrap().close, 101.0);
    }

    #[test]
    fn ticks_older_than_grace_window_are_dropped() {
        let mut agg = agg();
        agg.apply(&tick(2 * PERIOD_MS + 10, 100.0, 1.0));
        agg.apply(&tick(3 * PERIOD_MS + 10, 101.0, 1.0)); // rollover

        // Two buckets back: beyond the one-bucket grace window.
        let outcome = agg.apply(&tick(PERIOD_MS + 10, 99.0, 1.0));
        assert_eq!(outcome, TickOutcome::Dropped);
        assert_eq!(agg.current().unwrap().volume, 1.0);
        assert_eq!(agg.previous().unwrap().volume, 1.0);
    }

    #[test]
    fn seed_from_history_sets_volume_baseline_for_first_live_tick() {
        let mut agg = agg();
        // Live-built candle with volume the session observed.
        agg.apply(&tick(10, 100.0, 1.0));

        // Fetched candle for the same bucket carries the persisted baseline.
        let fetched = Candle {
            exchange: Exchange::CoinbasePro,
            symbol: "BTC-USD".to_string(),
            period: PERIOD,
            time: 0,
            open: 99.0,
            high: 104.0,
            low: 98.0,
            close: 103.0,
            volume: 250.0,
        };
        agg.seed_from_history(fetched);

        // First live contribution lands on top of the persisted volume, not
        // on top of the live-built 1.0.
        agg.apply(&tick(20, 105.0, 2.0));
        let current = agg.current().unwrap();
        assert_eq!(current.volume, 252.0);
        assert_eq!(current.open, 99.0);
        assert_eq!(current.high, 105.0);
        assert_eq!(current.low, 98.0);
        assert_eq!(current.close, 105.0);
    }

    #[test]
    fn seed_for_newer_bucket_rolls_the_current_candle_over() {
        let mut agg = agg();
        agg.apply(&tick(10, 100.0, 1.0));

        let fetched = Candle {
            exchange: Exchange::CoinbasePro,
            symbol: "BTC-USD".to_string(),
            period: PERIOD,
            time: PERIOD_MS,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 7.0,
        };
        agg.seed_from_history(fetched.clone());

        assert_eq!(agg.current(), Some(&fetched));
        assert_eq!(agg.previous().unwrap().time, 0);

        // A late tick for the displaced bucket still amends it.
        let outcome = agg.apply(&tick(30, 102.0, 1.0));
        assert!(matches!(outcome, TickOutcome::AmendedPrevious { .. }));
    }

    #[test]
    fn first_tick_opens_candle_at_its_own_price() {
        let mut agg = agg();
        assert_eq!(agg.apply(&tick(90_500, 42.0, 0.5)), TickOutcome::Updated);
        let current = agg.current().unwrap();
        assert_eq!(current.time, 60_000);
        assert_eq!(current.open, 42.0);
        assert_eq!(current.volume, 0.5);
    }

    // ── splice ────────────────────────────────────────────────────────────

    fn display_candle(time: i64, close: f64) -> Candle {
        Candle {
            exchange: Exchange::CoinbasePro,
            symbol: "BTC-USD".to_string(),
            period: PERIOD,
            time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn splice_replaces_last_on_equal_bucket() {
        let mut series = vec![display_candle(0, 1.0), display_candle(100, 2.0)];
        splice(&mut series, &display_candle(100, 9.0));
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, 9.0);
        assert_eq!(series[0].close, 1.0);
    }

    #[test]
    fn splice_appends_and_drops_oldest_on_new_bucket() {
        let mut series = vec![display_candle(0, 1.0), display_candle(100, 2.0)];
        splice(&mut series, &display_candle(200, 3.0));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time, 100);
        assert_eq!(series[1].time, 200);
    }

    #[test]
    fn splice_seeds_empty_series() {
        let mut series = Vec::new();
        splice(&mut series, &display_candle(100, 2.0));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn splice_ignores_stale_live_candle() {
        let mut series = vec![display_candle(100, 2.0), display_candle(200, 3.0)];
        splice(&mut series, &display_candle(0, 9.0));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].close, 2.0);
    }
}
