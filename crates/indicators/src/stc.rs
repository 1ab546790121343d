use crate::ema::ema;

/// Direction of the stochastic window used for the %K pass.
///
/// %K is computed against the extrema of a *forward-looking* window
/// `[i, i+length)`, which introduces look-ahead into the series. Consumers
/// are tuned against exactly that output, so the window direction is
/// selectable here instead of silently changed; `Forward` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KWindow {
    #[default]
    Forward,
    /// Conventional trailing window `(i-length, i]`.
    Trailing,
}

/// Schaff Trend Cycle: stochastic normalization applied twice to an
/// EMA-spread, each pass exponentially smoothed by `factor`.
///
/// Built on the reseeding `ema` (see `crate::ema`), not the standard
/// recurrence. Output is the doubly-smoothed %D series aligned 1:1 with the
/// source; entries are `None` until the slow EMA lookback is satisfied, and
/// defined values lie in [0, 100].
#[derive(Debug, Clone)]
pub struct Stc {
    pub length: usize,
    pub fast_length: usize,
    pub slow_length: usize,
    pub factor: f64,
    pub k_window: KWindow,
}

impl Default for Stc {
    fn default() -> Self {
        Self {
            length: 10,
            fast_length: 23,
            slow_length: 50,
            factor: 0.5,
            k_window: KWindow::Forward,
        }
    }
}

impl Stc {
    /// Compute the STC series for `source` (oldest first).
    ///
    /// Total for any input: short or empty series yield all-`None`, and a
    /// zero-range stochastic window carries the previous value forward (0 if
    /// none exists yet) instead of dividing by zero.
    pub fn series(&self, source: &[f64]) -> Vec<Option<f64>> {
        let ema_fast = ema(source, self.fast_length);
        let ema_slow = ema(source, self.slow_length);

        let spread: Vec<Option<f64>> = ema_fast
            .iter()
            .zip(&ema_slow)
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();

        let n = source.len();
        let mut out = vec![None; n];

        let mut prev_k: Option<f64> = None;
        let mut prev_smoothed_k: Option<f64> = None;
        let mut prev_d: Option<f64> = None;
        let mut prev_smoothed_d: Option<f64> = None;
        // Running extrema of the smoothed %K history (the %D pass normalizes
        // against the entire history up to i, not a fixed window).
        let mut k_hist_min = f64::INFINITY;
        let mut k_hist_max = f64::NEG_INFINITY;

        for i in 0..n {
            let Some(m) = spread[i] else { continue };

            let (min, max) = match self.k_window {
                KWindow::Forward => window_extrema(&spread, i, (i + self.length).min(n)),
                KWindow::Trailing => {
                    window_extrema(&spread, (i + 1).saturating_sub(self.length), i + 1)
                }
            };

            let k = if max - min > 0.0 {
                (m - min) / (max - min) * 100.0
            } else {
                prev_k.unwrap_or(0.0)
            };
            prev_k = Some(k);

            let smoothed_k = match prev_smoothed_k {
                None => k,
                Some(prev) => prev + self.factor * (k - prev),
            };
            prev_smoothed_k = Some(smoothed_k);
            k_hist_min = k_hist_min.min(smoothed_k);
            k_hist_max = k_hist_max.max(smoothed_k);

            let d = if k_hist_max - k_hist_min > 0.0 {
                (smoothed_k - k_hist_min) / (k_hist_max - k_hist_min) * 100.0
            } else {
                prev_d.unwrap_or(0.0)
            };
            prev_d = Some(d);

            let smoothed_d = match prev_smoothed_d {
                None => d,
                Some(prev) => prev + self.factor * (d - prev),
            };
            prev_smoothed_d = Some(smoothed_d);

            out[i] = Some(smoothed_d);
        }

        out
    }
}

/// Min/max over the defined entries of `series[start..end)`.
/// Returns (INFINITY, NEG_INFINITY) when the range holds no defined value.
fn window_extrema(series: &[Option<f64>], start: usize, end: usize) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in series[start..end].iter().flatten() {
        min = min.min(*v);
        max = max.max(*v);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stc_aligned_and_undefined_before_slow_lookback() {
        let source: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let stc = Stc::default();
        let out = stc.series(&source);
        assert_eq!(out.len(), source.len());
        for (i, v) in out.iter().enumerate() {
            if i < stc.slow_length {
                assert!(v.is_none(), "stc[{i}] should be undefined");
            } else {
                assert!(v.is_some(), "stc[{i}] should be defined");
            }
        }
    }

    #[test]
    fn stc_empty_and_short_input_never_errors() {
        let stc = Stc::default();
        assert!(stc.series(&[]).is_empty());
        let out = stc.series(&[1.0, 2.0, 3.0]);
        assert!(out.iter().all(|v| v.is_none()));
    }

    #[test]
    fn stc_flat_series_carries_zero_forward() {
        // Constant prices: spread is identically zero, every window has zero
        // range, so %K carries forward its 0 seed all the way through.
        let source = vec![50.0; 80];
        let out = Stc::default().series(&source);
        for v in out.iter().flatten() {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn stc_values_within_bounds_on_trend() {
        let source: Vec<f64> = (0..120)
            .map(|i| 100.0 + i as f64 * 0.7 + (i as f64 * 0.9).sin() * 3.0)
            .collect();
        for v in Stc::default().series(&source).iter().flatten() {
            assert!((0.0..=100.0).contains(v), "stc out of range: {v}");
        }
    }

    #[test]
    fn trailing_window_differs_from_forward() {
        let source: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 10.0 + i as f64 * 0.1)
            .collect();
        let forward = Stc::default().series(&source);
        let trailing = Stc {
            k_window: KWindow::Trailing,
            ..Stc::default()
        }
        .series(&source);
        assert_eq!(forward.len(), trailing.len());
        assert_ne!(forward, trailing);
    }
}
