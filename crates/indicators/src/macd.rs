/// MACD (Moving Average Convergence/Divergence) over a close-price series.
///
/// MACD line = EMA(fast) − EMA(slow), signal = EMA(macd_line, signal period),
/// histogram = macd − signal. Uses the standard SMA-seeded compounding EMA,
/// not the reseeding variant in `crate::ema`.
#[derive(Debug, Clone)]
pub struct Macd {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// One point of the MACD series, aligned with the source index.
/// Fields are `None` until their lookback is satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdPoint {
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "MACD fast period must be less than slow period");
        Self { fast, slow, signal }
    }

    /// Compute the full MACD series for `source` (oldest first).
    pub fn series(&self, source: &[f64]) -> Vec<MacdPoint> {
        let fast = ema_standard(source, self.fast);
        let slow = ema_standard(source, self.slow);

        let macd_line: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();

        // Signal line: standard EMA over the defined region of the MACD line.
        let first_defined = macd_line.iter().position(|v| v.is_some());
        let mut signal_line: Vec<Option<f64>> = vec![None; source.len()];
        if let Some(offset) = first_defined {
            let defined: Vec<f64> = macd_line[offset..].iter().map(|v| v.unwrap()).collect();
            for (j, v) in ema_standard(&defined, self.signal).into_iter().enumerate() {
                signal_line[offset + j] = v;
            }
        }

        macd_line
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| MacdPoint {
                macd: *m,
                signal: *s,
                histogram: match (m, s) {
                    (Some(m), Some(s)) => Some(m - s),
                    _ => None,
                },
            })
            .collect()
    }
}

/// Standard compounding EMA series: seeded with the SMA of the first
/// `period` values (defined from index `period - 1`), then
/// `ema = price * k + ema_prev * (1 - k)`.
pub(crate) fn ema_standard(source: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; source.len()];
    if period == 0 || source.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut value = source[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(value);

    for i in period..source.len() {
        value = source[i] * k + value * (1.0 - k);
        out[i] = Some(value);
    }
    out
}
