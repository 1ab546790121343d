/// Exponential moving average over a close-price series, aligned 1:1 with
/// the input. Entries with `i < length` are `None` (insufficient lookback).
///
/// The recurrence reseeds from the plain mean of the trailing `length`
/// values on every step instead of compounding the prior EMA value:
///
/// ```text
/// seed   = mean(source[i-length .. i))
/// k      = 2 / (length + 1)
/// ema[i] = source[i] * k + seed * (1 - k)
/// ```
///
/// Downstream MACD-spread and STC series depend on this exact recurrence;
/// do not swap in the compounding form, which lives in
/// `macd::ema_standard`.
pub fn ema(source: &[f64], length: usize) -> Vec<Option<f64>> {
    source
        .iter()
        .enumerate()
        .map(|(i, &val)| {
            if length == 0 || i < length {
                return None;
            }
            let seed = source[i - length..i].iter().sum::<f64>() / length as f64;
            let k = 2.0 / (length as f64 + 1.0);
            Some(val * k + seed * (1.0 - k))
        })
        .collect()
}

/// Simple moving average, aligned 1:1 with the input. Defined once a full
/// window of `length` values ending at `i` exists.
pub fn sma(source: &[f64], length: usize) -> Vec<Option<f64>> {
    source
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if length == 0 || i + 1 < length {
                return None;
            }
            let window = &source[i + 1 - length..=i];
            Some(window.iter().sum::<f64>() / length as f64)
        })
        .collect()
}
