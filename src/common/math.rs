//! Shared numeric helpers used across the indicator library.

/// Simple moving average of the last `period` values, or `None` when the
/// series is too short.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[values.len() - period..].iter().sum::<f64>() / period as f64)
}

/// Full EMA series seeded with the SMA of the first `period` values.
/// The returned vector is aligned with the input; indices before
/// `period - 1` are `None`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = vec![None; values.len()];
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for (i, &v) in values.iter().enumerate().skip(period) {
        prev = v * k + prev * (1.0 - k);
        out[i] = Some(prev);
    }
    out
}

/// Last EMA value of the series.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).into_iter().flatten().last()
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    var.sqrt()
}

/// True range of a bar given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Last non-None value of an aligned indicator series.
pub fn last_value(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().flatten().next().copied()
}

/// Second-to-last non-None value of an aligned indicator series.
pub fn second_last_value(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().flatten().nth(1).copied()
}
