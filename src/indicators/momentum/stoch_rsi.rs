//! Stochastic RSI indicator
//!
//! Min-max normalizes RSI over a rolling window, then applies double SMA
//! smoothing to produce %K and %D.

use crate::models::candle::Candle;

use super::rsi::rsi_series;

#[derive(Debug, Clone, Copy)]
pub struct StochRsi {
    pub k: f64,
    pub d: f64,
}

pub fn calculate_stoch_rsi(
    candles: &[Candle],
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> Option<StochRsi> {
    let rsi = rsi_series(candles, rsi_period);
    if rsi.len() < stoch_period {
        return None;
    }

    let mut raw = Vec::with_capacity(rsi.len() - stoch_period + 1);
    for window in rsi.windows(stoch_period) {
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let current = window[window.len() - 1];
        let value = if max == min {
            50.0
        } else {
            (current - min) / (max - min) * 100.0
        };
        raw.push(value);
    }

    let k_series = rolling_sma(&raw, k_smooth);
    if k_series.is_empty() {
        return None;
    }
    let d_series = rolling_sma(&k_series, d_smooth);

    let k = *k_series.last()?;
    let d = d_series.last().copied().unwrap_or(k);
    Some(StochRsi { k, d })
}

/// Stochastic RSI with the conventional (14, 14, 3, 3) parameters.
pub fn calculate_stoch_rsi_default(candles: &[Candle]) -> Option<StochRsi> {
    calculate_stoch_rsi(candles, 14, 14, 3, 3)
}

fn rolling_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}
