//! MACD (Moving Average Convergence Divergence) indicator

use crate::common::math;
use crate::models::candle::Candle;

/// MACD line, signal line, and histogram, aligned index-for-index over the
/// stretch where the MACD line is defined.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl MacdSeries {
    pub fn last_macd(&self) -> Option<f64> {
        self.macd.last().copied()
    }

    pub fn prev_macd(&self) -> Option<f64> {
        self.macd.iter().rev().nth(1).copied()
    }

    pub fn last_signal(&self) -> Option<f64> {
        math::last_value(&self.signal)
    }

    pub fn prev_signal(&self) -> Option<f64> {
        math::second_last_value(&self.signal)
    }

    pub fn last_histogram(&self) -> Option<f64> {
        math::last_value(&self.histogram)
    }

    pub fn prev_histogram(&self) -> Option<f64> {
        math::second_last_value(&self.histogram)
    }
}

/// MACD(fast, slow, signal) over candle closes. Returns `None` until
/// `slow + signal_period` candles are available.
pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Option<MacdSeries> {
    if candles.len() < slow + signal_period {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast_ema = math::ema_series(&closes, fast);
    let slow_ema = math::ema_series(&closes, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .filter_map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal = math::ema_series(&macd, signal_period);
    let histogram: Vec<Option<f64>> = macd
        .iter()
        .zip(signal.iter())
        .map(|(m, s)| s.map(|s| m - s))
        .collect();

    Some(MacdSeries {
        macd,
        signal,
        histogram,
    })
}

/// MACD with the conventional (12, 26, 9) parameters.
pub fn calculate_macd_default(candles: &[Candle]) -> Option<MacdSeries> {
    calculate_macd(candles, 12, 26, 9)
}
