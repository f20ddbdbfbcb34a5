//! EMA (Exponential Moving Average) indicator

use crate::common::math;
use crate::models::candle::Candle;

/// Aligned EMA series over candle closes. Indices before the warm-up
/// point are `None`.
pub fn ema_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    math::ema_series(&closes, period)
}

/// Latest EMA value for a specific period.
pub fn calculate_ema(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period {
        return None;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    math::ema(&closes, period)
}
