//! ATR (Average True Range) indicator

use crate::common::math;
use crate::models::candle::Candle;

/// Wilder-smoothed ATR over the candle range. Returns `None` until
/// `period + 1` candles are available.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 {
        return None;
    }

    let trs: Vec<f64> = candles
        .windows(2)
        .map(|pair| math::true_range(pair[1].high, pair[1].low, pair[0].close))
        .collect();

    let mut atr = trs[..period].iter().sum::<f64>() / period as f64;
    for tr in &trs[period..] {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
    }
    Some(atr)
}

/// ATR with the conventional 14-bar period.
pub fn calculate_atr_default(candles: &[Candle]) -> Option<f64> {
    calculate_atr(candles, 14)
}
