//! VWAP (Volume-Weighted Average Price) indicator

use crate::models::candle::Candle;

/// Cumulative (typical price × volume) / cumulative volume over the whole
/// supplied window. There is no session reset; callers bound the window
/// they pass in.
pub fn calculate_vwap(candles: &[Candle]) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }
    let mut pv = 0.0;
    let mut volume = 0.0;
    for candle in candles {
        pv += candle.typical_price() * candle.volume;
        volume += candle.volume;
    }
    if volume == 0.0 {
        return None;
    }
    Some(pv / volume)
}
