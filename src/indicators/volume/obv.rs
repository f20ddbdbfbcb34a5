//! OBV (On-Balance Volume) indicator

use crate::models::candle::Candle;

/// Cumulative signed volume by close-to-close direction. One value per
/// candle; empty input yields an empty series.
pub fn obv_series(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut obv = 0.0;
    let mut prev_close: Option<f64> = None;
    for candle in candles {
        if let Some(prev) = prev_close {
            if candle.close > prev {
                obv += candle.volume;
            } else if candle.close < prev {
                obv -= candle.volume;
            }
        }
        out.push(obv);
        prev_close = Some(candle.close);
    }
    out
}
