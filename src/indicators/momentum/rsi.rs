//! RSI (Relative Strength Index) indicator
//!
//! RSI = 100 - (100 / (1 + RS)), RS = Wilder-smoothed avg gain / avg loss.

use crate::models::candle::Candle;

/// RSI series over candle closes. The returned vector holds one value per
/// bar after the warm-up (`period + 1` candles); empty when history is
/// too short.
pub fn rsi_series(candles: &[Candle], period: usize) -> Vec<f64> {
    if candles.len() < period + 1 {
        return Vec::new();
    }

    let mut gains = Vec::with_capacity(candles.len() - 1);
    let mut losses = Vec::with_capacity(candles.len() - 1);
    for pair in candles.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(gains.len() - period + 1);
    out.push(rsi_value(avg_gain, avg_loss));
    for i in period..gains.len() {
        avg_gain = (avg_gain * (period as f64 - 1.0) + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + losses[i]) / period as f64;
        out.push(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Latest RSI value.
pub fn calculate_rsi(candles: &[Candle], period: usize) -> Option<f64> {
    rsi_series(candles, period).last().copied()
}
