//! Fibonacci retracement levels

use crate::models::candle::Candle;

pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Retracement levels between the swing high/low of a lookback window.
/// Ratio 0.0 maps to the swing low, 1.0 to the swing high.
#[derive(Debug, Clone)]
pub struct FibLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    pub levels: Vec<(f64, f64)>,
}

impl FibLevels {
    /// Where the price sits between swing low (0) and swing high (1).
    pub fn position_of(&self, price: f64) -> f64 {
        let range = self.swing_high - self.swing_low;
        if range == 0.0 {
            return 0.5;
        }
        (price - self.swing_low) / range
    }

    /// Level prices sorted ascending.
    pub fn sorted_prices(&self) -> Vec<f64> {
        let mut prices: Vec<f64> = self.levels.iter().map(|(_, p)| *p).collect();
        prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        prices
    }
}

/// Standard retracement ratios over the last `lookback` candles.
pub fn calculate_fibonacci(candles: &[Candle], lookback: usize) -> Option<FibLevels> {
    if candles.len() < 2 {
        return None;
    }
    let window = &candles[candles.len().saturating_sub(lookback)..];
    let swing_high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let swing_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    if swing_high <= swing_low {
        return None;
    }

    let levels = FIB_RATIOS
        .iter()
        .map(|&ratio| (ratio, swing_low + (swing_high - swing_low) * ratio))
        .collect();

    Some(FibLevels {
        swing_high,
        swing_low,
        levels,
    })
}

/// Fibonacci levels over the default 100-bar lookback.
pub fn calculate_fibonacci_default(candles: &[Candle]) -> Option<FibLevels> {
    calculate_fibonacci(candles, 100)
}
