//! Bollinger Bands indicator

use crate::common::math;
use crate::models::candle::Candle;

#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Band width relative to the middle band; small values indicate a
    /// volatility squeeze.
    pub fn bandwidth(&self) -> f64 {
        if self.middle == 0.0 {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle
    }
}

/// Rolling mean ± `std_dev_multiplier` standard deviations over the last
/// `period` closes.
pub fn calculate_bollinger(
    candles: &[Candle],
    period: usize,
    std_dev_multiplier: f64,
) -> Option<BollingerBands> {
    if candles.len() < period {
        return None;
    }
    let closes: Vec<f64> = candles[candles.len() - period..]
        .iter()
        .map(|c| c.close)
        .collect();
    let middle = closes.iter().sum::<f64>() / period as f64;
    let band = math::std_dev(&closes) * std_dev_multiplier;
    Some(BollingerBands {
        upper: middle + band,
        middle,
        lower: middle - band,
    })
}

/// Bollinger Bands with the conventional (20, 2σ) parameters.
pub fn calculate_bollinger_default(candles: &[Candle]) -> Option<BollingerBands> {
    calculate_bollinger(candles, 20, 2.0)
}
