//! Ichimoku Cloud indicator

use crate::models::candle::Candle;

/// Ichimoku values applicable to the latest bar. The cloud spans are the
/// ones projected forward from `kijun_period` bars ago, i.e. the cloud the
/// current price trades against. `chikou` is the close the lagging span is
/// compared to (`kijun_period` bars back).
#[derive(Debug, Clone, Copy)]
pub struct Ichimoku {
    pub tenkan: f64,
    pub kijun: f64,
    pub prev_tenkan: Option<f64>,
    pub prev_kijun: Option<f64>,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
    pub chikou: Option<f64>,
}

fn midpoint(candles: &[Candle]) -> f64 {
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    (high + low) / 2.0
}

fn midpoint_at(candles: &[Candle], end: usize, period: usize) -> Option<f64> {
    if end + 1 < period {
        return None;
    }
    Some(midpoint(&candles[end + 1 - period..=end]))
}

pub fn calculate_ichimoku(
    candles: &[Candle],
    tenkan_period: usize,
    kijun_period: usize,
    senkou_period: usize,
) -> Option<Ichimoku> {
    if candles.len() < kijun_period {
        return None;
    }

    let last = candles.len() - 1;
    let tenkan = midpoint_at(candles, last, tenkan_period)?;
    let kijun = midpoint_at(candles, last, kijun_period)?;
    let prev_tenkan = last
        .checked_sub(1)
        .and_then(|i| midpoint_at(candles, i, tenkan_period));
    let prev_kijun = last
        .checked_sub(1)
        .and_then(|i| midpoint_at(candles, i, kijun_period));

    // Cloud at the current bar was projected from kijun_period bars back.
    let cloud_origin = last.checked_sub(kijun_period);
    let senkou_a = cloud_origin.and_then(|i| {
        let t = midpoint_at(candles, i, tenkan_period)?;
        let k = midpoint_at(candles, i, kijun_period)?;
        Some((t + k) / 2.0)
    });
    let senkou_b = cloud_origin.and_then(|i| midpoint_at(candles, i, senkou_period));
    let chikou = cloud_origin.map(|i| candles[i].close);

    Some(Ichimoku {
        tenkan,
        kijun,
        prev_tenkan,
        prev_kijun,
        senkou_a,
        senkou_b,
        chikou,
    })
}

/// Ichimoku with the conventional (9, 26, 52) parameters.
pub fn calculate_ichimoku_default(candles: &[Candle]) -> Option<Ichimoku> {
    calculate_ichimoku(candles, 9, 26, 52)
}
