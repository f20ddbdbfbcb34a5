//! ADX (Average Directional Index) indicator

use crate::common::math;
use crate::models::candle::Candle;

#[derive(Debug, Clone, Copy)]
pub struct Adx {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Wilder-smoothed directional movement → DX → Wilder-smoothed ADX.
/// Needs roughly two periods of history; returns `None` before that.
pub fn calculate_adx(candles: &[Candle], period: usize) -> Option<Adx> {
    if candles.len() < period * 2 + 1 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let mut trs = Vec::with_capacity(candles.len() - 1);

    for pair in candles.windows(2) {
        let up = pair[1].high - pair[0].high;
        let down = pair[0].low - pair[1].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        trs.push(math::true_range(pair[1].high, pair[1].low, pair[0].close));
    }

    // Wilder smoothing: seed with the first-period sum, then
    // smoothed = prev - prev/period + current.
    let mut sm_plus = plus_dm[..period].iter().sum::<f64>();
    let mut sm_minus = minus_dm[..period].iter().sum::<f64>();
    let mut sm_tr = trs[..period].iter().sum::<f64>();

    let mut dx_values = Vec::new();
    let mut plus_di = 0.0;
    let mut minus_di = 0.0;

    for i in period..trs.len() {
        sm_plus = sm_plus - sm_plus / period as f64 + plus_dm[i];
        sm_minus = sm_minus - sm_minus / period as f64 + minus_dm[i];
        sm_tr = sm_tr - sm_tr / period as f64 + trs[i];

        if sm_tr == 0.0 {
            continue;
        }
        plus_di = 100.0 * sm_plus / sm_tr;
        minus_di = 100.0 * sm_minus / sm_tr;
        let di_sum = plus_di + minus_di;
        if di_sum > 0.0 {
            dx_values.push(100.0 * (plus_di - minus_di).abs() / di_sum);
        }
    }

    if dx_values.len() < period {
        return None;
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / period as f64;
    for dx in &dx_values[period..] {
        adx = (adx * (period as f64 - 1.0) + dx) / period as f64;
    }

    Some(Adx {
        adx,
        plus_di,
        minus_di,
    })
}

/// ADX with the conventional 14-bar period.
pub fn calculate_adx_default(candles: &[Candle]) -> Option<Adx> {
    calculate_adx(candles, 14)
}
