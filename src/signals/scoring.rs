//! Per-indicator scoring heuristics.
//!
//! Every scorer maps raw indicator output to a bounded score in [-1, 1]
//! (positive is bullish) with a human-readable rationale. A scorer that
//! cannot compute on the given history returns `None` and is excluded
//! from the composite entirely, numerator and denominator both.

use crate::common::math;
use crate::indicators;
use crate::models::candle::Candle;
use crate::models::signal::{IndicatorKind, IndicatorScore};

const DIVERGENCE_LOOKBACK: usize = 10;
const OBV_LOOKBACK: usize = 20;
const ADX_TREND_THRESHOLD: f64 = 25.0;
const SQUEEZE_BANDWIDTH: f64 = 0.03;
const FIB_PROXIMITY: f64 = 0.005;

/// Scores a single indicator on the given candle history.
pub fn score_indicator(
    kind: IndicatorKind,
    candles: &[Candle],
    weight: f64,
) -> Option<IndicatorScore> {
    let (score, detail) = match kind {
        IndicatorKind::Ema => score_ema(candles)?,
        IndicatorKind::Rsi => score_rsi(candles)?,
        IndicatorKind::Macd => score_macd(candles)?,
        IndicatorKind::StochRsi => score_stoch_rsi(candles)?,
        IndicatorKind::BollingerBands => score_bollinger(candles)?,
        IndicatorKind::Adx => score_adx(candles)?,
        IndicatorKind::Ichimoku => score_ichimoku(candles)?,
        IndicatorKind::Obv => score_obv(candles)?,
        IndicatorKind::Vwap => score_vwap(candles)?,
        IndicatorKind::Fibonacci => score_fibonacci(candles)?,
        IndicatorKind::VolumeProfile => score_volume_profile(candles)?,
        IndicatorKind::Atr => score_atr(candles)?,
    };
    Some(IndicatorScore {
        kind,
        score: math::clamp(score, -1.0, 1.0),
        weight,
        detail,
    })
}

/// EMA stack alignment plus 9/21 crossover. Needs the 9 and 21 EMAs;
/// the 50 and 200 components only contribute when history allows.
fn score_ema(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let ema9_series = indicators::ema_series(candles, 9);
    let ema21_series = indicators::ema_series(candles, 21);
    let ema9 = math::last_value(&ema9_series)?;
    let ema21 = math::last_value(&ema21_series)?;

    let mut score = if ema9 > ema21 { 0.3 } else { -0.3 };
    let mut notes = vec![if ema9 > ema21 {
        "EMA 9 above EMA 21".to_string()
    } else {
        "EMA 9 below EMA 21".to_string()
    }];

    if let Some(ema50) = indicators::calculate_ema(candles, 50) {
        score += if ema21 > ema50 { 0.2 } else { -0.2 };
    }
    if let Some(ema200) = indicators::calculate_ema(candles, 200) {
        if price > ema200 {
            score += 0.3;
            notes.push("price above EMA 200".to_string());
        } else {
            score -= 0.3;
            notes.push("price below EMA 200".to_string());
        }
    }

    if let (Some(prev9), Some(prev21)) = (
        math::second_last_value(&ema9_series),
        math::second_last_value(&ema21_series),
    ) {
        if prev9 <= prev21 && ema9 > ema21 {
            score += 0.2;
            notes.push("bullish 9/21 crossover".to_string());
        } else if prev9 >= prev21 && ema9 < ema21 {
            score -= 0.2;
            notes.push("bearish 9/21 crossover".to_string());
        }
    }

    Some((score, notes.join(", ")))
}

/// Overbought/oversold zones plus a 10-bar price/RSI divergence check.
fn score_rsi(candles: &[Candle]) -> Option<(f64, String)> {
    let series = indicators::rsi_series(candles, 14);
    let rsi = *series.last()?;

    let mut score = if rsi < 30.0 {
        0.7
    } else if rsi < 40.0 {
        0.3
    } else if rsi > 70.0 {
        -0.7
    } else if rsi > 60.0 {
        -0.3
    } else {
        0.0
    };
    let mut detail = format!("RSI {:.1}", rsi);

    if series.len() > DIVERGENCE_LOOKBACK && candles.len() > DIVERGENCE_LOOKBACK {
        let prev_rsi = series[series.len() - 1 - DIVERGENCE_LOOKBACK];
        let price = candles[candles.len() - 1].close;
        let prev_price = candles[candles.len() - 1 - DIVERGENCE_LOOKBACK].close;
        if price < prev_price && rsi > prev_rsi {
            score += 0.3;
            detail.push_str(", bullish divergence");
        } else if price > prev_price && rsi < prev_rsi {
            score -= 0.3;
            detail.push_str(", bearish divergence");
        }
    }

    Some((score, detail))
}

/// MACD vs signal line, histogram expansion, and line crossover.
fn score_macd(candles: &[Candle]) -> Option<(f64, String)> {
    let series = indicators::calculate_macd_default(candles)?;
    let macd = series.last_macd()?;
    let signal = series.last_signal()?;

    // Steady trends drive both lines onto the same track; a float-noise
    // gap between them is not a directional read.
    let tol = 1e-9 * macd.abs().max(signal.abs()).max(1.0);

    let mut score = 0.0;
    let mut notes = Vec::new();
    if macd > signal + tol {
        score += 0.4;
        notes.push("MACD above signal".to_string());
    } else if macd < signal - tol {
        score -= 0.4;
        notes.push("MACD below signal".to_string());
    } else {
        notes.push("MACD tracking signal".to_string());
    }

    if let (Some(hist), Some(prev_hist)) = (series.last_histogram(), series.prev_histogram()) {
        if hist.abs() > tol && hist.abs() > prev_hist.abs() && hist.signum() == prev_hist.signum()
        {
            score += if hist > 0.0 { 0.3 } else { -0.3 };
            notes.push("histogram expanding".to_string());
        }
    }

    if let (Some(prev_macd), Some(prev_signal)) = (series.prev_macd(), series.prev_signal()) {
        if prev_macd <= prev_signal && macd > signal + tol {
            score += 0.3;
            notes.push("bullish crossover".to_string());
        } else if prev_macd >= prev_signal && macd < signal - tol {
            score -= 0.3;
            notes.push("bearish crossover".to_string());
        }
    }

    Some((score, notes.join(", ")))
}

/// StochRSI %K extremes plus %K/%D relationship near the edges.
fn score_stoch_rsi(candles: &[Candle]) -> Option<(f64, String)> {
    let stoch = indicators::calculate_stoch_rsi_default(candles)?;

    let mut score = 0.0;
    if stoch.k < 20.0 {
        score += 0.6;
    } else if stoch.k > 80.0 {
        score -= 0.6;
    }
    if stoch.k > stoch.d && stoch.k < 30.0 {
        score += 0.4;
    } else if stoch.k < stoch.d && stoch.k > 70.0 {
        score -= 0.4;
    }

    Some((score, format!("K {:.1}, D {:.1}", stoch.k, stoch.d)))
}

/// Band touches revert, position inside the bands leans the other way.
fn score_bollinger(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let bands = indicators::calculate_bollinger_default(candles)?;

    let (score, mut detail) = if price <= bands.lower {
        (0.6, "price at lower band".to_string())
    } else if price >= bands.upper {
        (-0.6, "price at upper band".to_string())
    } else if price > bands.middle {
        (-0.1, "price above middle band".to_string())
    } else {
        (0.1, "price below middle band".to_string())
    };

    if bands.bandwidth() < SQUEEZE_BANDWIDTH {
        detail.push_str(", squeeze");
    }

    Some((score, detail))
}

/// Directional movement, gated on trend strength.
fn score_adx(candles: &[Candle]) -> Option<(f64, String)> {
    let adx = indicators::calculate_adx_default(candles)?;

    if adx.adx <= ADX_TREND_THRESHOLD {
        return Some((0.0, format!("ADX {:.1}, weak trend", adx.adx)));
    }
    let score = if adx.plus_di > adx.minus_di { 0.5 } else { -0.5 };
    let direction = if score > 0.0 { "bullish" } else { "bearish" };
    Some((score, format!("ADX {:.1}, {} trend", adx.adx, direction)))
}

/// Tenkan/kijun relationship, position versus the cloud, cloud color,
/// and TK crossover.
fn score_ichimoku(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let ichimoku = indicators::calculate_ichimoku_default(candles)?;

    let mut score = if ichimoku.tenkan > ichimoku.kijun { 0.25 } else { -0.25 };
    let mut notes = Vec::new();

    if let (Some(senkou_a), Some(senkou_b)) = (ichimoku.senkou_a, ichimoku.senkou_b) {
        let cloud_top = senkou_a.max(senkou_b);
        let cloud_bottom = senkou_a.min(senkou_b);
        if price > cloud_top {
            score += 0.4;
            notes.push("price above cloud");
        } else if price < cloud_bottom {
            score -= 0.4;
            notes.push("price below cloud");
        } else {
            notes.push("price inside cloud");
        }
        score += if senkou_a > senkou_b { 0.15 } else { -0.15 };
    }

    if let (Some(prev_tenkan), Some(prev_kijun)) = (ichimoku.prev_tenkan, ichimoku.prev_kijun) {
        if prev_tenkan <= prev_kijun && ichimoku.tenkan > ichimoku.kijun {
            score += 0.2;
            notes.push("bullish TK cross");
        } else if prev_tenkan >= prev_kijun && ichimoku.tenkan < ichimoku.kijun {
            score -= 0.2;
            notes.push("bearish TK cross");
        }
    }

    if notes.is_empty() {
        notes.push(if score > 0.0 { "tenkan above kijun" } else { "tenkan below kijun" });
    }
    Some((score, notes.join(", ")))
}

/// OBV trend over 20 bars against the price trend. Agreement confirms,
/// disagreement is a divergence and scores stronger.
fn score_obv(candles: &[Candle]) -> Option<(f64, String)> {
    if candles.len() <= OBV_LOOKBACK {
        return None;
    }
    let series = indicators::obv_series(candles);
    let obv = *series.last()?;
    let prev_obv = series[series.len() - 1 - OBV_LOOKBACK];
    let price = candles[candles.len() - 1].close;
    let prev_price = candles[candles.len() - 1 - OBV_LOOKBACK].close;

    let obv_up = obv > prev_obv;
    let price_up = price > prev_price;
    let (score, detail) = match (price_up, obv_up) {
        (true, true) => (0.4, "volume confirms uptrend"),
        (false, false) => (-0.4, "volume confirms downtrend"),
        (false, true) => (0.5, "bullish volume divergence"),
        (true, false) => (-0.5, "bearish volume divergence"),
    };
    Some((score, detail.to_string()))
}

/// Distance from VWAP, scaled and capped.
fn score_vwap(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let vwap = indicators::calculate_vwap(candles)?;
    let deviation = (price - vwap) / vwap;
    let score = math::clamp(deviation * 10.0, -0.5, 0.5);
    let side = if price > vwap { "above" } else { "below" };
    Some((score, format!("price {:.2}% {} VWAP", deviation.abs() * 100.0, side)))
}

/// Position within the swing range: deep retracements score long,
/// stretched positions score short.
fn score_fibonacci(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let fib = indicators::calculate_fibonacci_default(candles)?;
    let position = fib.position_of(price);

    let score = if position > 0.786 {
        -0.3
    } else if position > 0.618 {
        -0.1
    } else if position > 0.382 {
        0.0
    } else if position > 0.236 {
        0.2
    } else {
        0.4
    };

    let mut detail = format!("{:.0}% of swing range", position * 100.0);
    let near_level = fib
        .levels
        .iter()
        .find(|(_, level)| *level > 0.0 && ((price - level) / level).abs() < FIB_PROXIMITY);
    if let Some((ratio, _)) = near_level {
        detail.push_str(&format!(", near {:.1}% level", ratio * 100.0));
    }

    Some((score, detail))
}

/// Price relative to the highest-volume node.
fn score_volume_profile(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let profile = indicators::calculate_volume_profile_default(candles)?;
    let poc = profile.point_of_control()?.price_level;

    if price > poc {
        Some((0.2, format!("price above POC {:.2}", poc)))
    } else {
        Some((-0.2, format!("price below POC {:.2}", poc)))
    }
}

/// ATR never moves the composite; it feeds the TP/SL planner.
fn score_atr(candles: &[Candle]) -> Option<(f64, String)> {
    let price = candles.last()?.close;
    let atr = indicators::calculate_atr_default(candles)?;
    let atr_percent = atr / price * 100.0;
    Some((0.0, format!("ATR {:.2}% of price, used for TP/SL sizing", atr_percent)))
}
