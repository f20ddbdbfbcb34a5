//! Unit tests for per-indicator scoring heuristics

use chrono::Utc;
use hypersignals::models::candle::Candle;
use hypersignals::models::signal::IndicatorKind;
use hypersignals::signals::scoring::score_indicator;

fn trend_candles(count: usize, base: f64, pct_per_bar: f64) -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut price = base;
    for _ in 0..count {
        candles.push(Candle::new(
            price,
            price * 1.001,
            price * 0.999,
            price,
            1000.0,
            Utc::now(),
        ));
        price *= 1.0 + pct_per_bar;
    }
    candles
}

/// Flat for `flat` bars, then compounding `pct_per_bar` moves.
fn turn_candles(flat: usize, trend: usize, pct_per_bar: f64) -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut price = 100.0;
    for i in 0..flat + trend {
        candles.push(Candle::new(
            price,
            price * 1.001,
            price * 0.999,
            price,
            1000.0,
            Utc::now(),
        ));
        if i >= flat {
            price *= 1.0 + pct_per_bar;
        }
    }
    candles
}

#[test]
fn test_all_scores_bounded() {
    let candles = trend_candles(250, 100.0, 0.01);
    for kind in IndicatorKind::ALL {
        if let Some(scored) = score_indicator(kind, &candles, 0.1) {
            assert!(
                (-1.0..=1.0).contains(&scored.score),
                "{:?} out of bounds: {}",
                kind,
                scored.score
            );
            assert!(!scored.detail.is_empty());
            assert_eq!(scored.weight, 0.1);
        }
    }
}

#[test]
fn test_ema_score_bullish_in_uptrend() {
    let candles = trend_candles(250, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Ema, &candles, 0.12).unwrap();
    // Fast above slow, mid above 50, price above the 200.
    assert!((scored.score - 0.8).abs() < 1e-9);
}

#[test]
fn test_ema_score_bearish_in_downtrend() {
    let candles = trend_candles(250, 100.0, -0.01);
    let scored = score_indicator(IndicatorKind::Ema, &candles, 0.12).unwrap();
    assert!((scored.score + 0.8).abs() < 1e-9);
}

#[test]
fn test_ema_score_insufficient_data() {
    let candles = trend_candles(10, 100.0, 0.01);
    assert!(score_indicator(IndicatorKind::Ema, &candles, 0.12).is_none());
}

#[test]
fn test_rsi_score_overbought_is_bearish() {
    let candles = trend_candles(100, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Rsi, &candles, 0.1).unwrap();
    assert!(scored.score < 0.0);
}

#[test]
fn test_rsi_score_oversold_is_bullish() {
    let candles = trend_candles(100, 100.0, -0.01);
    let scored = score_indicator(IndicatorKind::Rsi, &candles, 0.1).unwrap();
    assert!(scored.score > 0.0);
}

#[test]
fn test_macd_score_follows_momentum_turn() {
    // A fresh move after a flat stretch pulls MACD away from its lagging
    // signal line in the move's direction.
    let bull = score_indicator(IndicatorKind::Macd, &turn_candles(60, 30, 0.01), 0.12).unwrap();
    let bear = score_indicator(IndicatorKind::Macd, &turn_candles(60, 30, -0.01), 0.12).unwrap();
    assert!(bull.score > 0.0);
    assert!(bear.score < 0.0);
}

#[test]
fn test_macd_score_flat_when_lines_converge() {
    // A constant-step ramp drives MACD and its signal line to the same
    // offset; the residual float gap between them must not be read as a
    // directional call.
    let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
    let candles: Vec<Candle> = closes
        .iter()
        .map(|&c| Candle::new(c, c, c, c, 1000.0, Utc::now()))
        .collect();
    let scored = score_indicator(IndicatorKind::Macd, &candles, 0.12).unwrap();
    assert_eq!(scored.score, 0.0);
    assert!(scored.detail.contains("tracking"));
}

#[test]
fn test_adx_score_gated_when_weak() {
    // Alternating prices keep directional movement balanced.
    let mut candles = Vec::new();
    for i in 0..100 {
        let p = if i % 2 == 0 { 100.0 } else { 100.2 };
        candles.push(Candle::new(p, p + 0.1, p - 0.1, p, 1000.0, Utc::now()));
    }
    let scored = score_indicator(IndicatorKind::Adx, &candles, 0.08).unwrap();
    assert_eq!(scored.score, 0.0);
}

#[test]
fn test_adx_score_directional_in_trend() {
    let candles = trend_candles(100, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Adx, &candles, 0.08).unwrap();
    assert_eq!(scored.score, 0.5);
}

#[test]
fn test_obv_score_confirms_trend() {
    let candles = trend_candles(60, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Obv, &candles, 0.06).unwrap();
    assert_eq!(scored.score, 0.4);
}

#[test]
fn test_vwap_score_capped() {
    let candles = trend_candles(250, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Vwap, &candles, 0.08).unwrap();
    assert_eq!(scored.score, 0.5);
}

#[test]
fn test_fibonacci_score_at_range_top_is_bearish() {
    let candles = trend_candles(120, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Fibonacci, &candles, 0.06).unwrap();
    assert_eq!(scored.score, -0.3);
}

#[test]
fn test_atr_score_is_informational_only() {
    let candles = trend_candles(60, 100.0, 0.01);
    let scored = score_indicator(IndicatorKind::Atr, &candles, 0.05).unwrap();
    assert_eq!(scored.score, 0.0);
    assert!(scored.detail.contains("TP/SL"));
}
