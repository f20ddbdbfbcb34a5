//! Unit tests for momentum indicators (RSI, MACD, StochRSI)

use chrono::Utc;
use hypersignals::indicators::momentum::{
    calculate_macd_default, calculate_rsi, calculate_stoch_rsi_default, rsi_series,
};
use hypersignals::models::candle::Candle;

fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .map(|&c| Candle::new(c, c, c, c, 1000.0, Utc::now()))
        .collect()
}

fn rising_closes(count: usize) -> Vec<f64> {
    (0..count).map(|i| 100.0 + i as f64).collect()
}

fn compounding_closes(count: usize, ratio: f64) -> Vec<f64> {
    (0..count).map(|i| 100.0 * ratio.powi(i as i32)).collect()
}

#[test]
fn test_rsi_insufficient_data() {
    let candles = candles_from_closes(&rising_closes(10));
    assert!(rsi_series(&candles, 14).is_empty());
}

#[test]
fn test_rsi_bounded() {
    let mut closes = rising_closes(30);
    closes.extend((0..30).map(|i| 129.0 - i as f64));
    let candles = candles_from_closes(&closes);
    for rsi in rsi_series(&candles, 14) {
        assert!((0.0..=100.0).contains(&rsi));
    }
}

#[test]
fn test_rsi_all_gains_is_100() {
    let candles = candles_from_closes(&rising_closes(40));
    let rsi = calculate_rsi(&candles, 14).unwrap();
    assert_eq!(rsi, 100.0);
}

#[test]
fn test_rsi_all_losses_near_zero() {
    let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
    let candles = candles_from_closes(&closes);
    let rsi = calculate_rsi(&candles, 14).unwrap();
    assert!(rsi < 1.0);
}

#[test]
fn test_macd_insufficient_data() {
    let candles = candles_from_closes(&rising_closes(20));
    assert!(calculate_macd_default(&candles).is_none());
}

#[test]
fn test_macd_histogram_identity() {
    let mut closes = rising_closes(60);
    closes.extend((0..40).map(|i| 159.0 - 0.5 * i as f64));
    let candles = candles_from_closes(&closes);
    let series = calculate_macd_default(&candles).unwrap();
    for i in 0..series.macd.len() {
        if let (Some(signal), Some(histogram)) = (series.signal[i], series.histogram[i]) {
            assert!((histogram - (series.macd[i] - signal)).abs() < 1e-9);
        }
    }
}

#[test]
fn test_macd_positive_in_uptrend() {
    // Compounding growth keeps MACD rising, so the lagging signal line
    // stays strictly below it.
    let candles = candles_from_closes(&compounding_closes(80, 1.01));
    let series = calculate_macd_default(&candles).unwrap();
    assert!(series.last_macd().unwrap() > 0.0);
    assert!(series.last_macd().unwrap() > series.last_signal().unwrap());
}

#[test]
fn test_macd_converges_to_signal_on_linear_ramp() {
    // A constant-step ramp settles both EMAs onto fixed offsets: MACD
    // flattens and the signal line lands on top of it, give or take
    // float noise.
    let candles = candles_from_closes(&rising_closes(100));
    let series = calculate_macd_default(&candles).unwrap();
    let macd = series.last_macd().unwrap();
    let signal = series.last_signal().unwrap();
    assert!((macd - signal).abs() < 1e-9 * macd.abs().max(1.0));
}

#[test]
fn test_stoch_rsi_insufficient_data() {
    let candles = candles_from_closes(&rising_closes(20));
    assert!(calculate_stoch_rsi_default(&candles).is_none());
}

#[test]
fn test_stoch_rsi_bounded() {
    let mut closes = rising_closes(40);
    closes.extend((0..40).map(|i| 139.0 - 1.5 * i as f64));
    let candles = candles_from_closes(&closes);
    let stoch = calculate_stoch_rsi_default(&candles).unwrap();
    assert!((0.0..=100.0).contains(&stoch.k));
    assert!((0.0..=100.0).contains(&stoch.d));
}
