//! Unit tests for structure indicators (Fibonacci, support/resistance)

use chrono::Utc;
use hypersignals::indicators::structure::{
    calculate_fibonacci, calculate_fibonacci_default, calculate_support_resistance,
};
use hypersignals::models::candle::Candle;

fn candle(high: f64, low: f64, close: f64) -> Candle {
    Candle::new(close, high, low, close, 1000.0, Utc::now())
}

#[test]
fn test_fibonacci_levels_span_swing_range() {
    let candles: Vec<Candle> = (0..50)
        .map(|i| {
            let p = 100.0 + i as f64;
            candle(p + 1.0, p - 1.0, p)
        })
        .collect();
    let fib = calculate_fibonacci_default(&candles).unwrap();
    assert_eq!(fib.swing_low, 99.0);
    assert_eq!(fib.swing_high, 150.0);
    let prices = fib.sorted_prices();
    assert_eq!(prices.len(), 7);
    assert_eq!(prices[0], fib.swing_low);
    assert_eq!(prices[6], fib.swing_high);
    // 50% retracement in the middle of the range.
    assert!((prices[3] - 124.5).abs() < 1e-9);
}

#[test]
fn test_fibonacci_position_of() {
    let candles: Vec<Candle> = (0..30).map(|_| candle(200.0, 100.0, 150.0)).collect();
    let fib = calculate_fibonacci_default(&candles).unwrap();
    assert!((fib.position_of(150.0) - 0.5).abs() < 1e-9);
    assert_eq!(fib.position_of(100.0), 0.0);
    assert_eq!(fib.position_of(200.0), 1.0);
}

#[test]
fn test_fibonacci_none_without_range() {
    let candles: Vec<Candle> = (0..30).map(|_| candle(100.0, 100.0, 100.0)).collect();
    assert!(calculate_fibonacci(&candles, 30).is_none());
    assert!(calculate_fibonacci(&candles[..1], 30).is_none());
}

#[test]
fn test_support_resistance_brackets_price() {
    // A V-shape with a clear low pivot, ending mid-range so clustered
    // levels exist on both sides.
    let mut candles = Vec::new();
    for i in 0..10 {
        let p = 120.0 - i as f64 * 2.0;
        candles.push(candle(p + 0.5, p - 0.5, p));
    }
    for i in 0..6 {
        let p = 102.0 + i as f64 * 2.0;
        candles.push(candle(p + 0.5, p - 0.5, p));
    }
    let sr = calculate_support_resistance(&candles).unwrap();
    let price = candles.last().unwrap().close;
    if let Some(support) = sr.support {
        assert!(support < price);
    }
    if let Some(resistance) = sr.resistance {
        assert!(resistance > price);
    }
    assert!(sr.support.is_some() || sr.resistance.is_some());
}

#[test]
fn test_support_resistance_insufficient_data() {
    let candles: Vec<Candle> = (0..3).map(|_| candle(101.0, 99.0, 100.0)).collect();
    assert!(calculate_support_resistance(&candles).is_none());
}
