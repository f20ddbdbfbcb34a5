//! Unit tests for the walk-forward backtester

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use hypersignals::backtest::engine::{run_backtest, MIN_BACKTEST_CANDLES, WARMUP_BARS};
use hypersignals::config::{BacktestConfig, IndicatorWeights, SignalConfig};
use hypersignals::error::EngineError;
use hypersignals::models::candle::Candle;
use hypersignals::models::position::CloseReason;
use hypersignals::models::signal::IndicatorKind;

fn trend_candles(count: usize, base: f64, pct_per_bar: f64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut candles = Vec::new();
    let mut price = base;
    for i in 0..count {
        candles.push(Candle::new(
            price,
            price * 1.001,
            price * 0.999,
            price,
            1000.0,
            start + Duration::hours(4 * i as i64),
        ));
        price *= 1.0 + pct_per_bar;
    }
    candles
}

fn flat_candles(count: usize, price: f64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            Candle::new(
                price,
                price,
                price,
                price,
                1000.0,
                start + Duration::hours(4 * i as i64),
            )
        })
        .collect()
}

fn ema_only_config() -> SignalConfig {
    SignalConfig {
        indicator_weights: IndicatorWeights(BTreeMap::from([(IndicatorKind::Ema, 1.0)])),
        ..SignalConfig::default()
    }
}

#[test]
fn test_backtest_rejects_short_history() {
    let candles = trend_candles(MIN_BACKTEST_CANDLES - 1, 100.0, 0.01);
    let err = run_backtest(&candles, &BacktestConfig::default(), &ema_only_config()).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { .. }));
}

#[test]
fn test_backtest_uptrend_wins() {
    // A relentless uptrend with EMA-only weights: every long hits its
    // take-profit before the stop can be reached.
    let candles = trend_candles(300, 100.0, 0.01);
    let result = run_backtest(&candles, &BacktestConfig::default(), &ema_only_config()).unwrap();

    assert!(result.total_trades >= 5);
    assert_eq!(result.losses, 0);
    assert!(result.wins > 0);
    // A final trade force-closed at the end may settle flat, so the win
    // rate can dip just below 1.
    assert!(result.win_rate > 0.9);
    assert!(result.final_balance > result.config.starting_balance);
    assert!(result.total_return_pct > 0.0);
    assert!(result.profit_factor.is_infinite());
    assert_eq!(result.max_consecutive_losses, 0);
    assert!(result.max_consecutive_wins >= result.wins.min(1));
}

#[test]
fn test_backtest_accounting_identity() {
    let candles = trend_candles(300, 100.0, 0.01);
    let result = run_backtest(&candles, &BacktestConfig::default(), &ema_only_config()).unwrap();

    let pnl_sum: f64 = result.trades.iter().map(|t| t.pnl_dollar).sum();
    let expected = result.config.starting_balance + pnl_sum;
    assert!(
        (result.final_balance - expected).abs() < 1e-6,
        "final {} vs expected {}",
        result.final_balance,
        expected
    );
}

#[test]
fn test_backtest_no_signal_before_warmup() {
    let candles = trend_candles(300, 100.0, 0.01);
    let result = run_backtest(&candles, &BacktestConfig::default(), &ema_only_config()).unwrap();
    let warmup_end = candles[WARMUP_BARS].time;
    for trade in &result.trades {
        assert!(trade.entry_time >= warmup_end);
    }
}

#[test]
fn test_backtest_scores_trailing_window_only() {
    // Stale flat history at a far higher price level must roll out of
    // the scoring window instead of anchoring VWAP forever: once the
    // window holds only uptrend bars, every entry is a long.
    let mut candles = flat_candles(200, 10_000.0);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = 100.0;
    for i in 200..500 {
        candles.push(Candle::new(
            price,
            price * 1.001,
            price * 0.999,
            price,
            1000.0,
            start + Duration::hours(4 * i as i64),
        ));
        price *= 1.01;
    }
    let signal_config = SignalConfig {
        indicator_weights: IndicatorWeights(BTreeMap::from([(IndicatorKind::Vwap, 1.0)])),
        ..SignalConfig::default()
    };
    let result = run_backtest(&candles, &BacktestConfig::default(), &signal_config).unwrap();

    // Window spans 201 bars, so by bar 420 the flat prefix is gone.
    let cutoff = candles[2 * WARMUP_BARS + 20].time;
    let late_trades: Vec<_> = result
        .trades
        .iter()
        .filter(|t| t.entry_time >= cutoff)
        .collect();
    assert!(!late_trades.is_empty());
    for trade in late_trades {
        assert!(
            trade.direction.is_long(),
            "short entered at {} deep in the uptrend",
            trade.entry_time
        );
    }
}

#[test]
fn test_backtest_confidence_matches_signal_path() {
    // A single scoreable timeframe counts as full agreement, so the
    // gate sees the same confidence the live scorer would report:
    // |0.8| x 100 x 1.2 agreement boost = 96.
    let candles = trend_candles(300, 100.0, 0.01);
    let result = run_backtest(&candles, &BacktestConfig::default(), &ema_only_config()).unwrap();
    assert!(!result.trades.is_empty());
    for trade in &result.trades {
        assert_eq!(trade.confidence, 96.0);
    }
}

#[test]
fn test_backtest_levels_follow_planner_geometry() {
    // Stops and targets come from the shared planner: the first target
    // sits exactly rr_multiplier stop-distances from entry.
    let candles = trend_candles(300, 100.0, 0.01);
    let config = BacktestConfig::default();
    let result = run_backtest(&candles, &config, &ema_only_config()).unwrap();
    assert!(!result.trades.is_empty());
    for trade in &result.trades {
        let stop_distance = (trade.entry_price - trade.stop_loss).abs();
        let reward = (trade.take_profit - trade.entry_price).abs();
        assert!(stop_distance > 0.0);
        assert!(
            (reward - stop_distance * config.rr_multiplier).abs() <= 1e-9 * trade.entry_price
        );
    }
}

#[test]
fn test_backtest_flat_market_no_trades() {
    // Flat bars have zero ATR, so no position can be sized.
    let candles = flat_candles(300, 100.0);
    let result =
        run_backtest(&candles, &BacktestConfig::default(), &SignalConfig::default()).unwrap();
    assert_eq!(result.total_trades, 0);
    assert_eq!(result.final_balance, result.config.starting_balance);
    assert_eq!(result.profit_factor, 0.0);
    assert_eq!(result.sharpe_ratio, 0.0);
}

#[test]
fn test_backtest_confidence_gate() {
    // An impossible confidence floor trades nothing.
    let candles = trend_candles(300, 100.0, 0.01);
    let config = BacktestConfig {
        min_confidence: 100.0,
        ..BacktestConfig::default()
    };
    let result = run_backtest(&candles, &config, &ema_only_config()).unwrap();
    assert_eq!(result.total_trades, 0);
}

#[test]
fn test_backtest_equity_curve_bounded() {
    let candles = trend_candles(300, 100.0, 0.01);
    let result = run_backtest(&candles, &BacktestConfig::default(), &ema_only_config()).unwrap();
    assert!(!result.equity_curve.is_empty());
    assert!(result.equity_curve.len() <= 210);
    // Curve ends at the final bar.
    assert_eq!(
        result.equity_curve.last().unwrap().time,
        candles.last().unwrap().time
    );
}

#[test]
fn test_backtest_open_position_force_closed() {
    // Expiry disabled and a take-profit too far to reach: the position
    // opened after warm-up must be force-closed at the end.
    let candles = trend_candles(300, 100.0, 0.0001);
    let config = BacktestConfig {
        max_hold_bars: 10_000,
        rr_multiplier: 1_000.0,
        ..BacktestConfig::default()
    };
    let result = run_backtest(&candles, &config, &ema_only_config()).unwrap();
    if let Some(last) = result.trades.last() {
        assert_eq!(last.reason, CloseReason::BacktestEnd);
    }
}
