//! Unit tests for the paper trading engine

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use hypersignals::config::{FeeModel, PaperConfig};
use hypersignals::models::learning::CoinConfig;
use hypersignals::models::position::{CloseReason, Outcome, PortfolioState};
use hypersignals::models::signal::{Direction, Reasoning, RiskLevel, Signal, TpSlPlan};
use hypersignals::paper::{account_equity, open_position, update_positions};

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn signal(coin: &str, direction: Direction, confidence: f64) -> Signal {
    Signal {
        coin: coin.to_string(),
        direction,
        composite_score: 0.5,
        confidence,
        timeframe_results: BTreeMap::new(),
        reasoning: Reasoning {
            summary: "test".to_string(),
            indicators: Vec::new(),
            risk_level: RiskLevel::Medium,
        },
        timestamp: base_time(),
    }
}

fn plan_at(entry: f64, stop: f64, tp: f64) -> TpSlPlan {
    TpSlPlan {
        entry,
        stop_loss: stop,
        take_profits: [tp, tp * 1.05, tp * 1.1],
        fib_target: None,
        atr: (entry - stop).abs() / 1.5,
        risk_percent: (entry - stop).abs() / entry * 100.0,
    }
}

fn no_fee_config() -> PaperConfig {
    PaperConfig {
        fees: FeeModel {
            enabled: false,
            ..FeeModel::default()
        },
        ..PaperConfig::default()
    }
}

#[test]
fn test_open_position_reserves_margin() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let opened = open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 95.0, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();

    // Risk 2% of 10k over a 5% stop distance: $4000 notional.
    assert!((opened.size - 4000.0).abs() < 1e-9);
    assert!((opened.margin - 4000.0 / 3.0).abs() < 1e-9);
    assert!((state.balance - (10_000.0 - opened.margin)).abs() < 1e-9);
    assert_eq!(state.open_positions.len(), 1);
}

#[test]
fn test_margin_capped_at_balance_fraction() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    // A razor-thin stop would demand absurd notional; margin must cap at
    // 30% of balance and size shrink accordingly.
    let opened = open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 99.99, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();

    assert!((opened.margin - 3000.0).abs() < 1e-9);
    assert!((opened.size - 9000.0).abs() < 1e-9);
}

#[test]
fn test_no_duplicate_coin_positions() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let sig = signal("BTC", Direction::Long, 60.0);
    let plan = plan_at(100.0, 95.0, 110.0);

    assert!(open_position(&mut state, &sig, &plan, None, &config, base_time()).is_some());
    assert!(open_position(&mut state, &sig, &plan, None, &config, base_time()).is_none());
    assert_eq!(state.open_positions.len(), 1);
}

#[test]
fn test_position_limit_enforced() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let plan = plan_at(100.0, 95.0, 110.0);
    for i in 0..config.max_positions {
        let sig = signal(&format!("C{}", i), Direction::Long, 60.0);
        assert!(open_position(&mut state, &sig, &plan, None, &config, base_time()).is_some());
    }
    let sig = signal("EXTRA", Direction::Long, 60.0);
    assert!(open_position(&mut state, &sig, &plan, None, &config, base_time()).is_none());
    assert_eq!(state.open_positions.len(), config.max_positions);
}

#[test]
fn test_confidence_floor_and_calibrated_override() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let plan = plan_at(100.0, 95.0, 110.0);

    // Below the global 40 floor.
    let weak = signal("BTC", Direction::Long, 38.0);
    assert!(open_position(&mut state, &weak, &plan, None, &config, base_time()).is_none());

    // A calibrated per-coin floor of 30 lets the same signal through.
    let coin_config = CoinConfig {
        min_confidence: 30.0,
        atr_multiplier_sl: 1.5,
        rr_multiplier: 1.5,
        max_hold_bars: 12,
        backtest_win_rate: 0.6,
        backtest_profit_factor: 2.0,
        backtest_return_pct: 10.0,
        backtest_trades: 20,
        calibrated_at: base_time(),
        candle_count: 360,
    };
    let opened =
        open_position(&mut state, &weak, &plan, Some(&coin_config), &config, base_time()).unwrap();
    assert!(opened.calibrated);
}

#[test]
fn test_neutral_signal_rejected() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let sig = signal("BTC", Direction::Neutral, 90.0);
    let plan = plan_at(100.0, 95.0, 110.0);
    assert!(open_position(&mut state, &sig, &plan, None, &config, base_time()).is_none());
}

#[test]
fn test_stop_loss_settlement() {
    // Long from 100 with stop 95 and $1000 notional: a tick at 95 loses
    // exactly 5%, $50.
    let config = PaperConfig {
        risk_per_trade: 0.05 * 1000.0 / 10_000.0, // risk sized for $1000 notional
        ..no_fee_config()
    };
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let opened = open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 95.0, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();
    assert!((opened.size - 1000.0).abs() < 1e-9);
    let balance_before_close = state.balance;

    let prices = BTreeMap::from([("BTC".to_string(), 95.0)]);
    let closed = update_positions(&mut state, &prices, &config, base_time() + Duration::hours(1));

    assert_eq!(closed.len(), 1);
    let trade = &closed[0];
    assert_eq!(trade.reason, CloseReason::StopLoss);
    assert_eq!(trade.outcome, Outcome::Loss);
    assert!((trade.pnl_percent + 5.0).abs() < 1e-9);
    assert!((trade.pnl_dollar + 50.0).abs() < 1e-9);
    assert!((state.balance - (balance_before_close + opened.margin - 50.0)).abs() < 1e-9);
    assert!(state.open_positions.is_empty());
    assert_eq!(state.stats.losses, 1);
}

#[test]
fn test_partial_close_keeps_other_positions() {
    // One position stops out while the other stays between its levels.
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 95.0, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();
    open_position(
        &mut state,
        &signal("ETH", Direction::Long, 60.0),
        &plan_at(50.0, 47.5, 55.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();

    let prices = BTreeMap::from([("BTC".to_string(), 95.0), ("ETH".to_string(), 51.0)]);
    let closed = update_positions(&mut state, &prices, &config, base_time() + Duration::hours(1));

    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].position.coin, "BTC");
    assert_eq!(state.open_positions.len(), 1);
    assert_eq!(state.open_positions[0].coin, "ETH");
}

#[test]
fn test_take_profit_settlement_with_fees() {
    let config = PaperConfig::default(); // fees enabled
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let opened = open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 95.0, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();

    let prices = BTreeMap::from([("BTC".to_string(), 111.0)]);
    let closed = update_positions(&mut state, &prices, &config, base_time() + Duration::hours(1));

    let trade = &closed[0];
    assert_eq!(trade.reason, CloseReason::TakeProfit);
    // Exit at the TP level, not the observed price.
    assert_eq!(trade.exit_price, 110.0);
    let gross = 0.10 * opened.size;
    let fees = opened.size * (0.00045 + 0.0003) * 2.0;
    assert!((trade.pnl_dollar - (gross - fees)).abs() < 1e-9);
}

#[test]
fn test_expiry_closes_old_positions() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 95.0, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();

    // Price still between the levels two days later.
    let prices = BTreeMap::from([("BTC".to_string(), 101.0)]);
    let closed = update_positions(
        &mut state,
        &prices,
        &config,
        base_time() + Duration::hours(config.max_hold_hours + 1),
    );

    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, CloseReason::Expired);
    assert_eq!(closed[0].exit_price, 101.0);
}

#[test]
fn test_equity_includes_margin_and_unrealized() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let opened = open_position(
        &mut state,
        &signal("BTC", Direction::Long, 60.0),
        &plan_at(100.0, 95.0, 110.0),
        None,
        &config,
        base_time(),
    )
    .unwrap();

    // At entry price the account is worth exactly its starting balance.
    let prices = BTreeMap::from([("BTC".to_string(), 100.0)]);
    assert!((account_equity(&state, &prices) - 10_000.0).abs() < 1e-9);

    // A 2% move adds 2% of notional.
    let prices = BTreeMap::from([("BTC".to_string(), 102.0)]);
    let expected = 10_000.0 + 0.02 * opened.size;
    assert!((account_equity(&state, &prices) - expected).abs() < 1e-9);
}

#[test]
fn test_equity_snapshots_rate_limited() {
    let config = no_fee_config();
    let mut state = PortfolioState::new(config.starting_balance, base_time());
    let prices = BTreeMap::new();

    update_positions(&mut state, &prices, &config, base_time());
    assert_eq!(state.equity_history.len(), 1);

    // One minute later: too soon for another snapshot.
    update_positions(&mut state, &prices, &config, base_time() + Duration::minutes(1));
    assert_eq!(state.equity_history.len(), 1);

    // Past the interval: a new point lands.
    update_positions(&mut state, &prices, &config, base_time() + Duration::minutes(6));
    assert_eq!(state.equity_history.len(), 2);
}
