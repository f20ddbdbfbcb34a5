//! Walk-forward backtester.
//!
//! Replays a single-timeframe candle history bar by bar: each bar first
//! settles the open position against its high/low range, then considers
//! a new entry at the bar close. Signals score a fixed trailing window
//! ending at the decision bar, so cumulative indicators see the same
//! bounded history a live scan would.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BacktestConfig, RiskDefaults, SignalConfig};
use crate::error::{EngineError, EngineResult};
use crate::models::candle::Candle;
use crate::models::position::{
    bar_exit, pnl_percent, CloseReason, Outcome, Position,
};
use crate::models::signal::Direction;
use crate::signals::engine::{score_confidence, score_timeframe};
use crate::signals::planner::calculate_tpsl;

/// Bars reserved before the first tradeable signal so every indicator is
/// fully seeded.
pub const WARMUP_BARS: usize = 200;

/// Minimum history for a meaningful run: warm-up plus a handful of
/// tradeable bars.
pub const MIN_BACKTEST_CANDLES: usize = 210;

/// One simulated trade from a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub reason: CloseReason,
    pub confidence: f64,
    pub size: f64,
    pub pnl_percent: f64,
    pub pnl_dollar: f64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BacktestEquityPoint {
    pub time: DateTime<Utc>,
    pub equity: f64,
}

/// Aggregated result of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub final_balance: f64,
    pub total_return_pct: f64,
    #[serde(deserialize_with = "crate::common::serde_ext::f64_or_infinity")]
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<BacktestEquityPoint>,
}

struct OpenTrade {
    position: Position,
    opened_at_bar: usize,
}

/// Runs a walk-forward backtest over one candle history.
pub fn run_backtest(
    candles: &[Candle],
    config: &BacktestConfig,
    signal_config: &SignalConfig,
) -> EngineResult<BacktestResult> {
    if candles.len() < MIN_BACKTEST_CANDLES {
        return Err(EngineError::InsufficientData {
            required: MIN_BACKTEST_CANDLES,
            got: candles.len(),
        });
    }

    let mut balance = config.starting_balance;
    let mut open: Option<OpenTrade> = None;
    let mut trades: Vec<BacktestTrade> = Vec::new();
    let mut equity_curve: Vec<BacktestEquityPoint> = Vec::new();
    let mut peak_equity = balance;
    let mut max_drawdown_pct: f64 = 0.0;

    // Keep the stored curve near 200 points regardless of history length.
    let curve_stride = ((candles.len() - WARMUP_BARS) / 200).max(1);

    for i in WARMUP_BARS..candles.len() {
        let bar = &candles[i];
        let history = &candles[i - WARMUP_BARS..=i];

        // Settle the open position against this bar's range first, then
        // check time expiry at the bar close.
        if let Some(trade) = &open {
            let exit = bar_exit(
                trade.position.direction,
                trade.position.stop_loss,
                trade.position.take_profit,
                bar.high,
                bar.low,
            );
            let expired = exit.is_none() && i - trade.opened_at_bar >= config.max_hold_bars;
            let exit = exit.or(if expired {
                Some((bar.close, CloseReason::Expired))
            } else {
                None
            });
            if let Some((exit_price, reason)) = exit {
                if let Some(closed) = open.take() {
                    balance += settle(&mut trades, closed.position, exit_price, bar.time, reason);
                }
            }
        }

        // Entry check only while flat.
        if open.is_none() {
            if let Some(scored) = score_timeframe(history, signal_config) {
                // One scoreable timeframe counts as full cross-timeframe
                // agreement, same as the live signal path.
                let confidence =
                    score_confidence(scored.score, signal_config.confidence.agreement);
                if !scored.direction.is_neutral() && confidence >= config.min_confidence {
                    if let Some(position) =
                        try_open(history, scored.direction, confidence, balance, config, bar.time)
                    {
                        balance -= position.margin;
                        open = Some(OpenTrade {
                            position,
                            opened_at_bar: i,
                        });
                    }
                }
            }
        }

        // Equity marks the open position at the bar close.
        let equity = match &open {
            Some(trade) => {
                balance
                    + trade.position.margin
                    + crate::models::position::unrealized_pnl(&trade.position, bar.close)
            }
            None => balance,
        };
        peak_equity = peak_equity.max(equity);
        if peak_equity > 0.0 {
            max_drawdown_pct = max_drawdown_pct.max((peak_equity - equity) / peak_equity * 100.0);
        }
        if (i - WARMUP_BARS) % curve_stride == 0 || i == candles.len() - 1 {
            equity_curve.push(BacktestEquityPoint {
                time: bar.time,
                equity,
            });
        }
    }

    // Force-close whatever is still open at the final bar.
    if let Some(trade) = open.take() {
        let last = &candles[candles.len() - 1];
        balance += settle(
            &mut trades,
            trade.position,
            last.close,
            last.time,
            CloseReason::BacktestEnd,
        );
    }

    debug!(
        trades = trades.len(),
        final_balance = balance,
        "backtest finished with {} trades",
        trades.len()
    );

    Ok(summarize(config.clone(), balance, trades, equity_curve, max_drawdown_pct))
}

/// Sizes a position so the stop-loss risks `risk_per_trade` of balance,
/// with margin capped at 30% of balance. Stop and first target come from
/// the shared TP/SL planner.
fn try_open(
    history: &[Candle],
    direction: Direction,
    confidence: f64,
    balance: f64,
    config: &BacktestConfig,
    now: DateTime<Utc>,
) -> Option<Position> {
    let entry = history.last()?.close;
    if balance <= 0.0 {
        return None;
    }
    let risk = RiskDefaults {
        atr_multiplier_sl: config.atr_multiplier_sl,
        rr_multiplier: config.rr_multiplier,
        ..RiskDefaults::default()
    };
    let plan = calculate_tpsl(history, direction, entry, &risk).ok()?;
    let stop_loss = plan.stop_loss;
    let take_profit = plan.take_profits[0];
    let sl_distance = (entry - stop_loss).abs();

    let risk_amount = balance * config.risk_per_trade;
    let mut size = risk_amount / sl_distance * entry;
    let mut margin = size / config.leverage;
    let max_margin = balance * 0.3;
    if margin > max_margin {
        margin = max_margin;
        size = margin * config.leverage;
    }

    Some(Position {
        id: format!("bt-{}", now.timestamp()),
        coin: String::new(),
        direction,
        entry_price: entry,
        stop_loss,
        take_profit,
        size,
        margin,
        leverage: config.leverage,
        confidence,
        open_time: now,
        calibrated: false,
    })
}

/// Records the closed trade and returns the cash credited back to the
/// balance (margin plus realized PnL).
fn settle(
    trades: &mut Vec<BacktestTrade>,
    position: Position,
    exit_price: f64,
    exit_time: DateTime<Utc>,
    reason: CloseReason,
) -> f64 {
    let pnl_pct = pnl_percent(position.direction, position.entry_price, exit_price);
    let pnl_dollar = pnl_pct / 100.0 * position.size;
    let outcome = match reason {
        _ if pnl_dollar > 0.0 => Outcome::Win,
        CloseReason::Expired | CloseReason::BacktestEnd if pnl_dollar == 0.0 => Outcome::Expired,
        _ => Outcome::Loss,
    };
    trades.push(BacktestTrade {
        direction: position.direction,
        entry_price: position.entry_price,
        stop_loss: position.stop_loss,
        take_profit: position.take_profit,
        exit_price,
        entry_time: position.open_time,
        exit_time,
        reason,
        confidence: position.confidence,
        size: position.size,
        pnl_percent: pnl_pct,
        pnl_dollar,
        outcome,
    });
    position.margin + pnl_dollar
}

fn summarize(
    config: BacktestConfig,
    final_balance: f64,
    trades: Vec<BacktestTrade>,
    equity_curve: Vec<BacktestEquityPoint>,
    max_drawdown_pct: f64,
) -> BacktestResult {
    let total_trades = trades.len();
    let wins = trades.iter().filter(|t| t.pnl_dollar > 0.0).count();
    let losses = trades.iter().filter(|t| t.pnl_dollar < 0.0).count();
    let win_rate = if total_trades > 0 {
        wins as f64 / total_trades as f64
    } else {
        0.0
    };

    let gross_profit: f64 = trades.iter().filter(|t| t.pnl_dollar > 0.0).map(|t| t.pnl_dollar).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl_dollar < 0.0)
        .map(|t| -t.pnl_dollar)
        .sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percent).collect();
    let sharpe_ratio = if returns.len() >= 2 {
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let std = crate::common::math::sample_std_dev(&returns);
        if std > 0.0 {
            mean / std
        } else {
            0.0
        }
    } else {
        0.0
    };

    let (max_consecutive_wins, max_consecutive_losses) = consecutive_runs(&trades);

    let avg_win_pct = if wins > 0 {
        trades.iter().filter(|t| t.pnl_dollar > 0.0).map(|t| t.pnl_percent).sum::<f64>()
            / wins as f64
    } else {
        0.0
    };
    let avg_loss_pct = if losses > 0 {
        trades.iter().filter(|t| t.pnl_dollar < 0.0).map(|t| t.pnl_percent).sum::<f64>()
            / losses as f64
    } else {
        0.0
    };

    let total_return_pct = (final_balance - config.starting_balance) / config.starting_balance * 100.0;

    BacktestResult {
        config,
        total_trades,
        wins,
        losses,
        win_rate,
        final_balance,
        total_return_pct,
        profit_factor,
        sharpe_ratio,
        max_drawdown_pct,
        max_consecutive_wins,
        max_consecutive_losses,
        avg_win_pct,
        avg_loss_pct,
        trades,
        equity_curve,
    }
}

fn consecutive_runs(trades: &[BacktestTrade]) -> (usize, usize) {
    let mut max_wins = 0usize;
    let mut max_losses = 0usize;
    let mut wins = 0usize;
    let mut losses = 0usize;
    for trade in trades {
        if trade.pnl_dollar > 0.0 {
            wins += 1;
            losses = 0;
        } else if trade.pnl_dollar < 0.0 {
            losses += 1;
            wins = 0;
        } else {
            wins = 0;
            losses = 0;
        }
        max_wins = max_wins.max(wins);
        max_losses = max_losses.max(losses);
    }
    (max_wins, max_losses)
}
