//! Position and portfolio data models, plus the canonical exit-check and
//! PnL arithmetic shared by the backtester and the paper engine.

use crate::models::signal::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed. Terminal; checked in priority order
/// stop-loss, take-profit, then time expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    Expired,
    BacktestEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Expired,
}

/// One open simulated trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub coin: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Notional size in dollars.
    pub size: f64,
    /// Margin reserved from the balance at open.
    pub margin: f64,
    pub leverage: f64,
    pub confidence: f64,
    pub open_time: DateTime<Utc>,
    /// Whether per-coin calibrated parameters were in effect at open.
    pub calibrated: bool,
}

/// A closed trade with its realized result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    #[serde(flatten)]
    pub position: Position,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub reason: CloseReason,
    pub pnl_percent: f64,
    pub pnl_dollar: f64,
    pub outcome: Outcome,
}

/// Account-level counters maintained as trades close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub max_drawdown: f64,
    pub peak_equity: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

impl PortfolioStats {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            total_trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            max_drawdown: 0.0,
            peak_equity: starting_balance,
            best_trade: 0.0,
            worst_trade: 0.0,
        }
    }
}

/// Periodic equity snapshot for trend charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub equity: f64,
    pub balance: f64,
    pub open_positions: usize,
}

/// One simulated trading account.
///
/// Invariant: equity = balance + Σ(margin + unrealized PnL) over open
/// positions; balance never goes negative because margin is capped at
/// open time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub balance: f64,
    pub starting_balance: f64,
    pub equity: f64,
    pub open_positions: Vec<Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_history: Vec<EquityPoint>,
    pub stats: PortfolioStats,
    pub last_updated: DateTime<Utc>,
}

impl PortfolioState {
    pub fn new(starting_balance: f64, now: DateTime<Utc>) -> Self {
        Self {
            balance: starting_balance,
            starting_balance,
            equity: starting_balance,
            open_positions: Vec::new(),
            closed_trades: Vec::new(),
            equity_history: Vec::new(),
            stats: PortfolioStats::new(starting_balance),
            last_updated: now,
        }
    }
}

/// Signed PnL percentage for a trade from entry to exit.
pub fn pnl_percent(direction: Direction, entry: f64, exit: f64) -> f64 {
    if direction.is_long() {
        (exit - entry) / entry * 100.0
    } else {
        (entry - exit) / entry * 100.0
    }
}

/// Unrealized PnL in dollars for a position marked at `price`.
pub fn unrealized_pnl(position: &Position, price: f64) -> f64 {
    pnl_percent(position.direction, position.entry_price, price) / 100.0 * position.size
}

/// Canonical exit check against a full bar's range. Stop-loss wins over
/// take-profit when both levels fall inside the bar.
pub fn bar_exit(
    direction: Direction,
    stop_loss: f64,
    take_profit: f64,
    high: f64,
    low: f64,
) -> Option<(f64, CloseReason)> {
    if direction.is_long() {
        if low <= stop_loss {
            return Some((stop_loss, CloseReason::StopLoss));
        }
        if high >= take_profit {
            return Some((take_profit, CloseReason::TakeProfit));
        }
    } else {
        if high >= stop_loss {
            return Some((stop_loss, CloseReason::StopLoss));
        }
        if low <= take_profit {
            return Some((take_profit, CloseReason::TakeProfit));
        }
    }
    None
}

/// Canonical exit check against a single observed price.
pub fn tick_exit(
    direction: Direction,
    stop_loss: f64,
    take_profit: f64,
    price: f64,
) -> Option<(f64, CloseReason)> {
    bar_exit(direction, stop_loss, take_profit, price, price)
}
