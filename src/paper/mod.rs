//! Paper trading engine.
//!
//! Maintains a simulated account driven by live signals: opens
//! risk-sized positions behind a set of gates, settles them against
//! observed prices with fee and slippage netting, and keeps bounded
//! trade and equity histories.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::PaperConfig;
use crate::models::learning::CoinConfig;
use crate::models::position::{
    pnl_percent, tick_exit, unrealized_pnl, CloseReason, ClosedTrade, Outcome, PortfolioState,
    Position,
};
use crate::models::signal::{Signal, TpSlPlan};

/// Opens a position for a signal, or returns `None` when a gate rejects
/// it: account full, confidence below the (possibly calibrated) floor,
/// neutral direction, a position already open on the coin, or a
/// degenerate stop.
///
/// Margin is reserved from the balance immediately and capped at the
/// configured fraction of balance; size shrinks with it.
pub fn open_position(
    state: &mut PortfolioState,
    signal: &Signal,
    plan: &TpSlPlan,
    coin_config: Option<&CoinConfig>,
    config: &PaperConfig,
    now: DateTime<Utc>,
) -> Option<Position> {
    if state.open_positions.len() >= config.max_positions {
        debug!(coin = %signal.coin, "position rejected: account full");
        return None;
    }
    let min_confidence = coin_config
        .map(|c| c.min_confidence)
        .unwrap_or(config.min_confidence);
    if signal.confidence < min_confidence {
        debug!(
            coin = %signal.coin,
            confidence = signal.confidence,
            floor = min_confidence,
            "position rejected: confidence below floor"
        );
        return None;
    }
    if signal.direction.is_neutral() {
        return None;
    }
    if state.open_positions.iter().any(|p| p.coin == signal.coin) {
        debug!(coin = %signal.coin, "position rejected: already open on coin");
        return None;
    }

    let entry = plan.entry;
    let sl_distance = (entry - plan.stop_loss).abs();
    if sl_distance <= 0.0 || entry <= 0.0 || state.balance <= 0.0 {
        return None;
    }

    let risk_amount = state.balance * config.risk_per_trade;
    let mut size = risk_amount / sl_distance * entry;
    let mut margin = size / config.leverage;
    let max_margin = state.balance * config.max_margin_fraction;
    if margin > max_margin {
        margin = max_margin;
        size = margin * config.leverage;
    }

    let position = Position {
        id: format!("paper-{}-{}", signal.coin, now.timestamp_millis()),
        coin: signal.coin.clone(),
        direction: signal.direction,
        entry_price: entry,
        stop_loss: plan.stop_loss,
        take_profit: plan.take_profits[0],
        size,
        margin,
        leverage: config.leverage,
        confidence: signal.confidence,
        open_time: now,
        calibrated: coin_config.is_some(),
    };
    state.balance -= margin;
    state.open_positions.push(position.clone());
    state.last_updated = now;

    info!(
        coin = %position.coin,
        direction = ?position.direction,
        size = position.size,
        margin = position.margin,
        "opened paper position on {} (size ${:.0})",
        position.coin,
        position.size
    );
    Some(position)
}

/// Marks every open position against the latest prices, closing the ones
/// that hit their stop, their target, or the hold-time limit. Refreshes
/// equity and appends a rate-limited equity snapshot. Returns the trades
/// closed this pass.
pub fn update_positions(
    state: &mut PortfolioState,
    prices: &BTreeMap<String, f64>,
    config: &PaperConfig,
    now: DateTime<Utc>,
) -> Vec<ClosedTrade> {
    let mut closed = Vec::new();
    let mut remaining = Vec::with_capacity(state.open_positions.len());

    // Take the positions out first; close() needs the state mutably.
    let drained: Vec<Position> = state.open_positions.drain(..).collect();
    for position in drained {
        let price = prices.get(&position.coin).copied();
        let exit = price.and_then(|p| {
            tick_exit(position.direction, position.stop_loss, position.take_profit, p)
        });
        let exit = exit.or_else(|| {
            if now - position.open_time > Duration::hours(config.max_hold_hours) {
                price.map(|p| (p, CloseReason::Expired))
            } else {
                None
            }
        });
        match exit {
            Some((exit_price, reason)) => {
                closed.push(close(state, position, exit_price, reason, config, now));
            }
            None => remaining.push(position),
        }
    }
    state.open_positions = remaining;

    refresh_equity(state, prices, config, now);
    closed
}

/// Settles one position: nets fees and slippage from the realized PnL,
/// returns margin plus PnL to the balance, and updates the account
/// counters.
fn close(
    state: &mut PortfolioState,
    position: Position,
    exit_price: f64,
    reason: CloseReason,
    config: &PaperConfig,
    now: DateTime<Utc>,
) -> ClosedTrade {
    let pnl_pct = pnl_percent(position.direction, position.entry_price, exit_price);
    let pnl_dollar = pnl_pct / 100.0 * position.size - config.fees.round_trip_cost(position.size);
    let outcome = if pnl_dollar > 0.0 {
        Outcome::Win
    } else if pnl_dollar < 0.0 {
        Outcome::Loss
    } else {
        Outcome::Expired
    };

    state.balance += position.margin + pnl_dollar;

    let stats = &mut state.stats;
    stats.total_trades += 1;
    match outcome {
        Outcome::Win => stats.wins += 1,
        Outcome::Loss => stats.losses += 1,
        Outcome::Expired => {}
    }
    let decided = stats.wins + stats.losses;
    stats.win_rate = if decided > 0 {
        stats.wins as f64 / decided as f64
    } else {
        0.0
    };
    stats.total_pnl += pnl_dollar;
    stats.best_trade = stats.best_trade.max(pnl_dollar);
    stats.worst_trade = stats.worst_trade.min(pnl_dollar);

    let trade = ClosedTrade {
        position,
        exit_price,
        exit_time: now,
        reason,
        pnl_percent: pnl_pct,
        pnl_dollar,
        outcome,
    };
    info!(
        coin = %trade.position.coin,
        reason = ?reason,
        pnl = pnl_dollar,
        "closed paper position on {} ({:?}, ${:.2})",
        trade.position.coin,
        reason,
        pnl_dollar
    );

    state.closed_trades.push(trade.clone());
    if state.closed_trades.len() > config.max_closed_trades {
        let excess = state.closed_trades.len() - config.max_closed_trades;
        state.closed_trades.drain(..excess);
    }
    trade
}

/// Equity is balance plus, per open position, its reserved margin and
/// unrealized PnL at the latest known price (entry price when unknown).
pub fn account_equity(state: &PortfolioState, prices: &BTreeMap<String, f64>) -> f64 {
    let open_value: f64 = state
        .open_positions
        .iter()
        .map(|p| {
            let price = prices.get(&p.coin).copied().unwrap_or(p.entry_price);
            p.margin + unrealized_pnl(p, price)
        })
        .sum();
    state.balance + open_value
}

fn refresh_equity(
    state: &mut PortfolioState,
    prices: &BTreeMap<String, f64>,
    config: &PaperConfig,
    now: DateTime<Utc>,
) {
    let equity = account_equity(state, prices);
    state.equity = equity;
    state.last_updated = now;

    state.stats.peak_equity = state.stats.peak_equity.max(equity);
    if state.stats.peak_equity > 0.0 {
        let drawdown = (state.stats.peak_equity - equity) / state.stats.peak_equity * 100.0;
        state.stats.max_drawdown = state.stats.max_drawdown.max(drawdown);
    }

    // Snapshots are rate-limited so a busy scanner cannot flood the
    // history.
    let due = match state.equity_history.last() {
        Some(last) => {
            now - last.time >= Duration::minutes(config.equity_snapshot_interval_minutes)
        }
        None => true,
    };
    if due {
        state.equity_history.push(crate::models::position::EquityPoint {
            time: now,
            equity,
            balance: state.balance,
            open_positions: state.open_positions.len(),
        });
        if state.equity_history.len() > config.max_equity_history {
            let excess = state.equity_history.len() - config.max_equity_history;
            state.equity_history.drain(..excess);
        }
    }
}
