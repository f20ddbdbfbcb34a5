//! Adaptive weight learner.
//!
//! Records emitted signals, resolves their outcomes against live prices,
//! and periodically nudges indicator weights toward the indicators that
//! have been calling direction correctly. Risk knobs (ATR stop multiple,
//! reward:risk multiple) adapt on the same cadence.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::LearningConfig;
use crate::models::learning::{
    CoinPerformance, LearningState, LearningStats, SignalRecord, WeightSnapshot,
};
use crate::models::position::{pnl_percent, tick_exit, CloseReason, Outcome};
use crate::models::signal::{IndicatorKind, Signal, TpSlPlan};

/// Unresolved signals older than this are written off as expired.
pub const OUTCOME_EXPIRY_DAYS: i64 = 7;

/// Risk-knob adaptation looks at this many most recent resolutions.
const KNOB_WINDOW: usize = 50;
/// And refuses to move at all below this many.
const MIN_KNOB_SAMPLES: usize = 10;

const ATR_SL_STEP_UP: f64 = 1.05;
const ATR_SL_STEP_DOWN: f64 = 0.98;
const ATR_SL_MAX: f64 = 2.5;
const ATR_SL_MIN: f64 = 1.0;
const RR_STEP_UP: f64 = 1.05;
const RR_MAX: f64 = 3.0;
const RR_TARGET: f64 = 1.5;

/// Appends a signal to the tracked history, bounded to the configured
/// cap (oldest records drop first).
pub fn record_signal(
    state: &mut LearningState,
    signal: &Signal,
    plan: &TpSlPlan,
    config: &LearningConfig,
) {
    let indicator_scores: BTreeMap<IndicatorKind, f64> = signal
        .reasoning
        .indicators
        .iter()
        .map(|i| (i.kind, i.score))
        .collect();

    state.history.push(SignalRecord {
        id: format!("{}-{}", signal.coin, signal.timestamp.timestamp_millis()),
        coin: signal.coin.clone(),
        direction: signal.direction,
        confidence: signal.confidence,
        entry: plan.entry,
        stop_loss: plan.stop_loss,
        take_profits: plan.take_profits,
        indicator_scores,
        timestamp: signal.timestamp,
        outcome: None,
        exit_price: None,
        exit_time: None,
        pnl_percent: None,
    });
    if state.history.len() > config.max_history {
        let excess = state.history.len() - config.max_history;
        state.history.drain(..excess);
    }
}

/// Resolves pending signals against current prices: stop-loss first,
/// then the first take-profit, then age expiry. Returns how many
/// resolved this pass. Triggers a weight update when a full batch of
/// resolutions has accumulated since the last one.
pub fn check_outcomes(
    state: &mut LearningState,
    prices: &BTreeMap<String, f64>,
    config: &LearningConfig,
    now: DateTime<Utc>,
) -> usize {
    let mut resolved = 0usize;
    for record in state.history.iter_mut().filter(|r| !r.is_resolved()) {
        let price = prices.get(&record.coin).copied();

        if let Some(price) = price {
            if let Some((exit_price, reason)) = tick_exit(
                record.direction,
                record.stop_loss,
                record.take_profits[0],
                price,
            ) {
                record.outcome = Some(match reason {
                    CloseReason::StopLoss => Outcome::Loss,
                    _ => Outcome::Win,
                });
                record.exit_price = Some(exit_price);
                record.exit_time = Some(now);
                record.pnl_percent = Some(pnl_percent(record.direction, record.entry, exit_price));
                resolved += 1;
                continue;
            }
        }

        if now - record.timestamp > Duration::days(OUTCOME_EXPIRY_DAYS) {
            record.outcome = Some(Outcome::Expired);
            record.exit_price = price;
            record.exit_time = Some(now);
            record.pnl_percent =
                price.map(|p| pnl_percent(record.direction, record.entry, p));
            resolved += 1;
        }
    }

    if resolved > 0 {
        state.stats = recalculate_stats(&state.history);
        debug!(resolved, "resolved {} signal outcome(s)", resolved);

        let since_last = state
            .history
            .iter()
            .filter(|r| r.is_resolved())
            .filter(|r| match state.last_optimized {
                Some(last) => r.exit_time.map(|t| t > last).unwrap_or(false),
                None => true,
            })
            .count();
        if since_last >= config.batch_size {
            optimize_weights(state, config, now);
        }
    }
    resolved
}

/// Recomputes aggregate stats over the resolved history.
pub fn recalculate_stats(history: &[SignalRecord]) -> LearningStats {
    let resolved: Vec<&SignalRecord> = history.iter().filter(|r| r.is_resolved()).collect();

    let wins = resolved.iter().filter(|r| r.outcome == Some(Outcome::Win)).count();
    let losses = resolved.iter().filter(|r| r.outcome == Some(Outcome::Loss)).count();
    let expired = resolved.iter().filter(|r| r.outcome == Some(Outcome::Expired)).count();
    let decided = wins + losses;
    let win_rate = if decided > 0 { wins as f64 / decided as f64 } else { 0.0 };

    let profits: Vec<f64> = resolved
        .iter()
        .filter_map(|r| r.pnl_percent)
        .filter(|&p| p > 0.0)
        .collect();
    let deficits: Vec<f64> = resolved
        .iter()
        .filter_map(|r| r.pnl_percent)
        .filter(|&p| p < 0.0)
        .collect();
    let avg_profit = mean(&profits);
    let avg_loss = mean(&deficits);
    let gross_profit: f64 = profits.iter().sum();
    let gross_loss: f64 = deficits.iter().map(|p| -p).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    LearningStats {
        total_signals: resolved.len(),
        wins,
        losses,
        expired,
        win_rate,
        avg_profit,
        avg_loss,
        profit_factor,
        indicator_accuracy: indicator_accuracy(&resolved),
        coin_performance: coin_performance(&resolved),
    }
}

/// Per-indicator directional accuracy over decided (win/loss) records.
///
/// An indicator is counted correct when its agreement with the signal's
/// direction matches the outcome: agreeing on a win, or disagreeing on
/// a loss.
fn indicator_accuracy(resolved: &[&SignalRecord]) -> BTreeMap<IndicatorKind, f64> {
    let mut correct: BTreeMap<IndicatorKind, usize> = BTreeMap::new();
    let mut counted: BTreeMap<IndicatorKind, usize> = BTreeMap::new();

    for record in resolved {
        let won = match record.outcome {
            Some(Outcome::Win) => true,
            Some(Outcome::Loss) => false,
            _ => continue,
        };
        for (&kind, &score) in &record.indicator_scores {
            if score == 0.0 {
                continue;
            }
            let bullish = score > 0.0;
            let matches_direction = match record.direction {
                d if d.is_long() => bullish,
                d if d.is_short() => !bullish,
                _ => continue,
            };
            *counted.entry(kind).or_default() += 1;
            if matches_direction == won {
                *correct.entry(kind).or_default() += 1;
            }
        }
    }

    counted
        .into_iter()
        .map(|(kind, n)| {
            let hits = correct.get(&kind).copied().unwrap_or(0);
            (kind, hits as f64 / n as f64)
        })
        .collect()
}

fn coin_performance(resolved: &[&SignalRecord]) -> BTreeMap<String, CoinPerformance> {
    let mut out: BTreeMap<String, CoinPerformance> = BTreeMap::new();
    for record in resolved {
        let entry = out.entry(record.coin.clone()).or_default();
        entry.total_trades += 1;
        if let Some(pnl) = record.pnl_percent {
            entry.total_pnl += pnl;
        }
        if record.outcome == Some(Outcome::Win) {
            // win_rate field doubles as a win counter until the final pass
            entry.win_rate += 1.0;
        }
    }
    for perf in out.values_mut() {
        if perf.total_trades > 0 {
            perf.win_rate /= perf.total_trades as f64;
        }
    }
    out
}

/// Multiplicative weight update from indicator accuracy, then clamp and
/// renormalize so the weights stay a distribution. Risk knobs move only
/// when enough recent resolutions exist to justify it.
pub fn optimize_weights(state: &mut LearningState, config: &LearningConfig, now: DateTime<Utc>) {
    let accuracy = &state.stats.indicator_accuracy;
    for (kind, weight) in state.weights.0.iter_mut() {
        if let Some(&acc) = accuracy.get(kind) {
            *weight *= 1.0 + config.learning_rate * (acc - config.baseline_accuracy);
        }
        *weight = weight.clamp(config.min_weight, config.max_weight);
    }
    let sum = state.weights.sum();
    if sum > 0.0 {
        for weight in state.weights.0.values_mut() {
            *weight /= sum;
        }
    }

    adapt_risk_knobs(state);

    state.weight_history.push(WeightSnapshot {
        timestamp: now,
        weights: state.weights.clone(),
        win_rate: state.stats.win_rate,
        atr_multiplier_sl: state.atr_multiplier_sl,
        rr_multiplier: state.rr_multiplier,
    });
    if state.weight_history.len() > config.max_weight_history {
        let excess = state.weight_history.len() - config.max_weight_history;
        state.weight_history.drain(..excess);
    }
    state.last_optimized = Some(now);

    info!(
        win_rate = state.stats.win_rate,
        atr_multiplier_sl = state.atr_multiplier_sl,
        rr_multiplier = state.rr_multiplier,
        "weights reoptimized at win rate {:.2}",
        state.stats.win_rate
    );
}

/// Widens the stop when recent trades keep getting stopped out, tightens
/// it when the win rate is comfortable, and stretches the reward target
/// when realized R:R lags the configured minimum.
fn adapt_risk_knobs(state: &mut LearningState) {
    let recent: Vec<&SignalRecord> = state
        .history
        .iter()
        .filter(|r| r.is_resolved())
        .rev()
        .take(KNOB_WINDOW)
        .collect();
    if recent.len() < MIN_KNOB_SAMPLES {
        return;
    }

    let wins = recent.iter().filter(|r| r.outcome == Some(Outcome::Win)).count();
    let losses = recent.iter().filter(|r| r.outcome == Some(Outcome::Loss)).count();
    let decided = wins + losses;
    if decided == 0 {
        return;
    }
    let win_rate = wins as f64 / decided as f64;

    if win_rate < 0.4 {
        state.atr_multiplier_sl = (state.atr_multiplier_sl * ATR_SL_STEP_UP).min(ATR_SL_MAX);
    } else if win_rate > 0.6 {
        state.atr_multiplier_sl = (state.atr_multiplier_sl * ATR_SL_STEP_DOWN).max(ATR_SL_MIN);
    }

    let avg_win = mean(
        &recent
            .iter()
            .filter_map(|r| r.pnl_percent)
            .filter(|&p| p > 0.0)
            .collect::<Vec<_>>(),
    );
    let avg_loss = mean(
        &recent
            .iter()
            .filter_map(|r| r.pnl_percent)
            .filter(|&p| p < 0.0)
            .collect::<Vec<_>>(),
    )
    .abs();
    if avg_loss > 0.0 && avg_win / avg_loss < RR_TARGET {
        state.rr_multiplier = (state.rr_multiplier * RR_STEP_UP).min(RR_MAX);
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}