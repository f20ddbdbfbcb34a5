//! Grid-search parameter optimizer.
//!
//! Runs a backtest for every point of the cartesian parameter grid in
//! parallel, filters out statistically meaningless runs, and ranks the
//! rest by a robustness score.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::engine::{run_backtest, BacktestResult};
use crate::config::{BacktestConfig, OptimizerGrid, SignalConfig};
use crate::models::candle::Candle;

/// Runs with fewer trades than this are noise and never ranked.
pub const MIN_TRADES_FOR_RANKING: usize = 5;

/// Profit factor is capped here so one lucky run cannot dominate.
pub const PROFIT_FACTOR_CAP: f64 = 5.0;

const TOP_RESULTS: usize = 20;

/// One ranked grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub rank_score: f64,
    pub min_confidence: f64,
    pub atr_multiplier_sl: f64,
    pub rr_multiplier: f64,
    pub max_hold_bars: usize,
    pub result: BacktestResult,
}

/// Robustness score: reward risk-adjusted returns, scale by sample size,
/// cap the profit-factor contribution.
pub fn rank_score(result: &BacktestResult) -> f64 {
    result.sharpe_ratio
        * (result.total_trades as f64).sqrt()
        * result.profit_factor.min(PROFIT_FACTOR_CAP)
}

/// Sweeps the parameter grid over one candle history and returns the top
/// results, best first. Grid points that error or produce too few trades
/// are dropped. Output order is deterministic for a given input.
pub fn optimize_parameters(
    candles: &[Candle],
    grid: &OptimizerGrid,
    base: &BacktestConfig,
    signal_config: &SignalConfig,
) -> Vec<RankedResult> {
    let mut combos = Vec::new();
    for &min_confidence in &grid.min_confidence {
        for &atr_multiplier_sl in &grid.atr_multiplier_sl {
            for &rr_multiplier in &grid.rr_multiplier {
                for &max_hold_bars in &grid.max_hold_bars {
                    combos.push((min_confidence, atr_multiplier_sl, rr_multiplier, max_hold_bars));
                }
            }
        }
    }

    let mut ranked: Vec<RankedResult> = combos
        .par_iter()
        .filter_map(|&(min_confidence, atr_multiplier_sl, rr_multiplier, max_hold_bars)| {
            let config = BacktestConfig {
                min_confidence,
                atr_multiplier_sl,
                rr_multiplier,
                max_hold_bars,
                ..base.clone()
            };
            let result = run_backtest(candles, &config, signal_config).ok()?;
            if result.total_trades < MIN_TRADES_FOR_RANKING {
                return None;
            }
            Some(RankedResult {
                rank_score: rank_score(&result),
                min_confidence,
                atr_multiplier_sl,
                rr_multiplier,
                max_hold_bars,
                result,
            })
        })
        .collect();

    // Deterministic order: score descending, then grid position.
    ranked.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                (a.min_confidence, a.atr_multiplier_sl, a.rr_multiplier, a.max_hold_bars)
                    .partial_cmp(&(
                        b.min_confidence,
                        b.atr_multiplier_sl,
                        b.rr_multiplier,
                        b.max_hold_bars,
                    ))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    ranked.truncate(TOP_RESULTS);

    info!(
        grid_points = combos.len(),
        ranked = ranked.len(),
        "parameter sweep done, kept top {} of {} grid points",
        ranked.len(),
        combos.len()
    );

    ranked
}
