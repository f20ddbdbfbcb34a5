//! Adaptive learner state models.

use crate::config::IndicatorWeights;
use crate::models::position::Outcome;
use crate::models::signal::{Direction, IndicatorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recorded signal awaiting (or holding) its resolved outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub coin: String,
    pub direction: Direction,
    pub confidence: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profits: [f64; 3],
    /// Per-indicator scores captured at signal time, used later for
    /// accuracy attribution.
    pub indicator_scores: BTreeMap<IndicatorKind, f64>,
    pub timestamp: DateTime<Utc>,
    pub outcome: Option<Outcome>,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub pnl_percent: Option<f64>,
}

impl SignalRecord {
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinPerformance {
    pub win_rate: f64,
    pub total_trades: usize,
    pub total_pnl: f64,
}

/// Aggregates recomputed from resolved history after every resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_signals: usize,
    pub wins: usize,
    pub losses: usize,
    pub expired: usize,
    pub win_rate: f64,
    pub avg_profit: f64,
    pub avg_loss: f64,
    #[serde(deserialize_with = "crate::common::serde_ext::f64_or_infinity")]
    pub profit_factor: f64,
    pub indicator_accuracy: BTreeMap<IndicatorKind, f64>,
    pub coin_performance: BTreeMap<String, CoinPerformance>,
}

/// Snapshot appended after each weight update, for trend reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub timestamp: DateTime<Utc>,
    pub weights: IndicatorWeights,
    pub win_rate: f64,
    pub atr_multiplier_sl: f64,
    pub rr_multiplier: f64,
}

/// The adaptive parameter document.
///
/// Invariant after every update: Σweights = 1 and each weight stays within
/// the configured [min_weight, max_weight] bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningState {
    pub version: u32,
    pub weights: IndicatorWeights,
    pub history: Vec<SignalRecord>,
    pub stats: LearningStats,
    pub atr_multiplier_sl: f64,
    pub rr_multiplier: f64,
    pub last_optimized: Option<DateTime<Utc>>,
    pub weight_history: Vec<WeightSnapshot>,
}

impl Default for LearningState {
    fn default() -> Self {
        Self {
            version: 1,
            weights: IndicatorWeights::default(),
            history: Vec::new(),
            stats: LearningStats::default(),
            atr_multiplier_sl: 1.5,
            rr_multiplier: 1.5,
            last_optimized: None,
            weight_history: Vec::new(),
        }
    }
}

/// A per-coin parameter set chosen by grid search, with the backtest
/// stats that justified it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinConfig {
    pub min_confidence: f64,
    pub atr_multiplier_sl: f64,
    pub rr_multiplier: f64,
    pub max_hold_bars: usize,
    pub backtest_win_rate: f64,
    #[serde(deserialize_with = "crate::common::serde_ext::f64_or_infinity")]
    pub backtest_profit_factor: f64,
    pub backtest_return_pct: f64,
    pub backtest_trades: usize,
    pub calibrated_at: DateTime<Utc>,
    pub candle_count: usize,
}
