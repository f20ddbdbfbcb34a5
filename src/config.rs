//! Engine configuration. Everything is pass-by-value; there are no globals.

use crate::models::signal::IndicatorKind;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Candle intervals the scanner works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1];

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }
}

/// Fixed weight each timeframe contributes to the composite score.
/// Renormalized over the timeframes that were actually scoreable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeWeights(pub BTreeMap<Timeframe, f64>);

impl Default for TimeframeWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Timeframe::M15, 0.15),
            (Timeframe::H1, 0.25),
            (Timeframe::H4, 0.35),
            (Timeframe::D1, 0.25),
        ]))
    }
}

impl TimeframeWeights {
    pub fn get(&self, tf: Timeframe) -> f64 {
        self.0.get(&tf).copied().unwrap_or(0.25)
    }
}

/// Per-indicator weights. The adaptive learner mutates these, keeping the
/// sum at 1 and each weight within its configured bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorWeights(pub BTreeMap<IndicatorKind, f64>);

impl Default for IndicatorWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (IndicatorKind::Ema, 0.12),
            (IndicatorKind::Rsi, 0.10),
            (IndicatorKind::Macd, 0.12),
            (IndicatorKind::StochRsi, 0.08),
            (IndicatorKind::BollingerBands, 0.08),
            (IndicatorKind::Adx, 0.08),
            (IndicatorKind::Ichimoku, 0.12),
            (IndicatorKind::Obv, 0.06),
            (IndicatorKind::Vwap, 0.08),
            (IndicatorKind::Fibonacci, 0.06),
            (IndicatorKind::VolumeProfile, 0.05),
            (IndicatorKind::Atr, 0.05),
        ]))
    }
}

impl IndicatorWeights {
    pub fn get(&self, kind: IndicatorKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }
}

/// Composite-score cutoffs for direction classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub strong_long: f64,
    pub long: f64,
    pub short: f64,
    pub strong_short: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            strong_long: 0.5,
            long: 0.3,
            short: -0.3,
            strong_short: -0.5,
        }
    }
}

/// Confidence adjustments for cross-timeframe agreement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceMultipliers {
    pub agreement: f64,
    pub conflict: f64,
}

impl Default for ConfidenceMultipliers {
    fn default() -> Self {
        Self {
            agreement: 1.2,
            conflict: 0.7,
        }
    }
}

/// Everything the signal engine needs for one scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub indicator_weights: IndicatorWeights,
    pub timeframe_weights: TimeframeWeights,
    pub thresholds: SignalThresholds,
    pub confidence: ConfidenceMultipliers,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            indicator_weights: IndicatorWeights::default(),
            timeframe_weights: TimeframeWeights::default(),
            thresholds: SignalThresholds::default(),
            confidence: ConfidenceMultipliers::default(),
        }
    }
}

/// Defaults for TP/SL planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDefaults {
    pub atr_multiplier_sl: f64,
    pub rr_multiplier: f64,
    /// R-multiples for the three take-profit levels.
    pub tp_levels: [f64; 3],
}

impl Default for RiskDefaults {
    fn default() -> Self {
        Self {
            atr_multiplier_sl: 1.5,
            rr_multiplier: 1.5,
            tp_levels: [1.0, 2.0, 3.0],
        }
    }
}

/// Hyperparameters for the adaptive weight learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub baseline_accuracy: f64,
    /// Number of newly resolved signals that triggers a weight update.
    pub batch_size: usize,
    pub max_history: usize,
    pub min_weight: f64,
    pub max_weight: f64,
    pub max_weight_history: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            baseline_accuracy: 0.5,
            batch_size: 20,
            max_history: 500,
            min_weight: 0.02,
            max_weight: 0.25,
            max_weight_history: 100,
        }
    }
}

/// Two-sided taker-fee + slippage model applied to realized PnL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeModel {
    pub enabled: bool,
    /// Taker fee as a fraction of notional, charged per side.
    pub taker_fee_rate: f64,
    /// Slippage as a fraction of notional, charged per side.
    pub slippage_rate: f64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            enabled: true,
            taker_fee_rate: 0.00045,
            slippage_rate: 0.0003,
        }
    }
}

impl FeeModel {
    /// Round-trip cost in dollars for a position of the given notional size.
    pub fn round_trip_cost(&self, size: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        size * (self.taker_fee_rate + self.slippage_rate) * 2.0
    }
}

/// Paper trading account configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    pub max_positions: usize,
    /// Fraction of balance risked per trade.
    pub risk_per_trade: f64,
    /// Global confidence floor; per-coin calibration can override it.
    pub min_confidence: f64,
    pub leverage: f64,
    /// A single position's margin may not exceed this fraction of balance.
    pub max_margin_fraction: f64,
    /// Open positions are force-closed after this long.
    pub max_hold_hours: i64,
    pub starting_balance: f64,
    pub fees: FeeModel,
    pub max_closed_trades: usize,
    pub max_equity_history: usize,
    /// Minimum spacing between equity snapshots.
    pub equity_snapshot_interval_minutes: i64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            max_positions: 5,
            risk_per_trade: 0.02,
            min_confidence: 40.0,
            leverage: 3.0,
            max_margin_fraction: 0.3,
            max_hold_hours: 48,
            starting_balance: 10_000.0,
            fees: FeeModel::default(),
            max_closed_trades: 500,
            max_equity_history: 2000,
            equity_snapshot_interval_minutes: 5,
        }
    }
}

/// One backtest run's parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub timeframe: Timeframe,
    pub min_confidence: f64,
    pub atr_multiplier_sl: f64,
    pub rr_multiplier: f64,
    pub max_hold_bars: usize,
    pub leverage: f64,
    pub risk_per_trade: f64,
    pub starting_balance: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::H4,
            min_confidence: 40.0,
            atr_multiplier_sl: 1.5,
            rr_multiplier: 1.5,
            max_hold_bars: 12,
            leverage: 3.0,
            risk_per_trade: 0.02,
            starting_balance: 10_000.0,
        }
    }
}

/// Grid-search space for the parameter optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerGrid {
    pub min_confidence: Vec<f64>,
    pub atr_multiplier_sl: Vec<f64>,
    pub rr_multiplier: Vec<f64>,
    pub max_hold_bars: Vec<usize>,
}

impl Default for OptimizerGrid {
    fn default() -> Self {
        Self {
            min_confidence: vec![30.0, 40.0, 50.0, 60.0],
            atr_multiplier_sl: vec![1.0, 1.5, 2.0],
            rr_multiplier: vec![1.0, 1.5, 2.0, 2.5],
            max_hold_bars: vec![12],
        }
    }
}

/// Multi-coin sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Scan the top N coins by 24h volume.
    pub top_coins: usize,
    /// Concurrent fetch batch width.
    pub batch_size: usize,
    /// Only record signals at or above this confidence into learner history.
    pub min_record_confidence: f64,
    /// Soft wall-clock ceiling; remaining coins are skipped once approached.
    pub time_budget_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            top_coins: 50,
            batch_size: 5,
            min_record_confidence: 35.0,
            time_budget_secs: 110,
        }
    }
}

/// Per-coin calibration sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub top_n: usize,
    pub history_days: i64,
    pub timeframe: Timeframe,
    /// Quality gate: configs below either bar are not stored.
    pub min_trades: usize,
    pub min_profit_factor: f64,
    pub time_budget_secs: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            history_days: 60,
            timeframe: Timeframe::H4,
            min_trades: 5,
            min_profit_factor: 0.8,
            time_budget_secs: 50,
        }
    }
}
