//! Signal, scoring, and TP/SL plan data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directional call derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    StrongLong,
    Long,
    Neutral,
    Short,
    StrongShort,
}

impl Direction {
    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long | Direction::StrongLong)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Direction::Short | Direction::StrongShort)
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Direction::Neutral)
    }
}

/// The indicators the scorer knows about. Ordered so weight maps serialize
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndicatorKind {
    Ema,
    Rsi,
    Macd,
    StochRsi,
    BollingerBands,
    Adx,
    Ichimoku,
    Obv,
    Vwap,
    Fibonacci,
    VolumeProfile,
    Atr,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 12] = [
        IndicatorKind::Ema,
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::StochRsi,
        IndicatorKind::BollingerBands,
        IndicatorKind::Adx,
        IndicatorKind::Ichimoku,
        IndicatorKind::Obv,
        IndicatorKind::Vwap,
        IndicatorKind::Fibonacci,
        IndicatorKind::VolumeProfile,
        IndicatorKind::Atr,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            IndicatorKind::Ema => "EMA System",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::StochRsi => "Stochastic RSI",
            IndicatorKind::BollingerBands => "Bollinger Bands",
            IndicatorKind::Adx => "ADX",
            IndicatorKind::Ichimoku => "Ichimoku Cloud",
            IndicatorKind::Obv => "OBV",
            IndicatorKind::Vwap => "VWAP",
            IndicatorKind::Fibonacci => "Fibonacci",
            IndicatorKind::VolumeProfile => "Volume Profile",
            IndicatorKind::Atr => "ATR",
        }
    }
}

/// One indicator's read: bounded score plus a human-readable rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorScore {
    pub kind: IndicatorKind,
    /// Score in [-1, 1]; positive is bullish.
    pub score: f64,
    pub weight: f64,
    pub detail: String,
}

/// Composite result for one timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeResult {
    pub score: f64,
    pub direction: Direction,
    pub indicators: Vec<IndicatorScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Explainability payload attached to every signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reasoning {
    pub summary: String,
    /// Indicator contributions from the primary timeframe, sorted by
    /// absolute score descending.
    pub indicators: Vec<IndicatorScore>,
    pub risk_level: RiskLevel,
}

/// A directional call for one coin across timeframes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub coin: String,
    pub direction: Direction,
    pub composite_score: f64,
    /// Derived certainty in [0, 99].
    pub confidence: f64,
    pub timeframe_results: BTreeMap<crate::config::Timeframe, TimeframeResult>,
    pub reasoning: Reasoning,
    pub timestamp: DateTime<Utc>,
}

/// Risk-sized execution plan derived from a signal and ATR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpSlPlan {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profits: [f64; 3],
    /// Nearest Fibonacci level beyond 0.5% from entry in the trade's
    /// favor, when one exists.
    pub fib_target: Option<f64>,
    pub atr: f64,
    /// Stop distance as a percentage of entry.
    pub risk_percent: f64,
}
