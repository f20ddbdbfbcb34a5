//! Multi-timeframe signal engine.
//!
//! Scores every indicator per timeframe, blends the per-timeframe
//! composites with renormalized timeframe weights, and classifies the
//! result into a directional call with a bounded confidence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{SignalConfig, SignalThresholds, Timeframe};
use crate::error::{EngineError, EngineResult};
use crate::models::candle::Candle;
use crate::models::signal::{
    Direction, IndicatorKind, IndicatorScore, Reasoning, RiskLevel, Signal, TimeframeResult,
};
use crate::signals::scoring::score_indicator;

/// A timeframe with fewer candles than this cannot seed the slowest
/// indicators and is excluded from the blend.
pub const MIN_CANDLES_PER_TIMEFRAME: usize = 52;

/// Confidence for a composite score: |score| scaled to a percentage,
/// shaped by the cross-timeframe agreement multiplier, clamped to
/// [0, 99] and rounded.
pub fn score_confidence(score: f64, multiplier: f64) -> f64 {
    (score.abs() * 100.0 * multiplier).clamp(0.0, 99.0).round()
}

/// Classifies a composite score against the configured cutoffs.
pub fn classify_direction(score: f64, thresholds: &SignalThresholds) -> Direction {
    if score >= thresholds.strong_long {
        Direction::StrongLong
    } else if score >= thresholds.long {
        Direction::Long
    } else if score <= thresholds.strong_short {
        Direction::StrongShort
    } else if score <= thresholds.short {
        Direction::Short
    } else {
        Direction::Neutral
    }
}

/// Scores one timeframe: weighted average of the indicators that could
/// compute, normalized over the active weights only. `None` when the
/// history is too short or no indicator could compute.
pub fn score_timeframe(
    candles: &[Candle],
    config: &SignalConfig,
) -> Option<TimeframeResult> {
    if candles.len() < MIN_CANDLES_PER_TIMEFRAME {
        return None;
    }

    let mut indicators: Vec<IndicatorScore> = Vec::with_capacity(IndicatorKind::ALL.len());
    let mut weighted_sum = 0.0;
    let mut active_weight = 0.0;
    for kind in IndicatorKind::ALL {
        let weight = config.indicator_weights.get(kind);
        if let Some(scored) = score_indicator(kind, candles, weight) {
            weighted_sum += scored.score * scored.weight;
            active_weight += scored.weight;
            indicators.push(scored);
        }
    }
    if active_weight == 0.0 {
        return None;
    }

    let score = weighted_sum / active_weight;
    Some(TimeframeResult {
        score,
        direction: classify_direction(score, &config.thresholds),
        indicators,
    })
}

/// Generates a signal for one coin from per-timeframe candle histories.
///
/// Timeframes without enough history drop out of the blend and the
/// remaining timeframe weights are renormalized, so a missing timeframe
/// never drags the composite toward zero.
pub fn generate_signal(
    coin: &str,
    candles_by_timeframe: &BTreeMap<Timeframe, Vec<Candle>>,
    config: &SignalConfig,
    now: DateTime<Utc>,
) -> EngineResult<Signal> {
    let mut timeframe_results = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut active_weight = 0.0;
    for (&tf, candles) in candles_by_timeframe {
        if let Some(result) = score_timeframe(candles, config) {
            let weight = config.timeframe_weights.get(tf);
            weighted_sum += result.score * weight;
            active_weight += weight;
            timeframe_results.insert(tf, result);
        }
    }
    if timeframe_results.is_empty() {
        return Err(EngineError::InsufficientData {
            required: MIN_CANDLES_PER_TIMEFRAME,
            got: candles_by_timeframe
                .values()
                .map(|c| c.len())
                .max()
                .unwrap_or(0),
        });
    }

    let composite_score = weighted_sum / active_weight;
    let direction = classify_direction(composite_score, &config.thresholds);

    // Cross-timeframe agreement scales confidence up, an outright
    // long/short split scales it down.
    let longs = timeframe_results.values().filter(|r| r.direction.is_long()).count();
    let shorts = timeframe_results.values().filter(|r| r.direction.is_short()).count();
    let total = timeframe_results.len();
    let multiplier = if longs == total || shorts == total {
        config.confidence.agreement
    } else if longs > 0 && shorts > 0 {
        config.confidence.conflict
    } else {
        1.0
    };
    let confidence = score_confidence(composite_score, multiplier);

    let reasoning = build_reasoning(direction, confidence, &timeframe_results);

    debug!(
        coin,
        score = composite_score,
        confidence,
        timeframes = total,
        "signal generated for {} ({:?}, confidence {})",
        coin,
        direction,
        confidence
    );

    Ok(Signal {
        coin: coin.to_string(),
        direction,
        composite_score,
        confidence,
        timeframe_results,
        reasoning,
        timestamp: now,
    })
}

/// Explains a signal from its primary timeframe: 4h when present, then
/// 1h, then whatever scored first.
fn build_reasoning(
    direction: Direction,
    confidence: f64,
    results: &BTreeMap<Timeframe, TimeframeResult>,
) -> Reasoning {
    let primary = results
        .get(&Timeframe::H4)
        .or_else(|| results.get(&Timeframe::H1))
        .or_else(|| results.values().next());

    let mut indicators = primary.map(|r| r.indicators.clone()).unwrap_or_default();
    indicators.sort_by(|a, b| {
        b.score
            .abs()
            .partial_cmp(&a.score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let bullish = indicators.iter().filter(|i| i.score > 0.0).count();
    let bearish = indicators.iter().filter(|i| i.score < 0.0).count();
    let summary = format!(
        "{:?} across {} timeframe(s): {} bullish vs {} bearish indicators on the primary timeframe",
        direction,
        results.len(),
        bullish,
        bearish
    );

    let risk_level = if confidence > 70.0 {
        RiskLevel::Low
    } else if confidence > 45.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    Reasoning {
        summary,
        indicators,
        risk_level,
    }
}
