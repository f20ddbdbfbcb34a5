//! TP/SL planner: turns a directional call into ATR-sized price levels.

use crate::config::RiskDefaults;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{calculate_atr_default, calculate_fibonacci_default};
use crate::models::candle::Candle;
use crate::models::signal::{Direction, TpSlPlan};

/// A Fibonacci target must sit at least this far from entry to matter.
const MIN_TARGET_DISTANCE: f64 = 0.005;

/// Plans stop-loss and take-profit levels around an entry price.
///
/// The stop sits `atr_multiplier_sl` ATRs away against the trade; the
/// three take-profits sit at 1, 2, and 3 R-multiples of the stop
/// distance scaled by `rr_multiplier`. When a Fibonacci level lies in
/// the trade's favor beyond a minimum distance, the nearest one is
/// reported as a structural target.
pub fn calculate_tpsl(
    candles: &[Candle],
    direction: Direction,
    entry: f64,
    risk: &RiskDefaults,
) -> EngineResult<TpSlPlan> {
    if direction.is_neutral() {
        return Err(EngineError::InvalidParameters(
            "cannot plan TP/SL for a neutral signal".to_string(),
        ));
    }
    let atr = calculate_atr_default(candles).ok_or(EngineError::InsufficientData {
        required: 15,
        got: candles.len(),
    })?;

    let sl_distance = atr * risk.atr_multiplier_sl;
    if sl_distance <= 0.0 {
        return Err(EngineError::InvalidParameters(
            "stop distance must be positive".to_string(),
        ));
    }

    let long = direction.is_long();
    let stop_loss = if long { entry - sl_distance } else { entry + sl_distance };
    let tp_distance = sl_distance * risk.rr_multiplier;
    let mut take_profits = [0.0; 3];
    for (slot, level) in take_profits.iter_mut().zip(risk.tp_levels) {
        *slot = if long {
            entry + tp_distance * level
        } else {
            entry - tp_distance * level
        };
    }

    let fib_target = calculate_fibonacci_default(candles).and_then(|fib| {
        let prices = fib.sorted_prices();
        if long {
            prices
                .into_iter()
                .find(|&p| p > entry * (1.0 + MIN_TARGET_DISTANCE))
        } else {
            prices
                .into_iter()
                .rev()
                .find(|&p| p < entry * (1.0 - MIN_TARGET_DISTANCE))
        }
    });

    Ok(TpSlPlan {
        entry,
        stop_loss,
        take_profits,
        fib_target,
        atr,
        risk_percent: sl_distance / entry * 100.0,
    })
}
