//! Scan orchestration: the multi-coin sweep, the outcome/position check,
//! and the per-coin calibration pass.
//!
//! All state mutation goes through one async mutex so overlapping cycles
//! cannot interleave their read-modify-write against the store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backtest::optimizer::optimize_parameters;
use crate::clock::Clock;
use crate::config::{
    BacktestConfig, CalibrationConfig, LearningConfig, OptimizerGrid, PaperConfig, RiskDefaults,
    ScanConfig, SignalConfig, Timeframe,
};
use crate::error::EngineResult;
use crate::learning::{check_outcomes, record_signal};
use crate::models::candle::Candle;
use crate::models::learning::CoinConfig;
use crate::models::position::PortfolioState;
use crate::paper::{open_position, update_positions};
use crate::services::market_data::MarketDataProvider;
use crate::services::store::StateStore;
use crate::models::signal::{Signal, TpSlPlan};
use crate::signals::engine::generate_signal;
use crate::signals::planner::calculate_tpsl;

/// Candles fetched per timeframe; enough for full warm-up plus slack.
const FETCH_BARS: i64 = 300;

/// One actionable signal from a sweep, with everything the presentation
/// layer needs to show it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub coin: String,
    pub price: f64,
    pub signal: Signal,
    pub plan: TpSlPlan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub recorded: usize,
    pub opened: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Recorded signals, sorted by confidence descending.
    pub signals: Vec<ScanRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckSummary {
    pub resolved_outcomes: usize,
    pub closed_positions: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub calibrated: usize,
    pub rejected: usize,
    pub skipped: usize,
}

/// Runs the three recurring jobs against shared durable state.
pub struct Scanner {
    market: Arc<dyn MarketDataProvider>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    pub scan_config: ScanConfig,
    pub paper_config: PaperConfig,
    pub learning_config: LearningConfig,
    pub calibration_config: CalibrationConfig,
    pub optimizer_grid: OptimizerGrid,
    state_lock: tokio::sync::Mutex<()>,
}

impl Scanner {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            market,
            store,
            clock,
            scan_config: ScanConfig::default(),
            paper_config: PaperConfig::default(),
            learning_config: LearningConfig::default(),
            calibration_config: CalibrationConfig::default(),
            optimizer_grid: OptimizerGrid::default(),
            state_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Sweeps the top coins by volume: generates a signal per coin,
    /// records the strong ones into learner history, and feeds them to
    /// the paper account. Coins that fail to fetch are isolated; coins
    /// left when the time budget runs out are skipped.
    pub async fn scan(&self) -> EngineResult<ScanSummary> {
        let _guard = self.state_lock.lock().await;
        let started = Instant::now();
        let now = self.clock.now();

        let coins = self
            .market
            .top_coins_by_volume(self.scan_config.top_coins)
            .await?;
        let total = coins.len();

        let mut learning = self
            .store
            .load_learning_state()
            .await?
            .unwrap_or_default();
        let mut portfolio = self
            .store
            .load_portfolio()
            .await?
            .unwrap_or_else(|| PortfolioState::new(self.paper_config.starting_balance, now));
        let coin_configs = self.store.load_coin_configs().await?;

        let signal_config = SignalConfig {
            indicator_weights: learning.weights.clone(),
            ..SignalConfig::default()
        };

        let mut summary = ScanSummary::default();
        let mut fetches = stream::iter(coins.into_iter().map(|coin| {
            let market = Arc::clone(&self.market);
            async move {
                let candles = fetch_all_timeframes(market.as_ref(), &coin, now).await;
                (coin, candles)
            }
        }))
        .buffer_unordered(self.scan_config.batch_size);

        while let Some((coin, candles_by_tf)) = fetches.next().await {
            if started.elapsed().as_secs() >= self.scan_config.time_budget_secs {
                summary.skipped = total - summary.scanned;
                warn!(
                    skipped = summary.skipped,
                    "scan time budget exhausted, skipping {} coin(s)",
                    summary.skipped
                );
                break;
            }
            summary.scanned += 1;

            let signal = match generate_signal(&coin, &candles_by_tf, &signal_config, now) {
                Ok(signal) => signal,
                Err(err) => {
                    warn!(coin = %coin, error = %err, "skipping {}: {}", coin, err);
                    summary.errors += 1;
                    continue;
                }
            };
            if signal.direction.is_neutral()
                || signal.confidence < self.scan_config.min_record_confidence
            {
                continue;
            }

            let coin_config = coin_configs.get(&coin);
            let risk = RiskDefaults {
                atr_multiplier_sl: coin_config
                    .map(|c| c.atr_multiplier_sl)
                    .unwrap_or(learning.atr_multiplier_sl),
                rr_multiplier: coin_config
                    .map(|c| c.rr_multiplier)
                    .unwrap_or(learning.rr_multiplier),
                ..RiskDefaults::default()
            };
            let planning_candles = planning_series(&candles_by_tf);
            let plan = match calculate_tpsl(planning_candles, signal.direction, last_close(planning_candles), &risk) {
                Ok(plan) => plan,
                Err(err) => {
                    warn!(coin = %coin, error = %err, "no TP/SL plan for {}: {}", coin, err);
                    summary.errors += 1;
                    continue;
                }
            };

            record_signal(&mut learning, &signal, &plan, &self.learning_config);
            summary.recorded += 1;

            if open_position(
                &mut portfolio,
                &signal,
                &plan,
                coin_config,
                &self.paper_config,
                now,
            )
            .is_some()
            {
                summary.opened += 1;
            }

            summary.signals.push(ScanRecord {
                coin,
                price: last_close(planning_candles),
                signal,
                plan,
            });
        }
        summary.signals.sort_by(|a, b| {
            b.signal
                .confidence
                .partial_cmp(&a.signal.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.store.save_learning_state(&learning).await?;
        self.store.save_portfolio(&portfolio).await?;

        info!(
            scanned = summary.scanned,
            recorded = summary.recorded,
            opened = summary.opened,
            skipped = summary.skipped,
            errors = summary.errors,
            "scan done: {}/{} coins, {} recorded, {} opened",
            summary.scanned,
            total,
            summary.recorded,
            summary.opened
        );
        Ok(summary)
    }

    /// Resolves pending signal outcomes and settles open paper positions
    /// against current mids, as one atomic read-modify-write.
    pub async fn check(&self) -> EngineResult<CheckSummary> {
        let _guard = self.state_lock.lock().await;
        let now = self.clock.now();
        let prices = self.market.get_all_mids().await?;

        let mut learning = self
            .store
            .load_learning_state()
            .await?
            .unwrap_or_default();
        let resolved = check_outcomes(&mut learning, &prices, &self.learning_config, now);
        self.store.save_learning_state(&learning).await?;

        let mut portfolio = self
            .store
            .load_portfolio()
            .await?
            .unwrap_or_else(|| PortfolioState::new(self.paper_config.starting_balance, now));
        let closed = update_positions(&mut portfolio, &prices, &self.paper_config, now);
        self.store.save_portfolio(&portfolio).await?;

        if resolved > 0 || !closed.is_empty() {
            info!(
                resolved,
                closed = closed.len(),
                "check done: {} outcome(s) resolved, {} position(s) closed",
                resolved,
                closed.len()
            );
        }
        Ok(CheckSummary {
            resolved_outcomes: resolved,
            closed_positions: closed.len(),
        })
    }

    /// Grid-searches per-coin parameters on recent history for the top
    /// coins and stores the winners that pass the quality gate.
    pub async fn calibrate(&self) -> EngineResult<CalibrationSummary> {
        let started = Instant::now();
        let now = self.clock.now();
        let config = &self.calibration_config;

        let coins = self.market.top_coins_by_volume(config.top_n).await?;
        let total = coins.len();
        let mut summary = CalibrationSummary::default();

        // Calibration judges parameters under the same weights the scan
        // will trade with.
        let learning = self
            .store
            .load_learning_state()
            .await?
            .unwrap_or_default();
        let signal_config = SignalConfig {
            indicator_weights: learning.weights.clone(),
            ..SignalConfig::default()
        };

        for coin in coins {
            if started.elapsed().as_secs() >= config.time_budget_secs {
                summary.skipped = total - summary.calibrated - summary.rejected;
                warn!(
                    skipped = summary.skipped,
                    "calibration time budget exhausted, skipping {} coin(s)",
                    summary.skipped
                );
                break;
            }

            let start = now - chrono::Duration::days(config.history_days);
            let candles = match self
                .market
                .get_candles(&coin, config.timeframe, start, now)
                .await
            {
                Ok(candles) => candles,
                Err(err) => {
                    warn!(coin = %coin, error = %err, "calibration fetch failed for {}", coin);
                    summary.rejected += 1;
                    continue;
                }
            };

            let base = BacktestConfig {
                timeframe: config.timeframe,
                ..BacktestConfig::default()
            };
            let ranked = optimize_parameters(&candles, &self.optimizer_grid, &base, &signal_config);
            let best = match ranked.first() {
                Some(best) => best,
                None => {
                    summary.rejected += 1;
                    continue;
                }
            };

            // Quality gate: a winner from too few trades or a losing
            // profit factor is not worth overriding the defaults.
            if best.result.total_trades < config.min_trades
                || best.result.profit_factor < config.min_profit_factor
            {
                summary.rejected += 1;
                continue;
            }

            let coin_config = CoinConfig {
                min_confidence: best.min_confidence,
                atr_multiplier_sl: best.atr_multiplier_sl,
                rr_multiplier: best.rr_multiplier,
                max_hold_bars: best.max_hold_bars,
                backtest_win_rate: best.result.win_rate,
                backtest_profit_factor: best.result.profit_factor,
                backtest_return_pct: best.result.total_return_pct,
                backtest_trades: best.result.total_trades,
                calibrated_at: now,
                candle_count: candles.len(),
            };
            self.store.save_coin_config(&coin, &coin_config).await?;
            summary.calibrated += 1;
            info!(
                coin = %coin,
                min_confidence = coin_config.min_confidence,
                win_rate = coin_config.backtest_win_rate,
                "calibrated {} (win rate {:.2})",
                coin,
                coin_config.backtest_win_rate
            );
        }

        Ok(summary)
    }
}

/// Fetches every timeframe for one coin. A failed fetch logs and yields
/// an empty series so the other timeframes still count.
async fn fetch_all_timeframes(
    market: &dyn MarketDataProvider,
    coin: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> BTreeMap<Timeframe, Vec<Candle>> {
    let mut out = BTreeMap::new();
    for tf in Timeframe::ALL {
        let start = now - tf.duration() * FETCH_BARS as i32;
        let candles = match market.get_candles(coin, tf, start, now).await {
            Ok(candles) => candles,
            Err(err) => {
                warn!(coin = %coin, timeframe = tf.label(), error = %err, "fetch failed");
                Vec::new()
            }
        };
        out.insert(tf, candles);
    }
    out
}

/// The series TP/SL planning runs on: 4h when present, else the longest.
fn planning_series(candles_by_tf: &BTreeMap<Timeframe, Vec<Candle>>) -> &[Candle] {
    candles_by_tf
        .get(&Timeframe::H4)
        .filter(|c| !c.is_empty())
        .map(|c| c.as_slice())
        .unwrap_or_else(|| {
            candles_by_tf
                .values()
                .max_by_key(|c| c.len())
                .map(|c| c.as_slice())
                .unwrap_or(&[])
        })
}

fn last_close(candles: &[Candle]) -> f64 {
    candles.last().map(|c| c.close).unwrap_or(0.0)
}
