//! HyperSignals Worker
//!
//! Runs the recurring jobs as one long-lived process: the market scan,
//! the outcome/position check, and the per-coin calibration sweep.
//! Requires Redis for durable state; can be run alongside other readers.

use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use hypersignals::clock::SystemClock;
use hypersignals::logging;
use hypersignals::scan::Scanner;
use hypersignals::services::market_data::HyperliquidProvider;
use hypersignals::services::store::{MemoryStore, RedisStore, StateStore};
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

const SCAN_INTERVAL_SECS: u64 = 120;
const CHECK_INTERVAL_SECS: u64 = 30;
const CALIBRATE_INTERVAL_SECS: u64 = 6 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init_logging();

    info!("Starting HyperSignals Worker");

    let store: Arc<dyn StateStore> = match env::var("REDIS_URL") {
        Ok(url) => {
            info!("Connecting to Redis state store");
            Arc::new(RedisStore::new(&url)?)
        }
        Err(_) => {
            warn!("REDIS_URL not set, state will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };
    let market = Arc::new(HyperliquidProvider::new());
    let scanner = Arc::new(Scanner::new(market, store, Arc::new(SystemClock)));

    let scan_interval_secs: u64 = env::var("SCAN_INTERVAL_SECONDS")
        .ok()
        .and_then(|i| i.parse().ok())
        .unwrap_or(SCAN_INTERVAL_SECS);
    info!(
        scan_interval = scan_interval_secs,
        check_interval = CHECK_INTERVAL_SECS,
        "Scan every {}s, check every {}s",
        scan_interval_secs,
        CHECK_INTERVAL_SECS
    );

    let mut scan_timer = interval(Duration::from_secs(scan_interval_secs));
    let mut check_timer = interval(Duration::from_secs(CHECK_INTERVAL_SECS));
    let mut calibrate_timer = interval(Duration::from_secs(CALIBRATE_INTERVAL_SECS));
    scan_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    check_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    calibrate_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = scan_timer.tick() => {
                if let Err(e) = scanner.scan().await {
                    error!(error = %e, "scan cycle failed: {}", e);
                }
            }
            _ = check_timer.tick() => {
                if let Err(e) = scanner.check().await {
                    error!(error = %e, "check cycle failed: {}", e);
                }
            }
            _ = calibrate_timer.tick() => {
                if let Err(e) = scanner.calibrate().await {
                    error!(error = %e, "calibration cycle failed: {}", e);
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received, exiting");
                break;
            }
        }
    }

    Ok(())
}
