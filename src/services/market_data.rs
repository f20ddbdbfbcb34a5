//! Market data provider interface and the Hyperliquid REST implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::Timeframe;
use crate::error::{EngineError, EngineResult};
use crate::models::candle::Candle;

/// Read access to exchange market data. One implementation talks to
/// Hyperliquid; tests use an in-memory stub.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Historical candles for a coin, oldest first.
    async fn get_candles(
        &self,
        coin: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Candle>>;

    /// Current mid price for every tradeable coin.
    async fn get_all_mids(&self) -> EngineResult<BTreeMap<String, f64>>;

    /// Coin symbols ranked by 24h notional volume, highest first.
    async fn top_coins_by_volume(&self, limit: usize) -> EngineResult<Vec<String>>;
}

const HYPERLIQUID_API: &str = "https://api.hyperliquid.xyz/info";

/// REST client for Hyperliquid's public info endpoint. Every call is a
/// POST with a typed JSON body; transient failures retry with backoff.
pub struct HyperliquidProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    /// Open time in epoch milliseconds.
    t: i64,
    o: String,
    h: String,
    l: String,
    c: String,
    v: String,
}

#[derive(Debug, Deserialize)]
struct UniverseEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<UniverseEntry>,
}

#[derive(Debug, Deserialize)]
struct AssetCtx {
    #[serde(rename = "dayNtlVlm")]
    day_notional_volume: String,
}

impl HyperliquidProvider {
    pub fn new() -> Self {
        Self::with_base_url(HYPERLIQUID_API)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn info(&self, body: serde_json::Value) -> EngineResult<serde_json::Value> {
        let send = || async {
            let response = self
                .client
                .post(&self.base_url)
                .json(&body)
                .send()
                .await?
                .error_for_status()?;
            response.json::<serde_json::Value>().await
        };
        send.retry(ExponentialBuilder::default().with_max_times(3))
            .notify(|err, dur| {
                warn!(error = %err, "info request failed, retrying in {:?}", dur);
            })
            .await
            .map_err(|e| EngineError::ExternalFetchFailure(e.to_string()))
    }
}

impl Default for HyperliquidProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_f64(value: &str) -> EngineResult<f64> {
    value
        .parse::<f64>()
        .map_err(|e| EngineError::ExternalFetchFailure(format!("bad number {:?}: {}", value, e)))
}

#[async_trait]
impl MarketDataProvider for HyperliquidProvider {
    async fn get_candles(
        &self,
        coin: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Candle>> {
        let body = json!({
            "type": "candleSnapshot",
            "req": {
                "coin": coin,
                "interval": timeframe.label(),
                "startTime": start.timestamp_millis(),
                "endTime": end.timestamp_millis(),
            }
        });
        let raw: Vec<RawCandle> = serde_json::from_value(self.info(body).await?)
            .map_err(|e| EngineError::ExternalFetchFailure(e.to_string()))?;

        let mut candles = Vec::with_capacity(raw.len());
        for rc in raw {
            let time = Utc
                .timestamp_millis_opt(rc.t)
                .single()
                .ok_or_else(|| {
                    EngineError::ExternalFetchFailure(format!("bad candle timestamp {}", rc.t))
                })?;
            candles.push(Candle::new(
                parse_f64(&rc.o)?,
                parse_f64(&rc.h)?,
                parse_f64(&rc.l)?,
                parse_f64(&rc.c)?,
                parse_f64(&rc.v)?,
                time,
            ));
        }
        Ok(candles)
    }

    async fn get_all_mids(&self) -> EngineResult<BTreeMap<String, f64>> {
        let raw: BTreeMap<String, String> =
            serde_json::from_value(self.info(json!({"type": "allMids"})).await?)
                .map_err(|e| EngineError::ExternalFetchFailure(e.to_string()))?;

        let mut mids = BTreeMap::new();
        for (coin, price) in raw {
            // Internal index entries like "@123" are not tradeable names.
            if coin.starts_with('@') {
                continue;
            }
            mids.insert(coin.clone(), parse_f64(&price)?);
        }
        Ok(mids)
    }

    async fn top_coins_by_volume(&self, limit: usize) -> EngineResult<Vec<String>> {
        let value = self.info(json!({"type": "metaAndAssetCtxs"})).await?;
        rank_by_volume(value, limit)
    }
}

fn rank_by_volume(value: serde_json::Value, limit: usize) -> EngineResult<Vec<String>> {
    let (meta, ctxs): (Meta, Vec<AssetCtx>) = serde_json::from_value(value)
        .map_err(|e| EngineError::ExternalFetchFailure(e.to_string()))?;

    let mut ranked: Vec<(String, f64)> = meta
        .universe
        .into_iter()
        .zip(ctxs)
        .map(|(entry, ctx)| {
            let volume = ctx.day_notional_volume.parse::<f64>().unwrap_or(0.0);
            (entry.name, volume)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(ranked.into_iter().take(limit).map(|(name, _)| name).collect())
}

/// Fixed market data for tests and offline runs.
#[derive(Default)]
pub struct StaticMarketData {
    pub candles: BTreeMap<(String, Timeframe), Vec<Candle>>,
    pub mids: BTreeMap<String, f64>,
    pub coins: Vec<String>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, coin: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        if !self.coins.contains(&coin.to_string()) {
            self.coins.push(coin.to_string());
        }
        self.candles.insert((coin.to_string(), timeframe), candles);
        self
    }

    pub fn with_mid(mut self, coin: &str, price: f64) -> Self {
        self.mids.insert(coin.to_string(), price);
        self
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn get_candles(
        &self,
        coin: &str,
        timeframe: Timeframe,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> EngineResult<Vec<Candle>> {
        Ok(self
            .candles
            .get(&(coin.to_string(), timeframe))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_all_mids(&self) -> EngineResult<BTreeMap<String, f64>> {
        Ok(self.mids.clone())
    }

    async fn top_coins_by_volume(&self, limit: usize) -> EngineResult<Vec<String>> {
        Ok(self.coins.iter().take(limit).cloned().collect())
    }
}
