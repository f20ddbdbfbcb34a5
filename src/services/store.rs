//! Persistent state store interface with Redis and in-memory backends.

use std::collections::BTreeMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::models::learning::{CoinConfig, LearningState};
use crate::models::position::PortfolioState;

const LEARNING_KEY: &str = "hypersignals:learning";
const PORTFOLIO_KEY: &str = "hypersignals:portfolio";
const COIN_CONFIG_HASH: &str = "hypersignals:coin_configs";

/// Durable state shared across scan cycles. Missing documents load as
/// `None`; callers fall back to defaults.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_learning_state(&self) -> EngineResult<Option<LearningState>>;
    async fn save_learning_state(&self, state: &LearningState) -> EngineResult<()>;

    async fn load_portfolio(&self) -> EngineResult<Option<PortfolioState>>;
    async fn save_portfolio(&self, state: &PortfolioState) -> EngineResult<()>;

    async fn load_coin_configs(&self) -> EngineResult<BTreeMap<String, CoinConfig>>;
    async fn save_coin_config(&self, coin: &str, config: &CoinConfig) -> EngineResult<()>;
}

/// Redis-backed store. Documents are JSON blobs; per-coin configs live
/// in one hash keyed by coin.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(url: &str) -> EngineResult<Self> {
        let client = redis::Client::open(url).map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> EngineResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> EngineResult<Option<T>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| EngineError::Store(format!("corrupt document at {}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> EngineResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| EngineError::Store(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, json)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn load_learning_state(&self) -> EngineResult<Option<LearningState>> {
        self.get_json(LEARNING_KEY).await
    }

    async fn save_learning_state(&self, state: &LearningState) -> EngineResult<()> {
        self.set_json(LEARNING_KEY, state).await
    }

    async fn load_portfolio(&self) -> EngineResult<Option<PortfolioState>> {
        self.get_json(PORTFOLIO_KEY).await
    }

    async fn save_portfolio(&self, state: &PortfolioState) -> EngineResult<()> {
        self.set_json(PORTFOLIO_KEY, state).await
    }

    async fn load_coin_configs(&self) -> EngineResult<BTreeMap<String, CoinConfig>> {
        let mut conn = self.connection().await?;
        let raw: BTreeMap<String, String> = conn
            .hgetall(COIN_CONFIG_HASH)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        let mut configs = BTreeMap::new();
        for (coin, json) in raw {
            let config: CoinConfig = serde_json::from_str(&json).map_err(|e| {
                EngineError::Store(format!("corrupt coin config for {}: {}", coin, e))
            })?;
            configs.insert(coin, config);
        }
        Ok(configs)
    }

    async fn save_coin_config(&self, coin: &str, config: &CoinConfig) -> EngineResult<()> {
        let json =
            serde_json::to_string(config).map_err(|e| EngineError::Store(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.hset::<_, _, _, ()>(COIN_CONFIG_HASH, coin, json)
            .await
            .map_err(|e| EngineError::Store(e.to_string()))
    }
}

/// In-memory store for tests and local single-process runs.
#[derive(Default)]
pub struct MemoryStore {
    learning: RwLock<Option<LearningState>>,
    portfolio: RwLock<Option<PortfolioState>>,
    coin_configs: RwLock<BTreeMap<String, CoinConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_learning_state(&self) -> EngineResult<Option<LearningState>> {
        Ok(self.learning.read().await.clone())
    }

    async fn save_learning_state(&self, state: &LearningState) -> EngineResult<()> {
        *self.learning.write().await = Some(state.clone());
        Ok(())
    }

    async fn load_portfolio(&self) -> EngineResult<Option<PortfolioState>> {
        Ok(self.portfolio.read().await.clone())
    }

    async fn save_portfolio(&self, state: &PortfolioState) -> EngineResult<()> {
        *self.portfolio.write().await = Some(state.clone());
        Ok(())
    }

    async fn load_coin_configs(&self) -> EngineResult<BTreeMap<String, CoinConfig>> {
        Ok(self.coin_configs.read().await.clone())
    }

    async fn save_coin_config(&self, coin: &str, config: &CoinConfig) -> EngineResult<()> {
        self.coin_configs
            .write()
            .await
            .insert(coin.to_string(), config.clone());
        Ok(())
    }
}
