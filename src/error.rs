//! Error taxonomy shared by the engine and its collaborators.

use thiserror::Error;

/// Structured failures the engine returns instead of panicking.
///
/// Orchestration code classifies these to decide whether to skip a coin,
/// fall back to defaults, or surface an error payload.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Not enough candle history for the requested computation.
    #[error("insufficient data: need {required} candles, got {got}")]
    InsufficientData { required: usize, got: usize },

    /// A parameter combination that cannot produce a valid result
    /// (e.g. a zero stop distance).
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A persisted document does not exist. Callers resolve this to a
    /// default state rather than treating it as fatal.
    #[error("not found: {0}")]
    NotFound(String),

    /// A market-data fetch failed. Isolated per coin/timeframe so a batch
    /// scan can continue.
    #[error("external fetch failed: {0}")]
    ExternalFetchFailure(String),

    /// Persistence backend failure (connection, serialization).
    #[error("state store error: {0}")]
    Store(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
