//! Trend indicators: EMA, ADX, Ichimoku

pub mod adx;
pub mod ema;
pub mod ichimoku;

pub use adx::*;
pub use ema::*;
pub use ichimoku::*;
