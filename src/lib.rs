//! Multi-timeframe crypto signal engine: indicator library, weighted
//! signal scoring, TP/SL planning, backtesting, grid-search calibration,
//! adaptive weight learning, and a simulated trading account.

pub mod backtest;
pub mod clock;
pub mod common;
pub mod config;
pub mod error;
pub mod indicators;
pub mod learning;
pub mod logging;
pub mod models;
pub mod paper;
pub mod scan;
pub mod services;
pub mod signals;
