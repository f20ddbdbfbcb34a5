//! Data models exchanged between the engine and its collaborators.

pub mod candle;
pub mod learning;
pub mod position;
pub mod signal;
