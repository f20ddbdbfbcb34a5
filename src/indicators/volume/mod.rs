//! Volume indicators: OBV, VWAP, Volume Profile

pub mod obv;
pub mod volume_profile;
pub mod vwap;

pub use obv::*;
pub use volume_profile::*;
pub use vwap::*;
