pub mod market_data;
pub mod store;

pub use market_data::*;
pub use store::*;
