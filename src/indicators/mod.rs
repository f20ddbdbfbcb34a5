pub mod momentum;
pub mod structure;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use momentum::*;
pub use structure::*;
pub use trend::*;
pub use volatility::*;
pub use volume::*;
