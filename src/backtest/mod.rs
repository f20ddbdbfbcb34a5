pub mod engine;
pub mod optimizer;

pub use engine::*;
pub use optimizer::*;
