pub mod engine;
pub mod planner;
pub mod scoring;

pub use engine::*;
pub use planner::*;
pub use scoring::*;
