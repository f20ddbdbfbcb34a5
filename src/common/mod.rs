pub mod math;
pub mod serde_ext;
