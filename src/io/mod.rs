pub mod dataset;
pub mod export;
