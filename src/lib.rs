pub mod accumulator;
pub mod cli;
pub mod error;
pub mod line;
pub mod metrics;
pub mod properties;
pub mod tree;
