// Library crate for hoopstats.
//
// Re-exports all modules so that integration tests (and the binary) can
// access the public API.

pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod heatmap;
pub mod pipeline;
