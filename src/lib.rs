// xCrack Swap Router Library

pub mod adapters;
pub mod api;
pub mod blockchain;
pub mod common;
pub mod config;
pub mod dex;
pub mod mocks;
pub mod utils;

// Core types
pub mod constants;
pub mod types;

// Re-exports for convenience
pub use adapters::{DexPlugin, PluginRegistry};
pub use config::Config;
pub use dex::{QuoteService, RouteAggregator, SwapExecutionBuilder};
