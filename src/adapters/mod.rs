pub mod algebra;
pub mod curve;
pub mod factory;
pub mod traits;
pub mod uniswap_v2;
pub mod uniswap_v3;
pub mod uniswap_v4;

// Re-exports
pub use algebra::AlgebraAdapter;
pub use curve::{StableSwapAdapter, StableSwapPool};
pub use factory::{default_specs, DexInfo, PluginRegistry, PluginSpec};
pub use traits::{AdapterError, DexPlugin, HopContext, QuoteCall};
pub use uniswap_v2::ConstantProductAdapter;
pub use uniswap_v3::{ConcentratedLiquidityAdapter, RouterVersion};
pub use uniswap_v4::SingletonPoolAdapter;
