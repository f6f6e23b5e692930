//! 테스트 및 로컬 실행용 Mock 구현

pub mod chain_client;
pub mod plugin;

pub use chain_client::{MockChainClient, MockResponse};
pub use plugin::{MockPlugin, MockQuote};
