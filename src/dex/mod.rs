pub mod aggregator;
pub mod execution;
pub mod metrics;
pub mod service;

pub use aggregator::{AggregationResult, AggregatorSettings, RouteAggregator};
pub use execution::{ExecutionOptions, SwapExecutionBuilder};
pub use metrics::confidence_score;
pub use service::QuoteService;

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::types::{ChainId, ErrorCode};

/// 요청 단위 에러
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("chain {0} is not configured")]
    UnknownChain(ChainId),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no route found")]
    NoRouteFound,

    #[error("execution build failed: {0}")]
    Execution(AdapterError),
}

impl AggregatorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AggregatorError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            AggregatorError::UnknownChain(_) | AggregatorError::Configuration(_) => {
                ErrorCode::Configuration
            }
            AggregatorError::NoRouteFound => ErrorCode::NoRoute,
            AggregatorError::Execution(_) => ErrorCode::ExecutionBuildFailed,
        }
    }
}
