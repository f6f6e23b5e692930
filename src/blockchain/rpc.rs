use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest::Url;
use alloy::transports::TransportError;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::DEFAULT_MULTICALL_BATCH_SIZE;
use crate::types::ChainId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("call reverted: {0}")]
    Reverted(String),
    #[error("rpc call timed out after {0}ms")]
    Timeout(u64),
}

/// 읽기 전용 체인 클라이언트
///
/// 견적 계층이 필요로 하는 것은 `eth_call` 하나뿐이다.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// 최신 블록 기준 eth_call
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;

    /// aggregate3 한 번에 묶을 최대 호출 수
    fn multicall_batch_size(&self) -> usize {
        DEFAULT_MULTICALL_BATCH_SIZE
    }
}

/// alloy HTTP provider 기반 클라이언트
pub struct AlloyChainClient {
    chain_id: ChainId,
    provider: DynProvider,
    call_timeout: Duration,
    multicall_batch_size: usize,
}

impl AlloyChainClient {
    pub fn connect(
        chain_id: ChainId,
        rpc_url: &str,
        call_timeout: Duration,
        multicall_batch_size: usize,
    ) -> anyhow::Result<Self> {
        let url: Url = rpc_url.parse()?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        info!("🔌 RPC 클라이언트 생성: chain={} url={}", chain_id, rpc_url);

        Ok(Self {
            chain_id,
            provider,
            call_timeout,
            multicall_batch_size: multicall_batch_size.max(1),
        })
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);

        match tokio::time::timeout(self.call_timeout, self.provider.call(tx)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                debug!("eth_call 실패: chain={} to={} - {}", self.chain_id, to, e);
                Err(classify_transport_error(e))
            }
            Err(_) => Err(RpcError::Timeout(self.call_timeout.as_millis() as u64)),
        }
    }

    fn multicall_batch_size(&self) -> usize {
        self.multicall_batch_size
    }
}

/// JSON-RPC 에러 응답은 호출 실패(revert), 나머지는 전송 실패로 분류
fn classify_transport_error(error: TransportError) -> RpcError {
    match error.as_error_resp() {
        Some(payload) => RpcError::Reverted(payload.message.to_string()),
        None => RpcError::Transport(error.to_string()),
    }
}

/// 체인별 클라이언트 모음
#[derive(Clone, Default)]
pub struct ChainClients {
    clients: HashMap<ChainId, Arc<dyn ChainClient>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: Arc<dyn ChainClient>) {
        self.clients.insert(client.chain_id(), client);
    }

    pub fn with(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.insert(client);
        self
    }

    pub fn get(&self, chain_id: ChainId) -> Option<Arc<dyn ChainClient>> {
        self.clients.get(&chain_id).cloned()
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for ChainClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClients")
            .field("chains", &self.chain_ids())
            .finish()
    }
}
