use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use tracing::debug;

use crate::blockchain::abi::IMulticall3;
use crate::blockchain::rpc::{ChainClient, RpcError};
use crate::constants::{DEFAULT_MULTICALL_BATCH_SIZE, MULTICALL3};
use crate::types::ChainId;

/// 스크립트된 eth_call 응답
#[derive(Debug, Clone)]
pub enum MockResponse {
    Ok(Bytes),
    Revert,
    Transport,
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn ok(data: impl Into<Bytes>) -> Self {
        MockResponse::Ok(data.into())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        MockResponse::Delay(delay, Box::new(inner))
    }
}

/// (to, calldata) 기반 스크립트 체인 클라이언트
///
/// Multicall3 aggregate3 호출은 sub-call 별로 같은 테이블에서 응답을 찾는다.
/// 응답이 없는 호출은 revert 로 처리된다.
pub struct MockChainClient {
    chain_id: ChainId,
    exact: Mutex<HashMap<(Address, Bytes), MockResponse>>,
    by_target: Mutex<HashMap<Address, MockResponse>>,
    batch_size: usize,
    fail_aggregate: bool,
    calls: AtomicUsize,
    aggregates: AtomicUsize,
}

impl MockChainClient {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            exact: Mutex::new(HashMap::new()),
            by_target: Mutex::new(HashMap::new()),
            batch_size: DEFAULT_MULTICALL_BATCH_SIZE,
            fail_aggregate: false,
            calls: AtomicUsize::new(0),
            aggregates: AtomicUsize::new(0),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// aggregate3 요청 자체를 전송 실패로 만든다
    pub fn failing_aggregate(mut self) -> Self {
        self.fail_aggregate = true;
        self
    }

    pub fn respond(&self, target: Address, call_data: impl Into<Bytes>, response: MockResponse) {
        self.exact
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((target, call_data.into()), response);
    }

    /// calldata 와 무관하게 target 으로 가는 모든 호출에 응답
    pub fn respond_target(&self, target: Address, response: MockResponse) {
        self.by_target
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(target, response);
    }

    /// 전체 eth_call 횟수 (aggregate3 는 한 번으로 센다)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn aggregate_count(&self) -> usize {
        self.aggregates.load(Ordering::SeqCst)
    }

    fn lookup(&self, target: Address, data: &Bytes) -> MockResponse {
        let exact = self.exact.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(response) = exact.get(&(target, data.clone())) {
            return response.clone();
        }
        drop(exact);

        let by_target = self.by_target.lock().unwrap_or_else(|e| e.into_inner());
        by_target.get(&target).cloned().unwrap_or(MockResponse::Revert)
    }

    async fn resolve(&self, response: MockResponse) -> Result<Bytes, RpcError> {
        let mut response = response;
        loop {
            match response {
                MockResponse::Ok(data) => return Ok(data),
                MockResponse::Revert => return Err(RpcError::Reverted("mock revert".to_string())),
                MockResponse::Transport => {
                    return Err(RpcError::Transport("mock transport failure".to_string()))
                }
                MockResponse::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }

    async fn aggregate(&self, data: &Bytes) -> Result<Bytes, RpcError> {
        self.aggregates.fetch_add(1, Ordering::SeqCst);
        if self.fail_aggregate {
            return Err(RpcError::Transport("mock aggregate failure".to_string()));
        }

        let request = IMulticall3::aggregate3Call::abi_decode(data)
            .map_err(|e| RpcError::Reverted(e.to_string()))?;

        let mut results = Vec::with_capacity(request.calls.len());
        for call in request.calls {
            let response = self.lookup(call.target, &call.callData);
            let result = match self.resolve(response).await {
                Ok(data) => IMulticall3::Call3Result { success: true, returnData: data },
                Err(_) => IMulticall3::Call3Result { success: false, returnData: Bytes::new() },
            };
            results.push(result);
        }

        Ok(results.abi_encode().into())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if to == MULTICALL3 && data.starts_with(&IMulticall3::aggregate3Call::SELECTOR) {
            return self.aggregate(&data).await;
        }

        debug!("🎭 [MOCK] eth_call to={} ({} bytes)", to, data.len());
        let response = self.lookup(to, &data);
        self.resolve(response).await
    }

    fn multicall_batch_size(&self) -> usize {
        self.batch_size
    }
}
