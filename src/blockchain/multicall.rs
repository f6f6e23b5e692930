use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use super::abi::IMulticall3;
use super::rpc::{ChainClient, RpcError};
use crate::constants::MULTICALL3;

/// 배치에 넣을 단일 읽기 호출
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub target: Address,
    pub call_data: Bytes,
}

impl CallRequest {
    pub fn new(target: Address, call_data: impl Into<Bytes>) -> Self {
        Self { target, call_data: call_data.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MulticallError {
    #[error("sub-call reverted")]
    Reverted,
    #[error("batch request failed: {0}")]
    Batch(RpcError),
    #[error("malformed aggregate3 response: {0}")]
    Decode(String),
}

/// 여러 읽기 호출을 Multicall3 aggregate3 로 묶어 실행
///
/// 결과는 입력과 같은 순서이며, 한 슬롯의 실패는 다른 슬롯에 영향을 주지 않는다.
/// 호출이 하나면 직접 eth_call 로 보내고, 배치 크기를 넘으면 청크를 동시에 보낸다.
pub async fn multicall(
    client: &dyn ChainClient,
    calls: &[CallRequest],
) -> Vec<Result<Bytes, MulticallError>> {
    match calls.len() {
        0 => Vec::new(),
        1 => {
            let call = &calls[0];
            vec![client
                .call(call.target, call.call_data.clone())
                .await
                .map_err(|e| match e {
                    RpcError::Reverted(_) => MulticallError::Reverted,
                    other => MulticallError::Batch(other),
                })]
        }
        _ => {
            let batch_size = client.multicall_batch_size().max(1);
            let chunks = calls.chunks(batch_size).map(|chunk| aggregate_chunk(client, chunk));
            join_all(chunks).await.into_iter().flatten().collect()
        }
    }
}

async fn aggregate_chunk(
    client: &dyn ChainClient,
    chunk: &[CallRequest],
) -> Vec<Result<Bytes, MulticallError>> {
    let calls: Vec<IMulticall3::Call3> = chunk
        .iter()
        .map(|c| IMulticall3::Call3 {
            target: c.target,
            allowFailure: true,
            callData: c.call_data.clone(),
        })
        .collect();
    let data = IMulticall3::aggregate3Call { calls }.abi_encode();

    let output = match client.call(MULTICALL3, data.into()).await {
        Ok(output) => output,
        Err(e) => {
            warn!("⚠️ multicall 배치 실패 ({} calls): {}", chunk.len(), e);
            return vec![Err(MulticallError::Batch(e)); chunk.len()];
        }
    };

    let results = match IMulticall3::aggregate3Call::abi_decode_returns(&output) {
        Ok(results) if results.len() == chunk.len() => results,
        Ok(results) => {
            let reason = format!("expected {} results, got {}", chunk.len(), results.len());
            return vec![Err(MulticallError::Decode(reason)); chunk.len()];
        }
        Err(e) => return vec![Err(MulticallError::Decode(e.to_string())); chunk.len()],
    };

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        debug!("multicall: {}/{} sub-call 실패", failed, chunk.len());
    }

    results
        .into_iter()
        .map(|r| if r.success { Ok(r.returnData) } else { Err(MulticallError::Reverted) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockChainClient, MockResponse};
    use alloy::primitives::U256;
    use alloy::sol_types::SolValue;

    fn request(byte: u8) -> CallRequest {
        CallRequest::new(Address::repeat_byte(byte), vec![byte, 0xaa])
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = MockChainClient::new(1);
        assert!(multicall(&client, &[]).await.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_call_bypasses_aggregate() {
        let client = MockChainClient::new(1);
        let req = request(1);
        client.respond(req.target, req.call_data.clone(), MockResponse::ok(U256::from(7u64).abi_encode()));

        let results = multicall(&client, &[req]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(U256::abi_decode(results[0].as_ref().unwrap()).unwrap(), U256::from(7u64));
        assert_eq!(client.aggregate_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_isolation_and_order() {
        let client = MockChainClient::new(1);
        let reqs: Vec<CallRequest> = (1..=5).map(request).collect();
        for (i, req) in reqs.iter().enumerate() {
            if i == 2 {
                client.respond(req.target, req.call_data.clone(), MockResponse::Revert);
            } else {
                client.respond(
                    req.target,
                    req.call_data.clone(),
                    MockResponse::ok(U256::from(i as u64).abi_encode()),
                );
            }
        }

        let results = multicall(&client, &reqs).await;
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            if i == 2 {
                assert_eq!(result, &Err(MulticallError::Reverted));
            } else {
                let value = U256::abi_decode(result.as_ref().unwrap()).unwrap();
                assert_eq!(value, U256::from(i as u64));
            }
        }
    }

    #[tokio::test]
    async fn test_chunking_preserves_order() {
        let client = MockChainClient::new(1).with_batch_size(2);
        let reqs: Vec<CallRequest> = (1..=5).map(request).collect();
        for (i, req) in reqs.iter().enumerate() {
            client.respond(
                req.target,
                req.call_data.clone(),
                MockResponse::ok(U256::from(100 + i as u64).abi_encode()),
            );
        }

        let results = multicall(&client, &reqs).await;
        assert_eq!(client.aggregate_count(), 3);
        let values: Vec<U256> = results
            .iter()
            .map(|r| U256::abi_decode(r.as_ref().unwrap()).unwrap())
            .collect();
        let expected: Vec<U256> = (0..5).map(|i| U256::from(100 + i as u64)).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test]
    async fn test_batch_transport_failure_marks_every_slot() {
        let client = MockChainClient::new(1).failing_aggregate();
        let reqs: Vec<CallRequest> = (1..=3).map(request).collect();
        let results = multicall(&client, &reqs).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r, Err(MulticallError::Batch(_)))));
    }
}
