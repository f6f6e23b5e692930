use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::debug;

use crate::adapters::traits::*;
use crate::blockchain::rpc::ChainClient;
use crate::types::{
    Approval, ChainConfig, ChainId, DexKind, FeeTier, HopParams, RouteCandidate, SwapCalldata,
    SwapParams, TxRequest,
};

/// 스크립트된 단일 홉 견적
#[derive(Debug, Clone)]
pub enum MockQuote {
    /// 입력량과 무관한 고정 출력
    Fixed(U256),
    /// amount_in * numerator / denominator
    Rate(u64, u64),
    /// 유동성 없음
    NoLiquidity,
    /// 전송 실패
    Fail(String),
    Delay(Duration, Box<MockQuote>),
}

impl MockQuote {
    pub fn fixed(amount: u64) -> Self {
        MockQuote::Fixed(U256::from(amount))
    }

    pub fn delayed(delay: Duration, inner: MockQuote) -> Self {
        MockQuote::Delay(delay, Box::new(inner))
    }
}

/// 체인 호출 없이 견적을 돌려주는 플러그인
///
/// 정규화된 (token_in, token_out) 쌍으로 응답을 찾는다. 응답이 없으면 유동성 없음.
pub struct MockPlugin {
    id: String,
    name: String,
    kind: DexKind,
    chains: Vec<ChainId>,
    router: Address,
    fee: FeeTier,
    multi_hop: bool,
    quotes: Mutex<HashMap<(Address, Address), MockQuote>>,
    calls: AtomicUsize,
}

impl MockPlugin {
    pub fn new(id: &str, chains: &[ChainId]) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: DexKind::ConcentratedLiquidity,
            chains: chains.to_vec(),
            router: Address::repeat_byte(0xee),
            fee: FeeTier(3_000),
            multi_hop: true,
            quotes: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fee(mut self, fee: FeeTier) -> Self {
        self.fee = fee;
        self
    }

    pub fn without_multi_hop(mut self) -> Self {
        self.multi_hop = false;
        self
    }

    pub fn quote(self, token_in: Address, token_out: Address, quote: MockQuote) -> Self {
        self.set_quote(token_in, token_out, quote);
        self
    }

    pub fn set_quote(&self, token_in: Address, token_out: Address, quote: MockQuote) {
        self.quotes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((token_in, token_out), quote);
    }

    /// quote_single_hop 호출 횟수
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, token_in: Address, token_out: Address) -> MockQuote {
        self.quotes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(token_in, token_out))
            .cloned()
            .unwrap_or(MockQuote::NoLiquidity)
    }
}

#[async_trait]
impl DexPlugin for MockPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DexKind {
        self.kind
    }

    fn supported_chains(&self) -> Vec<ChainId> {
        self.chains.clone()
    }

    fn router_address(&self, _chain_id: ChainId) -> Option<Address> {
        Some(self.router)
    }

    fn supports_multi_hop(&self) -> bool {
        self.multi_hop
    }

    async fn quote_single_hop(
        &self,
        _client: &dyn ChainClient,
        chain: &ChainConfig,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Option<RouteCandidate>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(ctx) = self.hop_context(chain, token_in, token_out, amount_in)? else {
            return Ok(None);
        };

        let mut quote = self.lookup(ctx.token_in, ctx.token_out);
        loop {
            let amount_out = match quote {
                MockQuote::Fixed(amount) => amount,
                MockQuote::Rate(numerator, denominator) => {
                    if denominator == 0 {
                        return Ok(None);
                    }
                    ctx.amount_in * U256::from(numerator) / U256::from(denominator)
                }
                MockQuote::NoLiquidity => return Ok(None),
                MockQuote::Fail(reason) => return Err(AdapterError::QuoteCallFailed(reason)),
                MockQuote::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    quote = *inner;
                    continue;
                }
            };

            debug!("🎭 [MOCK] {} 견적 {} -> {}", self.id, ctx.amount_in, amount_out);
            return Ok(ctx.candidate(amount_out, self.router, self.fee.detail(), HopParams::FeeTier {
                fee: self.fee,
            }));
        }
    }

    /// 경로를 packed path 로 담은 가짜 swap 트랜잭션
    fn build_swap_calldata(
        &self,
        chain: &ChainConfig,
        params: &SwapParams,
    ) -> Result<SwapCalldata, AdapterError> {
        let tokens = validate_swap_params(&self.id, chain, params)?;
        let fees = params
            .hops
            .iter()
            .map(hop_fee_tier)
            .collect::<Result<Vec<_>, _>>()?;
        let data = encode_v3_path(&tokens, &fees)?;

        let native_in = crate::common::normalize::is_native(params.token_in);
        let approvals = if native_in {
            Vec::new()
        } else {
            vec![Approval::Erc20 {
                token: params.token_in,
                spender: self.router,
                amount: params.amount_in,
            }]
        };

        Ok(SwapCalldata {
            pre_transactions: Vec::new(),
            approvals,
            swap: TxRequest {
                to: self.router,
                data,
                value: if native_in { params.amount_in } else { U256::ZERO },
                description: Some(format!("{} mock swap", self.name)),
            },
        })
    }
}
