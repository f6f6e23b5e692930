use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use tracing::debug;

use crate::blockchain::multicall::{multicall, CallRequest, MulticallError};
use crate::blockchain::rpc::ChainClient;
use crate::common::normalize::{is_native, NormalizeError};
use crate::types::{
    ChainConfig, ChainId, DexKind, FeeTier, HopParams, RouteCandidate, RouteHop, SwapCalldata,
    SwapParams,
};

/// DEX 어댑터 에러 타입
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("Quote call failed: {0}")]
    QuoteCallFailed(String),

    #[error("{dex_id} does not support chain {chain_id}")]
    UnsupportedChain { dex_id: String, chain_id: ChainId },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Calldata generation failed: {0}")]
    CalldataGenerationFailed(String),

    #[error("Unsupported route: {0}")]
    UnsupportedRoute(String),
}

impl From<NormalizeError> for AdapterError {
    fn from(e: NormalizeError) -> Self {
        AdapterError::Configuration(e.to_string())
    }
}

/// 단일 홉 견적 입력 (토큰은 이미 정규화됨)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopContext {
    pub chain_id: ChainId,
    pub dex_id: String,
    pub dex_name: String,
    pub kind: DexKind,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    /// 요청 입력 토큰이 네이티브 코인이었는지
    pub native_in: bool,
    /// 요청 출력 토큰이 네이티브 코인이었는지
    pub native_out: bool,
}

impl HopContext {
    /// 단일 홉 후보 생성 (출력량 0 은 후보가 아님)
    pub fn candidate(
        &self,
        amount_out: U256,
        pool_or_quoter: Address,
        detail: String,
        params: HopParams,
    ) -> Option<RouteCandidate> {
        if amount_out.is_zero() {
            return None;
        }

        Some(RouteCandidate {
            chain_id: self.chain_id,
            dex_id: self.dex_id.clone(),
            dex_name: self.dex_name.clone(),
            amount_in: self.amount_in,
            amount_out,
            hops: vec![RouteHop {
                dex_id: self.dex_id.clone(),
                dex_name: self.dex_name.clone(),
                kind: self.kind,
                detail,
                pool_or_quoter,
                path: vec![self.token_in, self.token_out],
                params,
                amount_in: self.amount_in,
                amount_out,
            }],
        })
    }
}

/// 견적 조회용 읽기 호출과 응답 해석기
pub struct QuoteCall {
    pub target: Address,
    pub call_data: Bytes,
    pub decode: Box<dyn Fn(&[u8]) -> Option<RouteCandidate> + Send + Sync>,
}

impl QuoteCall {
    pub fn new(
        target: Address,
        call_data: impl Into<Bytes>,
        decode: impl Fn(&[u8]) -> Option<RouteCandidate> + Send + Sync + 'static,
    ) -> Self {
        Self {
            target,
            call_data: call_data.into(),
            decode: Box::new(decode),
        }
    }
}

impl std::fmt::Debug for QuoteCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteCall")
            .field("target", &self.target)
            .field("call_data", &self.call_data)
            .finish()
    }
}

/// 견적 호출들을 multicall 로 실행하고 최고 출력 후보를 선택
///
/// 동률이면 먼저 나온 호출(낮은 fee tier)이 이긴다. 모든 슬롯이 전송 실패면 에러.
pub async fn execute_quote_calls(
    client: &dyn ChainClient,
    calls: Vec<QuoteCall>,
) -> Result<Option<RouteCandidate>, AdapterError> {
    if calls.is_empty() {
        return Ok(None);
    }

    let requests: Vec<CallRequest> = calls
        .iter()
        .map(|c| CallRequest::new(c.target, c.call_data.clone()))
        .collect();
    let results = multicall(client, &requests).await;

    if let Some(Err(MulticallError::Batch(e))) = results.first() {
        if results.iter().all(|r| matches!(r, Err(MulticallError::Batch(_)))) {
            return Err(AdapterError::QuoteCallFailed(e.to_string()));
        }
    }

    let mut best: Option<RouteCandidate> = None;
    for (call, result) in calls.iter().zip(results) {
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                debug!("견적 호출 실패 target={}: {}", call.target, e);
                continue;
            }
        };
        let Some(candidate) = (call.decode)(&data) else {
            continue;
        };
        let better = best
            .as_ref()
            .map_or(true, |current| candidate.amount_out > current.amount_out);
        if better {
            best = Some(candidate);
        }
    }

    Ok(best)
}

/// DEX 플러그인 트레이트
///
/// 한 프로토콜 계열에 대해 단일 홉 견적과 실행 calldata 생성을 담당한다.
#[async_trait]
pub trait DexPlugin: Send + Sync {
    /// 고유 식별자 ("uniswap_v3")
    fn id(&self) -> &str;

    /// 표시 이름
    fn name(&self) -> &str;

    fn kind(&self) -> DexKind;

    fn supported_chains(&self) -> Vec<ChainId>;

    fn supports_chain(&self, chain_id: ChainId) -> bool {
        self.supported_chains().contains(&chain_id)
    }

    /// 실행 시 호출 대상 (승인 spender 와 다를 수 있음)
    fn router_address(&self, chain_id: ChainId) -> Option<Address>;

    /// 같은 플러그인 안에서 2홉 경로를 만들 수 있는지
    fn supports_multi_hop(&self) -> bool {
        true
    }

    /// 체인 확인 및 토큰 정규화
    ///
    /// 정규화 후 같은 토큰이거나 입력량이 0 이면 `None`.
    fn hop_context(
        &self,
        chain: &ChainConfig,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Option<HopContext>, AdapterError> {
        if !self.supports_chain(chain.chain_id) {
            return Err(AdapterError::UnsupportedChain {
                dex_id: self.id().to_string(),
                chain_id: chain.chain_id,
            });
        }
        if amount_in.is_zero() {
            return Ok(None);
        }

        let normalized_in = chain.normalize(token_in)?;
        let normalized_out = chain.normalize(token_out)?;
        if normalized_in == normalized_out {
            return Ok(None);
        }

        Ok(Some(HopContext {
            chain_id: chain.chain_id,
            dex_id: self.id().to_string(),
            dex_name: self.name().to_string(),
            kind: self.kind(),
            token_in: normalized_in,
            token_out: normalized_out,
            amount_in,
            native_in: is_native(token_in),
            native_out: is_native(token_out),
        }))
    }

    /// 견적 조회용 읽기 호출 목록 (fee tier 별 등)
    fn build_quote_calls(&self, _ctx: &HopContext) -> Result<Vec<QuoteCall>, AdapterError> {
        Ok(Vec::new())
    }

    /// 단일 홉 견적
    ///
    /// 유동성이 없으면 `Ok(None)`. 설정/전송 오류만 `Err`.
    async fn quote_single_hop(
        &self,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<Option<RouteCandidate>, AdapterError> {
        let Some(ctx) = self.hop_context(chain, token_in, token_out, amount_in)? else {
            return Ok(None);
        };
        let calls = self.build_quote_calls(&ctx)?;
        execute_quote_calls(client, calls).await
    }

    /// 실행 calldata 생성
    fn build_swap_calldata(
        &self,
        chain: &ChainConfig,
        params: &SwapParams,
    ) -> Result<SwapCalldata, AdapterError>;
}

/// 실행 입력 검증 후 경로 토큰 목록 반환
pub fn validate_swap_params(
    dex_id: &str,
    chain: &ChainConfig,
    params: &SwapParams,
) -> Result<Vec<Address>, AdapterError> {
    let fail = |msg: String| Err(AdapterError::CalldataGenerationFailed(msg));

    if params.chain_id != chain.chain_id {
        return fail(format!(
            "chain mismatch: params {} vs config {}",
            params.chain_id, chain.chain_id
        ));
    }
    if params.hops.is_empty() {
        return fail("route has no hops".to_string());
    }
    if params.amount_in.is_zero() {
        return fail("amount in is zero".to_string());
    }
    if let Some(hop) = params.hops.iter().find(|h| h.dex_id != dex_id) {
        return fail(format!("hop belongs to {}, not {}", hop.dex_id, dex_id));
    }

    let tokens = route_tokens(&params.hops)
        .ok_or_else(|| AdapterError::CalldataGenerationFailed("broken hop path".to_string()))?;

    let expected_in = chain.normalize(params.token_in)?;
    let expected_out = chain.normalize(params.token_out)?;
    if tokens.first() != Some(&expected_in) || tokens.last() != Some(&expected_out) {
        return fail("route endpoints do not match swap tokens".to_string());
    }

    Ok(tokens)
}

/// 연속된 홉 경로를 토큰 목록으로 펼침 (A->B, B->C => [A, B, C])
pub fn route_tokens(hops: &[RouteHop]) -> Option<Vec<Address>> {
    let mut tokens: Vec<Address> = Vec::with_capacity(hops.len() + 1);
    for hop in hops {
        if hop.path.len() < 2 {
            return None;
        }
        match tokens.last() {
            None => tokens.extend_from_slice(&hop.path),
            Some(last) if *last == hop.path[0] => tokens.extend_from_slice(&hop.path[1..]),
            Some(_) => return None,
        }
    }
    Some(tokens)
}

/// fee tier 파라미터와 표시 문자열이 일치하는지 확인
pub fn hop_fee_tier(hop: &RouteHop) -> Result<FeeTier, AdapterError> {
    let fee = match &hop.params {
        HopParams::FeeTier { fee } => *fee,
        HopParams::Singleton { fee, .. } => *fee,
        other => {
            return Err(AdapterError::CalldataGenerationFailed(format!(
                "hop has no fee tier: {:?}",
                other
            )))
        }
    };
    if fee.pips() > FeeTier::MAX {
        return Err(AdapterError::CalldataGenerationFailed(format!("fee out of range: {}", fee.pips())));
    }
    let shown = FeeTier::from_detail(&hop.detail)
        .map_err(|e| AdapterError::CalldataGenerationFailed(e.to_string()))?;
    if shown != fee {
        return Err(AdapterError::CalldataGenerationFailed(format!(
            "detail '{}' disagrees with fee {}",
            hop.detail,
            fee.pips()
        )));
    }
    Ok(fee)
}

/// V3 packed path: token(20) | fee(3, big-endian) | token(20) ...
pub fn encode_v3_path(tokens: &[Address], fees: &[FeeTier]) -> Result<Bytes, AdapterError> {
    if tokens.len() < 2 || fees.len() + 1 != tokens.len() {
        return Err(AdapterError::CalldataGenerationFailed(format!(
            "path needs n tokens and n-1 fees, got {} / {}",
            tokens.len(),
            fees.len()
        )));
    }

    let mut path = Vec::with_capacity(20 * tokens.len() + 3 * fees.len());
    for (i, token) in tokens.iter().enumerate() {
        path.extend_from_slice(token.as_slice());
        if let Some(fee) = fees.get(i) {
            path.extend_from_slice(&fee.pips().to_be_bytes()[1..]);
        }
    }
    Ok(path.into())
}

/// Algebra packed path: 주소만 이어 붙인다
pub fn encode_packed_path(tokens: &[Address]) -> Bytes {
    tokens
        .iter()
        .flat_map(|t| t.as_slice().iter().copied())
        .collect::<Vec<u8>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::chains::builtin_chain;
    use crate::constants::{NATIVE_TOKEN, USDC_MAINNET, WETH_MAINNET};

    fn hop(dex_id: &str, path: Vec<Address>, fee: u32) -> RouteHop {
        RouteHop {
            dex_id: dex_id.to_string(),
            dex_name: dex_id.to_string(),
            kind: DexKind::ConcentratedLiquidity,
            detail: FeeTier(fee).detail(),
            pool_or_quoter: Address::ZERO,
            path,
            params: HopParams::FeeTier { fee: FeeTier(fee) },
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
        }
    }

    #[test]
    fn test_encode_v3_path_layout() {
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        let c = Address::repeat_byte(0xcc);

        let path = encode_v3_path(&[a, b, c], &[FeeTier(500), FeeTier(3_000)]).unwrap();
        assert_eq!(path.len(), 20 * 3 + 3 * 2);
        assert_eq!(&path[..20], a.as_slice());
        assert_eq!(&path[20..23], &[0x00, 0x01, 0xf4]);
        assert_eq!(&path[23..43], b.as_slice());
        assert_eq!(&path[43..46], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&path[46..], c.as_slice());

        assert!(encode_v3_path(&[a], &[]).is_err());
        assert!(encode_v3_path(&[a, b], &[]).is_err());
    }

    #[test]
    fn test_encode_packed_path() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);
        let path = encode_packed_path(&[a, b]);
        assert_eq!(path.len(), 40);
        assert_eq!(&path[20..], b.as_slice());
    }

    #[test]
    fn test_route_tokens() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);
        let c = Address::repeat_byte(0x03);
        let hops = vec![hop("x", vec![a, b], 500), hop("x", vec![b, c], 500)];
        assert_eq!(route_tokens(&hops), Some(vec![a, b, c]));

        let broken = vec![hop("x", vec![a, b], 500), hop("x", vec![c, a], 500)];
        assert_eq!(route_tokens(&broken), None);
    }

    #[test]
    fn test_hop_fee_tier_detects_mismatch() {
        let mut h = hop("x", vec![Address::ZERO, Address::repeat_byte(1)], 500);
        assert_eq!(hop_fee_tier(&h).unwrap(), FeeTier(500));

        h.detail = FeeTier(3_000).detail();
        assert!(hop_fee_tier(&h).is_err());
    }

    #[test]
    fn test_validate_swap_params_native_endpoints() {
        let chain = builtin_chain(1).unwrap();
        let params = SwapParams {
            chain_id: 1,
            token_in: NATIVE_TOKEN,
            token_out: USDC_MAINNET,
            amount_in: U256::from(10u64),
            min_amount_out: U256::from(1u64),
            recipient: Address::repeat_byte(0x99),
            deadline: 1,
            hops: vec![hop("x", vec![WETH_MAINNET, USDC_MAINNET], 500)],
            sender: None,
        };
        assert_eq!(
            validate_swap_params("x", &chain, &params).unwrap(),
            vec![WETH_MAINNET, USDC_MAINNET]
        );
        assert!(validate_swap_params("y", &chain, &params).is_err());

        let mut reversed = params.clone();
        reversed.token_out = WETH_MAINNET;
        assert!(validate_swap_params("x", &chain, &reversed).is_err());
    }
}
