use std::sync::Arc;

use alloy::primitives::aliases::{U160, U48};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use tracing::{debug, info, warn};

use crate::adapters::{AdapterError, PluginRegistry};
use crate::blockchain::abi::{IPermit2, IERC20};
use crate::blockchain::rpc::ChainClient;
use crate::types::{Approval, ChainConfig, ExecutionPlan, RouteCandidate, SwapParams, TxRequest};
use crate::utils::math::min_amount_out;

/// 실행 계획 생성 옵션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// 논리적 입력 토큰 (네이티브 예약 주소 가능)
    pub token_in: Address,
    pub token_out: Address,
    pub slippage_bps: u32,
    pub recipient: Address,
    /// unix seconds
    pub deadline: u64,
    /// 서명자. 있으면 allowance 를 확인할 수 있다
    pub sender: Option<Address>,
}

/// 스왑 실행 빌더
///
/// 집계기가 고른 경로를 그대로 calldata 로 옮긴다. 경로나 fee tier 를 다시 고르지 않는다.
pub struct SwapExecutionBuilder {
    registry: Arc<PluginRegistry>,
    check_allowance: bool,
}

impl SwapExecutionBuilder {
    pub fn new(registry: Arc<PluginRegistry>, check_allowance: bool) -> Self {
        Self { registry, check_allowance }
    }

    /// 경로와 옵션으로 SwapParams 구성 (minAmountOut 은 내림)
    pub fn swap_params(route: &RouteCandidate, options: &ExecutionOptions) -> SwapParams {
        SwapParams {
            chain_id: route.chain_id,
            token_in: options.token_in,
            token_out: options.token_out,
            amount_in: route.amount_in,
            min_amount_out: min_amount_out(route.amount_out, options.slippage_bps),
            recipient: options.recipient,
            deadline: options.deadline,
            hops: route.hops.clone(),
            sender: options.sender,
        }
    }

    /// 실행 계획 생성
    ///
    /// `client` 가 있고 allowance 확인이 켜져 있으면 이미 충분한 승인은 생략한다.
    pub async fn build(
        &self,
        client: Option<&dyn ChainClient>,
        chain: &ChainConfig,
        route: &RouteCandidate,
        options: &ExecutionOptions,
    ) -> Result<ExecutionPlan, AdapterError> {
        let plugin = self
            .registry
            .get(&route.dex_id)
            .ok_or_else(|| AdapterError::UnsupportedRoute(format!("unknown dex {}", route.dex_id)))?;
        if route.chain_id != chain.chain_id {
            return Err(AdapterError::UnsupportedRoute(format!(
                "route for chain {} built against chain {}",
                route.chain_id, chain.chain_id
            )));
        }

        let params = Self::swap_params(route, options);
        let calldata = plugin.build_swap_calldata(chain, &params)?;

        let owner = options.sender.filter(|_| self.check_allowance);
        let client = client.filter(|_| owner.is_some());

        let mut transactions = calldata.pre_transactions;
        for approval in &calldata.approvals {
            transactions.extend(self.approval_transactions(client, owner, approval, options.deadline).await);
        }

        info!(
            "🧾 실행 계획 생성: {} {} 홉, 사전 트랜잭션 {}개, minOut {}",
            route.dex_id,
            route.hop_count(),
            transactions.len(),
            params.min_amount_out
        );

        Ok(ExecutionPlan {
            approvals: transactions,
            swap: calldata.swap,
            min_amount_out: params.min_amount_out,
            deadline: options.deadline,
        })
    }

    async fn approval_transactions(
        &self,
        client: Option<&dyn ChainClient>,
        owner: Option<Address>,
        approval: &Approval,
        deadline: u64,
    ) -> Vec<TxRequest> {
        match approval {
            Approval::Erc20 { token, spender, amount } => {
                if erc20_allowance_ok(client, owner, *token, *spender, *amount).await {
                    return Vec::new();
                }
                vec![erc20_approve(*token, *spender, *amount)]
            }
            Approval::Permit2 { token, permit2, spender, amount } => {
                let mut txs = Vec::new();
                if !erc20_allowance_ok(client, owner, *token, *permit2, *amount).await {
                    txs.push(erc20_approve(*token, *permit2, *amount));
                }
                if !permit2_allowance_ok(client, owner, *permit2, *token, *spender, *amount, deadline).await {
                    txs.push(permit2_approve(*permit2, *token, *spender, *amount, deadline));
                }
                txs
            }
        }
    }
}

fn erc20_approve(token: Address, spender: Address, amount: U256) -> TxRequest {
    TxRequest {
        to: token,
        data: IERC20::approveCall { spender, amount }.abi_encode().into(),
        value: U256::ZERO,
        description: Some(format!("Approve {} for {}", token, spender)),
    }
}

fn permit2_approve(permit2: Address, token: Address, spender: Address, amount: U256, deadline: u64) -> TxRequest {
    let amount = U160::saturating_from(amount);
    TxRequest {
        to: permit2,
        data: IPermit2::approveCall {
            token,
            spender,
            amount,
            expiration: U48::from(deadline.min(U48::MAX.to::<u64>())),
        }
        .abi_encode()
        .into(),
        value: U256::ZERO,
        description: Some(format!("Permit2 approve {} for {}", token, spender)),
    }
}

/// allowance 를 읽지 못하면 승인이 필요하다고 본다
async fn erc20_allowance_ok(
    client: Option<&dyn ChainClient>,
    owner: Option<Address>,
    token: Address,
    spender: Address,
    amount: U256,
) -> bool {
    let (Some(client), Some(owner)) = (client, owner) else {
        return false;
    };

    let data = IERC20::allowanceCall { owner, spender }.abi_encode();
    match client.call(token, data.into()).await {
        Ok(output) => match IERC20::allowanceCall::abi_decode_returns(&output) {
            Ok(allowance) => {
                debug!("allowance {} -> {}: {}", token, spender, allowance);
                allowance >= amount
            }
            Err(e) => {
                warn!("allowance 디코딩 실패 {}: {}", token, e);
                false
            }
        },
        Err(e) => {
            warn!("allowance 조회 실패 {}: {}", token, e);
            false
        }
    }
}

async fn permit2_allowance_ok(
    client: Option<&dyn ChainClient>,
    owner: Option<Address>,
    permit2: Address,
    token: Address,
    spender: Address,
    amount: U256,
    deadline: u64,
) -> bool {
    let (Some(client), Some(owner)) = (client, owner) else {
        return false;
    };

    let data = IPermit2::allowanceCall { user: owner, token, spender }.abi_encode();
    let Ok(output) = client.call(permit2, data.into()).await else {
        return false;
    };
    match IPermit2::allowanceCall::abi_decode_returns(&output) {
        Ok(allowance) => {
            U256::from(allowance.amount) >= amount && allowance.expiration.to::<u64>() >= deadline
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::chains::builtin_chain;
    use crate::constants::*;
    use crate::mocks::{MockChainClient, MockPlugin, MockQuote, MockResponse};
    use crate::types::FeeTier;
    use alloy::sol_types::SolValue;

    const ROUTER: Address = Address::repeat_byte(0xee);
    const USER: Address = Address::repeat_byte(0x99);

    async fn fixture(check_allowance: bool) -> (SwapExecutionBuilder, RouteCandidate) {
        let plugin = MockPlugin::new("mock_v3", &[ETHEREUM])
            .with_fee(FeeTier(500))
            .quote(USDC_MAINNET, WETH_MAINNET, MockQuote::fixed(1_000_000));
        let registry = Arc::new(PluginRegistry::new().with(Arc::new(plugin)));
        let chain = builtin_chain(ETHEREUM).unwrap();
        let client = MockChainClient::new(ETHEREUM);
        let route = registry
            .get("mock_v3")
            .unwrap()
            .quote_single_hop(&client, &chain, USDC_MAINNET, WETH_MAINNET, U256::from(5_000u64))
            .await
            .unwrap()
            .unwrap();
        (SwapExecutionBuilder::new(registry, check_allowance), route)
    }

    fn options(sender: Option<Address>) -> ExecutionOptions {
        ExecutionOptions {
            token_in: USDC_MAINNET,
            token_out: WETH_MAINNET,
            slippage_bps: 50,
            recipient: USER,
            deadline: 1_900_000_000,
            sender,
        }
    }

    #[tokio::test]
    async fn test_min_amount_out_and_approval() {
        let (builder, route) = fixture(true).await;
        let chain = builtin_chain(ETHEREUM).unwrap();

        let plan = builder.build(None, &chain, &route, &options(None)).await.unwrap();
        assert_eq!(plan.min_amount_out, U256::from(995_000u64));
        assert_eq!(plan.deadline, 1_900_000_000);
        assert_eq!(plan.swap.to, ROUTER);
        assert_eq!(plan.approvals.len(), 1);

        let approve = IERC20::approveCall::abi_decode(&plan.approvals[0].data).unwrap();
        assert_eq!(plan.approvals[0].to, USDC_MAINNET);
        assert_eq!(approve.spender, ROUTER);
        assert_eq!(approve.amount, U256::from(5_000u64));
    }

    #[tokio::test]
    async fn test_sufficient_allowance_skips_approval() {
        let (builder, route) = fixture(true).await;
        let chain = builtin_chain(ETHEREUM).unwrap();
        let client = MockChainClient::new(ETHEREUM);
        client.respond(
            USDC_MAINNET,
            IERC20::allowanceCall { owner: USER, spender: ROUTER }.abi_encode(),
            MockResponse::ok(U256::MAX.abi_encode()),
        );

        let plan = builder.build(Some(&client), &chain, &route, &options(Some(USER))).await.unwrap();
        assert!(plan.approvals.is_empty());
    }

    #[tokio::test]
    async fn test_allowance_check_disabled_keeps_approval() {
        let (builder, route) = fixture(false).await;
        let chain = builtin_chain(ETHEREUM).unwrap();
        let client = MockChainClient::new(ETHEREUM);
        client.respond_target(USDC_MAINNET, MockResponse::ok(U256::MAX.abi_encode()));

        let plan = builder.build(Some(&client), &chain, &route, &options(Some(USER))).await.unwrap();
        assert_eq!(plan.approvals.len(), 1);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_dex_is_hard_error() {
        let (builder, mut route) = fixture(true).await;
        route.dex_id = "gone".to_string();
        let chain = builtin_chain(ETHEREUM).unwrap();
        let result = builder.build(None, &chain, &route, &options(None)).await;
        assert!(matches!(result, Err(AdapterError::UnsupportedRoute(_))));
    }

    #[tokio::test]
    async fn test_tampered_hop_detail_is_hard_error() {
        let (builder, mut route) = fixture(true).await;
        route.hops[0].detail = "Fee: banana".to_string();
        let chain = builtin_chain(ETHEREUM).unwrap();
        let result = builder.build(None, &chain, &route, &options(None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_permit2_two_step_approval() {
        let builder = SwapExecutionBuilder::new(Arc::new(PluginRegistry::new()), true);
        let client = MockChainClient::new(ETHEREUM);
        // ERC-20 -> Permit2 승인은 충분, Permit2 -> router 승인은 만료됨
        client.respond(
            USDC_MAINNET,
            IERC20::allowanceCall { owner: USER, spender: PERMIT2 }.abi_encode(),
            MockResponse::ok(U256::MAX.abi_encode()),
        );
        client.respond_target(
            PERMIT2,
            MockResponse::ok((U256::MAX >> 96, U256::from(10u64), U256::ZERO).abi_encode_params()),
        );

        let approval = Approval::Permit2 {
            token: USDC_MAINNET,
            permit2: PERMIT2,
            spender: ROUTER,
            amount: U256::from(1_000u64),
        };
        let txs = builder
            .approval_transactions(Some(&client), Some(USER), &approval, 1_900_000_000)
            .await;
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].to, PERMIT2);

        let decoded = IPermit2::approveCall::abi_decode(&txs[0].data).unwrap();
        assert_eq!(decoded.spender, ROUTER);
        assert_eq!(decoded.amount, U160::from(1_000u64));
        assert_eq!(decoded.expiration, U48::from(1_900_000_000u64));

        let without_client = builder.approval_transactions(None, None, &approval, 1).await;
        assert_eq!(without_client.len(), 2);
    }
}
