use std::collections::BTreeMap;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::debug;

use super::traits::*;
use crate::blockchain::abi::{IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router02};
use crate::blockchain::rpc::{ChainClient, RpcError};
use crate::common::normalize::is_native;
use crate::types::{
    Approval, ChainConfig, ChainId, DexKind, FeeTier, HopParams, RouteCandidate, SwapCalldata,
    SwapParams, TxRequest,
};
use crate::utils::math::get_amount_out;

/// 체인별 V2 배포 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantProductDeployment {
    pub router: Address,
    pub factory: Address,
    /// 있으면 CREATE2 로 페어 주소를 계산, 없으면 factory.getPair 조회
    pub init_code_hash: Option<B256>,
}

/// x*y=k 풀 어댑터 (Uniswap V2, SushiSwap, PancakeSwap V2, QuickSwap ...)
#[derive(Debug, Clone)]
pub struct ConstantProductAdapter {
    pub id: String,
    pub name: String,
    pub fee_numerator: u32,
    pub fee_denominator: u32,
    pub deployments: BTreeMap<ChainId, ConstantProductDeployment>,
}

impl ConstantProductAdapter {
    fn deployment(&self, chain_id: ChainId) -> Result<&ConstantProductDeployment, AdapterError> {
        self.deployments.get(&chain_id).ok_or_else(|| AdapterError::UnsupportedChain {
            dex_id: self.id.clone(),
            chain_id,
        })
    }

    fn fee_tier(&self) -> FeeTier {
        FeeTier::from_ratio(self.fee_numerator, self.fee_denominator)
    }

    /// 정렬된 토큰 쌍의 CREATE2 페어 주소
    pub fn compute_pair_address(factory: Address, init_code_hash: B256, a: Address, b: Address) -> Address {
        let (token0, token1) = if a < b { (a, b) } else { (b, a) };
        let mut packed = [0u8; 40];
        packed[..20].copy_from_slice(token0.as_slice());
        packed[20..].copy_from_slice(token1.as_slice());
        factory.create2(keccak256(packed), init_code_hash)
    }

    async fn resolve_pair(
        &self,
        client: &dyn ChainClient,
        deployment: &ConstantProductDeployment,
        token_in: Address,
        token_out: Address,
    ) -> Result<Option<Address>, AdapterError> {
        if let Some(hash) = deployment.init_code_hash {
            return Ok(Some(Self::compute_pair_address(deployment.factory, hash, token_in, token_out)));
        }

        let data = IUniswapV2Factory::getPairCall { tokenA: token_in, tokenB: token_out }.abi_encode();
        let pair = match client.call(deployment.factory, data.into()).await {
            Ok(output) => IUniswapV2Factory::getPairCall::abi_decode_returns(&output).ok(),
            Err(RpcError::Reverted(_)) => None,
            Err(e) => return Err(AdapterError::QuoteCallFailed(e.to_string())),
        };
        Ok(pair.filter(|p| !p.is_zero()))
    }
}

#[async_trait]
impl DexPlugin for ConstantProductAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DexKind {
        DexKind::ConstantProduct
    }

    fn supported_chains(&self) -> Vec<ChainId> {
        self.deployments.keys().copied().collect()
    }

    fn router_address(&self, chain_id: ChainId) -> Option<Address> {
        self.deployments.get(&chain_id).map(|d| d.router)
    }

    /// 견적 조회: 페어 주소 확인 후 getReserves 로 출력량 계산
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
        let deployment = self.deployment(chain.chain_id)?;

        let Some(pair) = self.resolve_pair(client, deployment, ctx.token_in, ctx.token_out).await? else {
            debug!("{}: 페어 없음 {} -> {}", self.id, ctx.token_in, ctx.token_out);
            return Ok(None);
        };

        let data = IUniswapV2Pair::getReservesCall {}.abi_encode();
        let reserves = match client.call(pair, data.into()).await {
            Ok(output) => match IUniswapV2Pair::getReservesCall::abi_decode_returns(&output) {
                Ok(reserves) => reserves,
                Err(_) => return Ok(None),
            },
            // 배포되지 않은 CREATE2 주소
            Err(RpcError::Reverted(_)) => return Ok(None),
            Err(e) => return Err(AdapterError::QuoteCallFailed(e.to_string())),
        };

        let reserve0 = U256::from(reserves.reserve0);
        let reserve1 = U256::from(reserves.reserve1);
        let (reserve_in, reserve_out) = if ctx.token_in < ctx.token_out {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };

        let Some(amount_out) = get_amount_out(
            ctx.amount_in,
            reserve_in,
            reserve_out,
            self.fee_numerator,
            self.fee_denominator,
        ) else {
            return Ok(None);
        };

        Ok(ctx.candidate(
            amount_out,
            pair,
            self.fee_tier().detail(),
            HopParams::ConstantProduct { pair },
        ))
    }

    fn build_swap_calldata(
        &self,
        chain: &ChainConfig,
        params: &SwapParams,
    ) -> Result<SwapCalldata, AdapterError> {
        let path = validate_swap_params(&self.id, chain, params)?;
        let deployment = self.deployment(chain.chain_id)?;
        let deadline = U256::from(params.deadline);
        let native_in = is_native(params.token_in);
        let native_out = is_native(params.token_out);

        let (data, value, description) = if native_in {
            let call = IUniswapV2Router02::swapExactETHForTokensCall {
                amountOutMin: params.min_amount_out,
                path,
                to: params.recipient,
                deadline,
            };
            (call.abi_encode(), params.amount_in, "swapExactETHForTokens")
        } else if native_out {
            let call = IUniswapV2Router02::swapExactTokensForETHCall {
                amountIn: params.amount_in,
                amountOutMin: params.min_amount_out,
                path,
                to: params.recipient,
                deadline,
            };
            (call.abi_encode(), U256::ZERO, "swapExactTokensForETH")
        } else {
            let call = IUniswapV2Router02::swapExactTokensForTokensCall {
                amountIn: params.amount_in,
                amountOutMin: params.min_amount_out,
                path,
                to: params.recipient,
                deadline,
            };
            (call.abi_encode(), U256::ZERO, "swapExactTokensForTokens")
        };

        let approvals = if native_in {
            Vec::new()
        } else {
            vec![Approval::Erc20 {
                token: params.token_in,
                spender: deployment.router,
                amount: params.amount_in,
            }]
        };

        Ok(SwapCalldata {
            pre_transactions: Vec::new(),
            approvals,
            swap: TxRequest {
                to: deployment.router,
                data: data.into(),
                value,
                description: Some(format!("{} {}", self.name, description)),
            },
        })
    }
}
