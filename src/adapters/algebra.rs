use std::collections::BTreeMap;

use alloy::primitives::aliases::U160;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use super::traits::*;
use crate::blockchain::abi::{IAlgebraQuoter, IAlgebraRouter};
use crate::common::normalize::is_native;
use crate::types::{
    Approval, ChainConfig, ChainId, DexKind, FeeTier, HopParams, SwapCalldata, SwapParams, TxRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgebraDeployment {
    pub quoter: Address,
    pub router: Address,
}

/// 동적 수수료 풀 어댑터 (QuickSwap V3, Camelot V3)
///
/// 토큰 쌍당 풀이 하나뿐이라 fee tier 를 순회하지 않는다.
#[derive(Debug, Clone)]
pub struct AlgebraAdapter {
    pub id: String,
    pub name: String,
    pub deployments: BTreeMap<ChainId, AlgebraDeployment>,
}

impl AlgebraAdapter {
    fn deployment(&self, chain_id: ChainId) -> Result<&AlgebraDeployment, AdapterError> {
        self.deployments.get(&chain_id).ok_or_else(|| AdapterError::UnsupportedChain {
            dex_id: self.id.clone(),
            chain_id,
        })
    }
}

#[async_trait]
impl DexPlugin for AlgebraAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DexKind {
        DexKind::DynamicFee
    }

    fn supported_chains(&self) -> Vec<ChainId> {
        self.deployments.keys().copied().collect()
    }

    fn router_address(&self, chain_id: ChainId) -> Option<Address> {
        self.deployments.get(&chain_id).map(|d| d.router)
    }

    fn build_quote_calls(&self, ctx: &HopContext) -> Result<Vec<QuoteCall>, AdapterError> {
        let deployment = self.deployment(ctx.chain_id)?;
        let data = IAlgebraQuoter::quoteExactInputSingleCall {
            tokenIn: ctx.token_in,
            tokenOut: ctx.token_out,
            amountIn: ctx.amount_in,
            limitSqrtPrice: U160::ZERO,
        }
        .abi_encode();

        let ctx = ctx.clone();
        let quoter = deployment.quoter;
        Ok(vec![QuoteCall::new(quoter, data, move |output| {
            let decoded = IAlgebraQuoter::quoteExactInputSingleCall::abi_decode_returns(output).ok()?;
            let observed = FeeTier(u32::from(decoded.fee));
            ctx.candidate(
                decoded.amountOut,
                quoter,
                observed.detail(),
                HopParams::DynamicFee { observed_fee: Some(observed) },
            )
        })])
    }

    fn build_swap_calldata(
        &self,
        chain: &ChainConfig,
        params: &SwapParams,
    ) -> Result<SwapCalldata, AdapterError> {
        let tokens = validate_swap_params(&self.id, chain, params)?;
        let deployment = self.deployment(chain.chain_id)?;
        if let Some(hop) = params
            .hops
            .iter()
            .find(|h| !matches!(h.params, HopParams::DynamicFee { .. }))
        {
            return Err(AdapterError::CalldataGenerationFailed(format!(
                "unexpected hop params for {}: {:?}",
                self.id, hop.params
            )));
        }

        let native_in = is_native(params.token_in);
        let native_out = is_native(params.token_out);
        let recipient = if native_out { deployment.router } else { params.recipient };
        let deadline = U256::from(params.deadline);

        let swap_call: Bytes = if tokens.len() == 2 {
            IAlgebraRouter::exactInputSingleCall {
                params: IAlgebraRouter::ExactInputSingleParams {
                    tokenIn: tokens[0],
                    tokenOut: tokens[1],
                    recipient,
                    deadline,
                    amountIn: params.amount_in,
                    amountOutMinimum: params.min_amount_out,
                    limitSqrtPrice: U160::ZERO,
                },
            }
            .abi_encode()
            .into()
        } else {
            IAlgebraRouter::exactInputCall {
                params: IAlgebraRouter::ExactInputParams {
                    path: encode_packed_path(&tokens),
                    recipient,
                    deadline,
                    amountIn: params.amount_in,
                    amountOutMinimum: params.min_amount_out,
                },
            }
            .abi_encode()
            .into()
        };

        let data: Bytes = if native_out {
            let unwrap = IAlgebraRouter::unwrapWNativeTokenCall {
                amountMinimum: params.min_amount_out,
                recipient: params.recipient,
            }
            .abi_encode();
            IAlgebraRouter::multicallCall { data: vec![swap_call, unwrap.into()] }
                .abi_encode()
                .into()
        } else {
            swap_call
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
                data,
                value: if native_in { params.amount_in } else { U256::ZERO },
                description: Some(format!("{} swap", self.name)),
            },
        })
    }
}
