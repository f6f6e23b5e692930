use std::collections::BTreeMap;

use alloy::primitives::aliases::{I24, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use super::traits::*;
use crate::blockchain::abi::v4::{self, actions, commands, IV4Quoter, PathKey, PoolKey};
use crate::blockchain::abi::IUniversalRouter;
use crate::common::normalize::is_native;
use crate::types::{
    Approval, ChainConfig, ChainId, DexKind, FeeTier, HopParams, RouteHop, SwapCalldata,
    SwapParams, TxRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingletonDeployment {
    pub quoter: Address,
    pub universal_router: Address,
    pub permit2: Address,
}

/// 싱글톤 풀 매니저 어댑터 (Uniswap V4)
///
/// 풀은 (fee, tickSpacing, hooks) 조합으로 식별된다. 표준 조합만 조회하고 hooks 는 고정.
#[derive(Debug, Clone)]
pub struct SingletonPoolAdapter {
    pub id: String,
    pub name: String,
    pub pool_configs: Vec<(u32, i32)>,
    pub hooks: Address,
    pub deployments: BTreeMap<ChainId, SingletonDeployment>,
}

impl SingletonPoolAdapter {
    fn deployment(&self, chain_id: ChainId) -> Result<&SingletonDeployment, AdapterError> {
        self.deployments.get(&chain_id).ok_or_else(|| AdapterError::UnsupportedChain {
            dex_id: self.id.clone(),
            chain_id,
        })
    }

    pub fn detail(fee: FeeTier, tick_spacing: i32) -> String {
        format!("{}, tickSpacing: {}", fee.detail(), tick_spacing)
    }

    fn fee_and_spacing(fee: FeeTier, tick_spacing: i32) -> Result<(U24, I24), AdapterError> {
        if fee.pips() > FeeTier::MAX {
            return Err(AdapterError::Configuration(format!("fee out of range: {}", fee.pips())));
        }
        let spacing = I24::try_from(tick_spacing)
            .map_err(|_| AdapterError::Configuration(format!("tick spacing out of range: {}", tick_spacing)))?;
        Ok((U24::from(fee.pips()), spacing))
    }

    /// currency0 < currency1 로 정렬된 풀 키
    pub fn pool_key(
        a: Address,
        b: Address,
        fee: FeeTier,
        tick_spacing: i32,
        hooks: Address,
    ) -> Result<PoolKey, AdapterError> {
        let (fee, tick_spacing) = Self::fee_and_spacing(fee, tick_spacing)?;
        let (currency0, currency1) = if a < b { (a, b) } else { (b, a) };
        Ok(PoolKey {
            currency0,
            currency1,
            fee,
            tickSpacing: tick_spacing,
            hooks,
        })
    }

    fn singleton_params(hop: &RouteHop) -> Result<(FeeTier, i32, Address), AdapterError> {
        let fee = hop_fee_tier(hop)?;
        match hop.params {
            HopParams::Singleton { tick_spacing, hooks, .. } => Ok((fee, tick_spacing, hooks)),
            ref other => Err(AdapterError::CalldataGenerationFailed(format!(
                "unexpected hop params: {:?}",
                other
            ))),
        }
    }

    /// V4_SWAP 입력: abi.encode(bytes actions, bytes[] params)
    fn encode_v4_swap(
        tokens: &[Address],
        hops: &[RouteHop],
        params: &SwapParams,
        amount_in: u128,
        min_out: u128,
        native_in: bool,
        native_out: bool,
    ) -> Result<Bytes, AdapterError> {
        let mut action_bytes: Vec<u8> = Vec::with_capacity(3);
        let mut action_params: Vec<Bytes> = Vec::with_capacity(3);

        if hops.len() == 1 {
            let (fee, tick_spacing, hooks) = Self::singleton_params(&hops[0])?;
            let swap = v4::ExactInputSingleParams {
                poolKey: Self::pool_key(tokens[0], tokens[1], fee, tick_spacing, hooks)?,
                zeroForOne: tokens[0] < tokens[1],
                amountIn: amount_in,
                amountOutMinimum: min_out,
                hookData: Bytes::new(),
            };
            action_bytes.push(actions::SWAP_EXACT_IN_SINGLE);
            action_params.push(swap.abi_encode().into());
        } else {
            let path = hops
                .iter()
                .zip(tokens.iter().skip(1))
                .map(|(hop, next)| {
                    let (fee, tick_spacing, hooks) = Self::singleton_params(hop)?;
                    let (fee, tick_spacing) = Self::fee_and_spacing(fee, tick_spacing)?;
                    Ok(PathKey {
                        intermediateCurrency: *next,
                        fee,
                        tickSpacing: tick_spacing,
                        hooks,
                        hookData: Bytes::new(),
                    })
                })
                .collect::<Result<Vec<_>, AdapterError>>()?;
            let swap = v4::ExactInputParams {
                currencyIn: tokens[0],
                path,
                amountIn: amount_in,
                amountOutMinimum: min_out,
            };
            action_bytes.push(actions::SWAP_EXACT_IN);
            action_params.push(swap.abi_encode().into());
        }

        let currency_in = tokens[0];
        let currency_out = tokens[tokens.len() - 1];
        let amount_in_word = U256::from(amount_in);

        if native_in {
            // WRAP_ETH 로 라우터가 보유한 WETH 로 결제
            action_bytes.push(actions::SETTLE);
            action_params.push((currency_in, amount_in_word, false).abi_encode_params().into());
        } else {
            action_bytes.push(actions::SETTLE_ALL);
            action_params.push((currency_in, amount_in_word).abi_encode_params().into());
        }

        // amount 0 = 남은 delta 전부
        let take_to = if native_out { v4::ADDRESS_THIS } else { params.recipient };
        action_bytes.push(actions::TAKE);
        action_params.push((currency_out, take_to, U256::ZERO).abi_encode_params().into());

        Ok((Bytes::from(action_bytes), action_params).abi_encode_params().into())
    }
}

#[async_trait]
impl DexPlugin for SingletonPoolAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DexKind {
        DexKind::SingletonPool
    }

    fn supported_chains(&self) -> Vec<ChainId> {
        self.deployments.keys().copied().collect()
    }

    fn router_address(&self, chain_id: ChainId) -> Option<Address> {
        self.deployments.get(&chain_id).map(|d| d.universal_router)
    }

    fn build_quote_calls(&self, ctx: &HopContext) -> Result<Vec<QuoteCall>, AdapterError> {
        let deployment = self.deployment(ctx.chain_id)?;
        let Ok(exact_amount) = u128::try_from(ctx.amount_in) else {
            return Ok(Vec::new());
        };
        let zero_for_one = ctx.token_in < ctx.token_out;

        let mut calls = Vec::with_capacity(self.pool_configs.len());
        for &(pips, tick_spacing) in &self.pool_configs {
            let fee = FeeTier(pips);
            let pool_key = Self::pool_key(ctx.token_in, ctx.token_out, fee, tick_spacing, self.hooks)?;
            let data = IV4Quoter::quoteExactInputSingleCall {
                params: v4::QuoteExactSingleParams {
                    poolKey: pool_key,
                    zeroForOne: zero_for_one,
                    exactAmount: exact_amount,
                    hookData: Bytes::new(),
                },
            }
            .abi_encode();

            let ctx = ctx.clone();
            let quoter = deployment.quoter;
            let hooks = self.hooks;
            calls.push(QuoteCall::new(quoter, data, move |output| {
                let decoded = IV4Quoter::quoteExactInputSingleCall::abi_decode_returns(output).ok()?;
                ctx.candidate(
                    decoded.amountOut,
                    quoter,
                    Self::detail(fee, tick_spacing),
                    HopParams::Singleton { fee, tick_spacing, hooks },
                )
            }));
        }

        Ok(calls)
    }

    fn build_swap_calldata(
        &self,
        chain: &ChainConfig,
        params: &SwapParams,
    ) -> Result<SwapCalldata, AdapterError> {
        let tokens = validate_swap_params(&self.id, chain, params)?;
        let deployment = self.deployment(chain.chain_id)?;
        let amount_in = u128::try_from(params.amount_in)
            .map_err(|_| AdapterError::CalldataGenerationFailed("amount in exceeds uint128".to_string()))?;
        let min_out = u128::try_from(params.min_amount_out)
            .map_err(|_| AdapterError::CalldataGenerationFailed("min amount out exceeds uint128".to_string()))?;

        let native_in = is_native(params.token_in);
        let native_out = is_native(params.token_out);

        let mut command_bytes: Vec<u8> = Vec::with_capacity(3);
        let mut inputs: Vec<Bytes> = Vec::with_capacity(3);

        if native_in {
            command_bytes.push(commands::WRAP_ETH);
            inputs.push((v4::ADDRESS_THIS, params.amount_in).abi_encode_params().into());
        }

        command_bytes.push(commands::V4_SWAP);
        inputs.push(Self::encode_v4_swap(
            &tokens,
            &params.hops,
            params,
            amount_in,
            min_out,
            native_in,
            native_out,
        )?);

        if native_out {
            command_bytes.push(commands::UNWRAP_WETH);
            inputs.push((params.recipient, params.min_amount_out).abi_encode_params().into());
        }

        let data = IUniversalRouter::executeCall {
            commands: command_bytes.into(),
            inputs,
            deadline: U256::from(params.deadline),
        }
        .abi_encode();

        let approvals = if native_in {
            Vec::new()
        } else {
            vec![Approval::Permit2 {
                token: params.token_in,
                permit2: deployment.permit2,
                spender: deployment.universal_router,
                amount: params.amount_in,
            }]
        };

        Ok(SwapCalldata {
            pre_transactions: Vec::new(),
            approvals,
            swap: TxRequest {
                to: deployment.universal_router,
                data: data.into(),
                value: if native_in { params.amount_in } else { U256::ZERO },
                description: Some(format!("{} execute", self.name)),
            },
        })
    }
}
