use std::collections::BTreeMap;

use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::*;
use crate::blockchain::abi::{IQuoterV2, ISwapRouter, ISwapRouter02};
use crate::common::normalize::is_native;
use crate::types::{
    Approval, ChainConfig, ChainId, DexKind, FeeTier, HopParams, SwapCalldata, SwapParams, TxRequest,
};

/// 라우터 ABI 버전
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterVersion {
    /// params 에 deadline 포함, multicall(bytes[])
    SwapRouter,
    /// deadline 없음, multicall(uint256 deadline, bytes[])
    SwapRouter02,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcentratedDeployment {
    pub quoter: Address,
    pub router: Address,
    pub router_version: RouterVersion,
}

/// fee tier 별 풀 어댑터 (Uniswap V3, PancakeSwap V3)
#[derive(Debug, Clone)]
pub struct ConcentratedLiquidityAdapter {
    pub id: String,
    pub name: String,
    pub fee_tiers: Vec<u32>,
    pub deployments: BTreeMap<ChainId, ConcentratedDeployment>,
}

impl ConcentratedLiquidityAdapter {
    fn deployment(&self, chain_id: ChainId) -> Result<&ConcentratedDeployment, AdapterError> {
        self.deployments.get(&chain_id).ok_or_else(|| AdapterError::UnsupportedChain {
            dex_id: self.id.clone(),
            chain_id,
        })
    }

    /// 단일 홉 swap 호출 (recipient 는 호출자가 결정)
    fn encode_single(
        version: RouterVersion,
        token_in: Address,
        token_out: Address,
        fee: FeeTier,
        recipient: Address,
        params: &SwapParams,
    ) -> Vec<u8> {
        let fee = U24::from(fee.pips());
        match version {
            RouterVersion::SwapRouter => ISwapRouter::exactInputSingleCall {
                params: ISwapRouter::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee,
                    recipient,
                    deadline: U256::from(params.deadline),
                    amountIn: params.amount_in,
                    amountOutMinimum: params.min_amount_out,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            }
            .abi_encode(),
            RouterVersion::SwapRouter02 => ISwapRouter02::exactInputSingleCall {
                params: ISwapRouter02::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee,
                    recipient,
                    amountIn: params.amount_in,
                    amountOutMinimum: params.min_amount_out,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            }
            .abi_encode(),
        }
    }

    fn encode_multi(version: RouterVersion, path: Bytes, recipient: Address, params: &SwapParams) -> Vec<u8> {
        match version {
            RouterVersion::SwapRouter => ISwapRouter::exactInputCall {
                params: ISwapRouter::ExactInputParams {
                    path,
                    recipient,
                    deadline: U256::from(params.deadline),
                    amountIn: params.amount_in,
                    amountOutMinimum: params.min_amount_out,
                },
            }
            .abi_encode(),
            RouterVersion::SwapRouter02 => ISwapRouter02::exactInputCall {
                params: ISwapRouter02::ExactInputParams {
                    path,
                    recipient,
                    amountIn: params.amount_in,
                    amountOutMinimum: params.min_amount_out,
                },
            }
            .abi_encode(),
        }
    }
}

#[async_trait]
impl DexPlugin for ConcentratedLiquidityAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DexKind {
        DexKind::ConcentratedLiquidity
    }

    fn supported_chains(&self) -> Vec<ChainId> {
        self.deployments.keys().copied().collect()
    }

    fn router_address(&self, chain_id: ChainId) -> Option<Address> {
        self.deployments.get(&chain_id).map(|d| d.router)
    }

    /// fee tier 마다 QuoterV2 호출 하나
    fn build_quote_calls(&self, ctx: &HopContext) -> Result<Vec<QuoteCall>, AdapterError> {
        let deployment = self.deployment(ctx.chain_id)?;

        let calls = self
            .fee_tiers
            .iter()
            .filter(|pips| **pips <= FeeTier::MAX)
            .map(|&pips| {
                let fee = FeeTier(pips);
                let data = IQuoterV2::quoteExactInputSingleCall {
                    params: IQuoterV2::QuoteExactInputSingleParams {
                        tokenIn: ctx.token_in,
                        tokenOut: ctx.token_out,
                        amountIn: ctx.amount_in,
                        fee: U24::from(pips),
                        sqrtPriceLimitX96: U160::ZERO,
                    },
                }
                .abi_encode();

                let ctx = ctx.clone();
                let quoter = deployment.quoter;
                QuoteCall::new(quoter, data, move |output| {
                    let decoded = IQuoterV2::quoteExactInputSingleCall::abi_decode_returns(output).ok()?;
                    ctx.candidate(decoded.amountOut, quoter, fee.detail(), HopParams::FeeTier { fee })
                })
            })
            .collect();

        Ok(calls)
    }

    fn build_swap_calldata(
        &self,
        chain: &ChainConfig,
        params: &SwapParams,
    ) -> Result<SwapCalldata, AdapterError> {
        let tokens = validate_swap_params(&self.id, chain, params)?;
        let deployment = self.deployment(chain.chain_id)?;
        let fees = params
            .hops
            .iter()
            .map(hop_fee_tier)
            .collect::<Result<Vec<_>, _>>()?;

        let native_in = is_native(params.token_in);
        let native_out = is_native(params.token_out);
        let version = deployment.router_version;
        // 네이티브 출력이면 라우터가 WETH 를 받은 뒤 unwrap 해서 보낸다
        let swap_recipient = if native_out { deployment.router } else { params.recipient };

        let swap_call = if tokens.len() == 2 {
            Self::encode_single(version, tokens[0], tokens[1], fees[0], swap_recipient, params)
        } else {
            let path = encode_v3_path(&tokens, &fees)?;
            Self::encode_multi(version, path, swap_recipient, params)
        };

        let mut inner: Vec<Bytes> = vec![swap_call.into()];
        if native_out {
            let unwrap = match version {
                RouterVersion::SwapRouter => ISwapRouter::unwrapWETH9Call {
                    amountMinimum: params.min_amount_out,
                    recipient: params.recipient,
                }
                .abi_encode(),
                RouterVersion::SwapRouter02 => ISwapRouter02::unwrapWETH9Call {
                    amountMinimum: params.min_amount_out,
                    recipient: params.recipient,
                }
                .abi_encode(),
            };
            inner.push(unwrap.into());
        }

        let data: Bytes = match (version, inner.len()) {
            (RouterVersion::SwapRouter, 1) => inner.remove(0),
            (RouterVersion::SwapRouter, _) => ISwapRouter::multicallCall { data: inner }.abi_encode().into(),
            // Router02 는 multicall(deadline, ..) 로 deadline 을 강제
            (RouterVersion::SwapRouter02, _) => ISwapRouter02::multicallCall {
                deadline: U256::from(params.deadline),
                data: inner,
            }
            .abi_encode()
            .into(),
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

        let description = if params.hops.len() > 1 { "exactInput" } else { "exactInputSingle" };
        Ok(SwapCalldata {
            pre_transactions: Vec::new(),
            approvals,
            swap: TxRequest {
                to: deployment.router,
                data,
                value: if native_in { params.amount_in } else { U256::ZERO },
                description: Some(format!("{} {}", self.name, description)),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::chains::builtin_chain;
    use crate::constants::*;
    use crate::mocks::{MockChainClient, MockResponse};
    use crate::types::RouteCandidate;
    use alloy::sol_types::SolValue;

    fn adapter(version: RouterVersion) -> ConcentratedLiquidityAdapter {
        let router = match version {
            RouterVersion::SwapRouter => UNISWAP_V3_ROUTER,
            RouterVersion::SwapRouter02 => UNISWAP_V3_ROUTER02,
        };
        ConcentratedLiquidityAdapter {
            id: "uniswap_v3".to_string(),
            name: "Uniswap V3".to_string(),
            fee_tiers: UNISWAP_V3_FEE_TIERS.to_vec(),
            deployments: BTreeMap::from([(
                ETHEREUM,
                ConcentratedDeployment {
                    quoter: UNISWAP_V3_QUOTER_V2,
                    router,
                    router_version: version,
                },
            )]),
        }
    }

    fn quote_output(amount_out: u64) -> Vec<u8> {
        (U256::from(amount_out), U256::ZERO, U256::ZERO, U256::from(100_000u64)).abi_encode_params()
    }

    fn script_tiers(client: &MockChainClient, adapter: &ConcentratedLiquidityAdapter, outs: &[(u32, Option<u64>)]) {
        let chain = builtin_chain(ETHEREUM).unwrap();
        let ctx = adapter
            .hop_context(&chain, USDC_MAINNET, WETH_MAINNET, U256::from(1_000_000u64))
            .unwrap()
            .unwrap();
        let calls = adapter.build_quote_calls(&ctx).unwrap();
        for (call, tier) in calls.iter().zip(adapter.fee_tiers.iter()) {
            let response = match outs.iter().find(|(fee, _)| fee == tier).and_then(|(_, out)| *out) {
                Some(out) => MockResponse::ok(quote_output(out)),
                None => MockResponse::Revert,
            };
            client.respond(call.target, call.call_data.clone(), response);
        }
    }

    async fn quote(adapter: &ConcentratedLiquidityAdapter, client: &MockChainClient) -> Option<RouteCandidate> {
        let chain = builtin_chain(ETHEREUM).unwrap();
        adapter
            .quote_single_hop(client, &chain, USDC_MAINNET, WETH_MAINNET, U256::from(1_000_000u64))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_best_tier_selected() {
        let adapter = adapter(RouterVersion::SwapRouter);
        let client = MockChainClient::new(ETHEREUM);
        script_tiers(&client, &adapter, &[(100, None), (500, Some(500)), (3_000, Some(490)), (10_000, Some(10))]);

        let candidate = quote(&adapter, &client).await.unwrap();
        assert_eq!(candidate.amount_out, U256::from(500u64));
        assert_eq!(candidate.hops[0].detail, "Fee: 0.05%");
        assert_eq!(candidate.hops[0].params, HopParams::FeeTier { fee: FeeTier(500) });
        assert_eq!(client.aggregate_count(), 1);
    }

    #[tokio::test]
    async fn test_tie_prefers_lower_tier() {
        let adapter = adapter(RouterVersion::SwapRouter);
        let client = MockChainClient::new(ETHEREUM);
        script_tiers(&client, &adapter, &[(500, Some(700)), (3_000, Some(700))]);

        let candidate = quote(&adapter, &client).await.unwrap();
        assert_eq!(candidate.hops[0].params, HopParams::FeeTier { fee: FeeTier(500) });
    }

    #[tokio::test]
    async fn test_all_tiers_revert() {
        let adapter = adapter(RouterVersion::SwapRouter);
        let client = MockChainClient::new(ETHEREUM);
        assert!(quote(&adapter, &client).await.is_none());
    }

    fn swap_params(version: RouterVersion, token_in: Address, token_out: Address) -> (ConcentratedLiquidityAdapter, SwapParams) {
        let adapter = adapter(version);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let ctx = adapter
            .hop_context(&chain, token_in, token_out, U256::from(1_000u64))
            .unwrap()
            .unwrap();
        let route = ctx
            .candidate(U256::from(900u64), UNISWAP_V3_QUOTER_V2, FeeTier(500).detail(), HopParams::FeeTier {
                fee: FeeTier(500),
            })
            .unwrap();
        let params = SwapParams {
            chain_id: ETHEREUM,
            token_in,
            token_out,
            amount_in: U256::from(1_000u64),
            min_amount_out: U256::from(895u64),
            recipient: Address::repeat_byte(0x55),
            deadline: 1_700_000_000,
            hops: route.hops,
            sender: None,
        };
        (adapter, params)
    }

    #[test]
    fn test_swap_router_single_hop() {
        let (adapter, params) = swap_params(RouterVersion::SwapRouter, USDC_MAINNET, WETH_MAINNET);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let calldata = adapter.build_swap_calldata(&chain, &params).unwrap();

        let decoded = ISwapRouter::exactInputSingleCall::abi_decode(&calldata.swap.data).unwrap();
        assert_eq!(decoded.params.fee, U24::from(500u32));
        assert_eq!(decoded.params.recipient, Address::repeat_byte(0x55));
        assert_eq!(decoded.params.deadline, U256::from(1_700_000_000u64));
        assert_eq!(decoded.params.amountOutMinimum, U256::from(895u64));
        assert_eq!(calldata.swap.value, U256::ZERO);
        assert_eq!(
            calldata.approvals,
            vec![Approval::Erc20 { token: USDC_MAINNET, spender: UNISWAP_V3_ROUTER, amount: U256::from(1_000u64) }]
        );
    }

    #[test]
    fn test_router02_native_out_unwraps() {
        let (adapter, params) = swap_params(RouterVersion::SwapRouter02, USDC_MAINNET, NATIVE_TOKEN);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let calldata = adapter.build_swap_calldata(&chain, &params).unwrap();

        let outer = ISwapRouter02::multicallCall::abi_decode(&calldata.swap.data).unwrap();
        assert_eq!(outer.deadline, U256::from(1_700_000_000u64));
        assert_eq!(outer.data.len(), 2);

        let swap = ISwapRouter02::exactInputSingleCall::abi_decode(&outer.data[0]).unwrap();
        assert_eq!(swap.params.recipient, UNISWAP_V3_ROUTER02);
        assert_eq!(swap.params.tokenOut, WETH_MAINNET);

        let unwrap = ISwapRouter02::unwrapWETH9Call::abi_decode(&outer.data[1]).unwrap();
        assert_eq!(unwrap.recipient, Address::repeat_byte(0x55));
        assert_eq!(unwrap.amountMinimum, U256::from(895u64));
    }

    #[test]
    fn test_native_in_sends_value() {
        let (adapter, params) = swap_params(RouterVersion::SwapRouter, NATIVE_TOKEN, USDC_MAINNET);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let calldata = adapter.build_swap_calldata(&chain, &params).unwrap();
        assert_eq!(calldata.swap.value, U256::from(1_000u64));
        assert!(calldata.approvals.is_empty());
    }

    /// tokens[0] -(fees[0])-> tokens[1] -(fees[1])-> tokens[2]
    fn two_hop_params(
        adapter: &ConcentratedLiquidityAdapter,
        token_in: Address,
        tokens: [Address; 3],
        fees: [u32; 2],
        token_out: Address,
    ) -> SwapParams {
        let chain = builtin_chain(ETHEREUM).unwrap();
        let mut hops = Vec::new();
        for (leg, (amount_in, amount_out)) in [(1_000u64, 900u64), (900, 850)].into_iter().enumerate() {
            let fee = FeeTier(fees[leg]);
            let ctx = adapter
                .hop_context(&chain, tokens[leg], tokens[leg + 1], U256::from(amount_in))
                .unwrap()
                .unwrap();
            let route = ctx
                .candidate(U256::from(amount_out), UNISWAP_V3_QUOTER_V2, fee.detail(), HopParams::FeeTier { fee })
                .unwrap();
            hops.extend(route.hops);
        }
        SwapParams {
            chain_id: ETHEREUM,
            token_in,
            token_out,
            amount_in: U256::from(1_000u64),
            min_amount_out: U256::from(845u64),
            recipient: Address::repeat_byte(0x55),
            deadline: 1_700_000_000,
            hops,
            sender: None,
        }
    }

    #[test]
    fn test_two_hop_uses_exact_input_with_packed_path() {
        let adapter = adapter(RouterVersion::SwapRouter);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let params = two_hop_params(
            &adapter,
            USDC_MAINNET,
            [USDC_MAINNET, WETH_MAINNET, DAI_MAINNET],
            [500, 3_000],
            DAI_MAINNET,
        );
        let calldata = adapter.build_swap_calldata(&chain, &params).unwrap();

        assert!(ISwapRouter::exactInputSingleCall::abi_decode(&calldata.swap.data).is_err());
        let decoded = ISwapRouter::exactInputCall::abi_decode(&calldata.swap.data).unwrap();
        assert_eq!(decoded.params.recipient, Address::repeat_byte(0x55));
        assert_eq!(decoded.params.amountIn, U256::from(1_000u64));
        assert_eq!(decoded.params.amountOutMinimum, U256::from(845u64));
        assert_eq!(decoded.params.deadline, U256::from(1_700_000_000u64));

        let path = decoded.params.path;
        assert_eq!(path.len(), 20 + 3 + 20 + 3 + 20);
        assert_eq!(&path[0..20], USDC_MAINNET.as_slice());
        assert_eq!(&path[20..23], &[0x00, 0x01, 0xf4]);
        assert_eq!(&path[23..43], WETH_MAINNET.as_slice());
        assert_eq!(&path[43..46], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&path[46..66], DAI_MAINNET.as_slice());
        assert_eq!(calldata.swap.description.as_deref(), Some("Uniswap V3 exactInput"));
    }

    #[test]
    fn test_two_hop_router02_native_out_unwraps() {
        let adapter = adapter(RouterVersion::SwapRouter02);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let params = two_hop_params(
            &adapter,
            USDC_MAINNET,
            [USDC_MAINNET, DAI_MAINNET, WETH_MAINNET],
            [100, 10_000],
            NATIVE_TOKEN,
        );
        let calldata = adapter.build_swap_calldata(&chain, &params).unwrap();

        let outer = ISwapRouter02::multicallCall::abi_decode(&calldata.swap.data).unwrap();
        assert_eq!(outer.data.len(), 2);

        let swap = ISwapRouter02::exactInputCall::abi_decode(&outer.data[0]).unwrap();
        assert_eq!(swap.params.recipient, UNISWAP_V3_ROUTER02);
        let path = swap.params.path;
        assert_eq!(&path[20..23], &[0x00, 0x00, 0x64]);
        assert_eq!(&path[23..43], DAI_MAINNET.as_slice());
        assert_eq!(&path[43..46], &[0x00, 0x27, 0x10]);
        assert_eq!(&path[46..66], WETH_MAINNET.as_slice());

        let unwrap = ISwapRouter02::unwrapWETH9Call::abi_decode(&outer.data[1]).unwrap();
        assert_eq!(unwrap.recipient, Address::repeat_byte(0x55));
    }

    #[test]
    fn test_broken_path_continuity_rejected() {
        let adapter = adapter(RouterVersion::SwapRouter);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let mut params = two_hop_params(
            &adapter,
            USDC_MAINNET,
            [USDC_MAINNET, WETH_MAINNET, DAI_MAINNET],
            [500, 3_000],
            DAI_MAINNET,
        );
        params.hops[1].path[0] = USDT_MAINNET;
        assert!(adapter.build_swap_calldata(&chain, &params).is_err());
    }

    #[test]
    fn test_tampered_detail_rejected() {
        let (adapter, mut params) = swap_params(RouterVersion::SwapRouter, USDC_MAINNET, WETH_MAINNET);
        params.hops[0].detail = FeeTier(3_000).detail();
        let chain = builtin_chain(ETHEREUM).unwrap();
        assert!(adapter.build_swap_calldata(&chain, &params).is_err());
    }
}
