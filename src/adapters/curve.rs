use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::*;
use crate::blockchain::abi::{ICurvePool, ICurvePoolNg, IWETH9};
use crate::common::normalize::is_native;
use crate::types::{
    Approval, ChainConfig, ChainId, DexKind, HopParams, SwapCalldata, SwapParams, TxRequest,
};

/// 설정된 stable-swap 풀
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableSwapPool {
    pub chain_id: ChainId,
    pub address: Address,
    pub name: String,
    /// coins(i) 순서의 토큰 주소
    pub coins: Vec<Address>,
    /// exchange(..., receiver) 지원 여부 (NG 풀)
    #[serde(default)]
    pub receiver_supported: bool,
}

impl StableSwapPool {
    fn index_of(&self, token: Address) -> Option<u8> {
        self.coins.iter().position(|c| *c == token).and_then(|i| u8::try_from(i).ok())
    }
}

/// Curve 계열 풀 어댑터
///
/// 풀 목록은 설정으로 주어지며, 단일 풀 안의 교환만 지원한다.
#[derive(Debug, Clone)]
pub struct StableSwapAdapter {
    pub id: String,
    pub name: String,
    pub pools: Vec<StableSwapPool>,
}

impl StableSwapAdapter {
    fn find_pool(&self, chain_id: ChainId, pool: Address) -> Option<&StableSwapPool> {
        self.pools.iter().find(|p| p.chain_id == chain_id && p.address == pool)
    }
}

#[async_trait]
impl DexPlugin for StableSwapAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DexKind {
        DexKind::StableSwap
    }

    fn supported_chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.pools.iter().map(|p| p.chain_id).collect();
        chains.sort_unstable();
        chains.dedup();
        chains
    }

    /// 풀마다 주소가 다르므로 단일 라우터가 없다
    fn router_address(&self, _chain_id: ChainId) -> Option<Address> {
        None
    }

    fn supports_multi_hop(&self) -> bool {
        false
    }

    fn build_quote_calls(&self, ctx: &HopContext) -> Result<Vec<QuoteCall>, AdapterError> {
        // 풀에서 받은 wrapped 토큰을 unwrap 할 방법이 없다
        if ctx.native_out {
            return Ok(Vec::new());
        }

        let calls = self
            .pools
            .iter()
            .filter(|p| p.chain_id == ctx.chain_id)
            .filter_map(|pool| {
                let i = pool.index_of(ctx.token_in)?;
                let j = pool.index_of(ctx.token_out)?;
                let data = ICurvePool::get_dyCall {
                    i: i128::from(i),
                    j: i128::from(j),
                    dx: ctx.amount_in,
                }
                .abi_encode();

                let ctx = ctx.clone();
                let address = pool.address;
                let detail = format!("Pool: {}", pool.name);
                Some(QuoteCall::new(address, data, move |output| {
                    let amount_out = ICurvePool::get_dyCall::abi_decode_returns(output).ok()?;
                    ctx.candidate(
                        amount_out,
                        address,
                        detail.clone(),
                        HopParams::StableSwap { pool: address, i, j },
                    )
                }))
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
        if params.hops.len() != 1 {
            return Err(AdapterError::UnsupportedRoute(format!(
                "{} only executes single-pool swaps",
                self.id
            )));
        }
        if is_native(params.token_out) {
            return Err(AdapterError::UnsupportedRoute(format!(
                "{} cannot deliver native coin",
                self.id
            )));
        }

        let HopParams::StableSwap { pool, i, j } = params.hops[0].params else {
            return Err(AdapterError::CalldataGenerationFailed(format!(
                "unexpected hop params for {}: {:?}",
                self.id, params.hops[0].params
            )));
        };
        let pool_config = self.find_pool(chain.chain_id, pool).ok_or_else(|| {
            AdapterError::Configuration(format!("unknown pool {} on chain {}", pool, chain.chain_id))
        })?;
        if pool_config.index_of(tokens[0]) != Some(i) || pool_config.index_of(tokens[1]) != Some(j) {
            return Err(AdapterError::CalldataGenerationFailed(format!(
                "coin indices {}/{} do not match pool {}",
                i, j, pool_config.name
            )));
        }

        let data = if pool_config.receiver_supported {
            ICurvePoolNg::exchangeCall {
                i: i128::from(i),
                j: i128::from(j),
                dx: params.amount_in,
                min_dy: params.min_amount_out,
                receiver: params.recipient,
            }
            .abi_encode()
        } else {
            // 구형 풀은 msg.sender 에게만 보낸다. 서명자가 곧 수령자일 때만 허용
            if params.sender != Some(params.recipient) {
                return Err(AdapterError::UnsupportedRoute(format!(
                    "pool {} cannot send to a different recipient",
                    pool_config.name
                )));
            }
            ICurvePool::exchangeCall {
                i: i128::from(i),
                j: i128::from(j),
                dx: params.amount_in,
                min_dy: params.min_amount_out,
            }
            .abi_encode()
        };

        let mut pre_transactions = Vec::new();
        if is_native(params.token_in) {
            // 네이티브 입력은 먼저 wrap 한 뒤 풀에 승인
            pre_transactions.push(TxRequest {
                to: tokens[0],
                data: IWETH9::depositCall {}.abi_encode().into(),
                value: params.amount_in,
                description: Some("wrap native".to_string()),
            });
        }

        Ok(SwapCalldata {
            pre_transactions,
            approvals: vec![Approval::Erc20 {
                token: tokens[0],
                spender: pool,
                amount: params.amount_in,
            }],
            swap: TxRequest {
                to: pool,
                data: data.into(),
                value: U256::ZERO,
                description: Some(format!("{} exchange ({})", self.name, pool_config.name)),
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
    use alloy::sol_types::SolValue;

    fn three_pool(receiver_supported: bool) -> StableSwapAdapter {
        StableSwapAdapter {
            id: "curve".to_string(),
            name: "Curve".to_string(),
            pools: vec![StableSwapPool {
                chain_id: ETHEREUM,
                address: CURVE_3POOL,
                name: "3pool".to_string(),
                coins: vec![DAI_MAINNET, USDC_MAINNET, USDT_MAINNET],
                receiver_supported,
            }],
        }
    }

    #[tokio::test]
    async fn test_quote_uses_coin_indices() {
        let adapter = three_pool(false);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let client = MockChainClient::new(ETHEREUM);

        let expected = ICurvePool::get_dyCall { i: 1, j: 2, dx: U256::from(1_000_000u64) }.abi_encode();
        client.respond(CURVE_3POOL, expected, MockResponse::ok(U256::from(999_500u64).abi_encode()));

        let candidate = adapter
            .quote_single_hop(&client, &chain, USDC_MAINNET, USDT_MAINNET, U256::from(1_000_000u64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(candidate.amount_out, U256::from(999_500u64));
        assert_eq!(candidate.hops[0].detail, "Pool: 3pool");
        assert_eq!(
            candidate.hops[0].params,
            HopParams::StableSwap { pool: CURVE_3POOL, i: 1, j: 2 }
        );
    }

    #[tokio::test]
    async fn test_pair_outside_pool_has_no_route() {
        let adapter = three_pool(false);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let client = MockChainClient::new(ETHEREUM);
        let quote = adapter
            .quote_single_hop(&client, &chain, WETH_MAINNET, USDC_MAINNET, U256::from(1u64))
            .await
            .unwrap();
        assert!(quote.is_none());
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_native_out_declined_at_quote_time() {
        let adapter = StableSwapAdapter {
            pools: vec![StableSwapPool {
                chain_id: ETHEREUM,
                address: Address::repeat_byte(0x0e),
                name: "steth".to_string(),
                coins: vec![WETH_MAINNET, USDC_MAINNET],
                receiver_supported: true,
            }],
            ..three_pool(true)
        };
        let chain = builtin_chain(ETHEREUM).unwrap();
        let ctx = adapter
            .hop_context(&chain, USDC_MAINNET, NATIVE_TOKEN, U256::from(1u64))
            .unwrap()
            .unwrap();
        assert!(adapter.build_quote_calls(&ctx).unwrap().is_empty());

        let ctx = adapter
            .hop_context(&chain, NATIVE_TOKEN, USDC_MAINNET, U256::from(1u64))
            .unwrap()
            .unwrap();
        assert_eq!(adapter.build_quote_calls(&ctx).unwrap().len(), 1);
    }

    fn params(adapter: &StableSwapAdapter, token_in: Address, token_out: Address) -> SwapParams {
        let chain = builtin_chain(ETHEREUM).unwrap();
        let ctx = adapter
            .hop_context(&chain, token_in, token_out, U256::from(1_000u64))
            .unwrap()
            .unwrap();
        let pool = &adapter.pools[0];
        let i = pool.index_of(ctx.token_in).unwrap();
        let j = pool.index_of(ctx.token_out).unwrap();
        let route = ctx
            .candidate(U256::from(990u64), pool.address, format!("Pool: {}", pool.name), HopParams::StableSwap {
                pool: pool.address,
                i,
                j,
            })
            .unwrap();
        SwapParams {
            chain_id: ETHEREUM,
            token_in,
            token_out,
            amount_in: U256::from(1_000u64),
            min_amount_out: U256::from(985u64),
            recipient: Address::repeat_byte(0x21),
            deadline: 10,
            hops: route.hops,
            sender: None,
        }
    }

    #[test]
    fn test_ng_exchange_has_receiver() {
        let adapter = three_pool(true);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let calldata = adapter
            .build_swap_calldata(&chain, &params(&adapter, DAI_MAINNET, USDC_MAINNET))
            .unwrap();

        let decoded = ICurvePoolNg::exchangeCall::abi_decode(&calldata.swap.data).unwrap();
        assert_eq!((decoded.i, decoded.j), (0, 1));
        assert_eq!(decoded.receiver, Address::repeat_byte(0x21));
        assert_eq!(decoded.min_dy, U256::from(985u64));
        assert_eq!(calldata.swap.to, CURVE_3POOL);
    }

    #[test]
    fn test_legacy_exchange_requires_sender_as_recipient() {
        let adapter = three_pool(false);
        let chain = builtin_chain(ETHEREUM).unwrap();
        let mut p = params(&adapter, DAI_MAINNET, USDC_MAINNET);

        // 서명자를 모르면 출력이 누구에게 갈지 보장할 수 없다
        assert!(matches!(
            adapter.build_swap_calldata(&chain, &p),
            Err(AdapterError::UnsupportedRoute(_))
        ));

        p.sender = Some(Address::repeat_byte(0x01));
        assert!(matches!(
            adapter.build_swap_calldata(&chain, &p),
            Err(AdapterError::UnsupportedRoute(_))
        ));

        p.sender = Some(p.recipient);
        let calldata = adapter.build_swap_calldata(&chain, &p).unwrap();
        let decoded = ICurvePool::exchangeCall::abi_decode(&calldata.swap.data).unwrap();
        assert_eq!((decoded.i, decoded.j), (0, 1));
        assert_eq!(decoded.min_dy, U256::from(985u64));
    }

    #[test]
    fn test_native_in_wraps_first() {
        let adapter = StableSwapAdapter {
            pools: vec![StableSwapPool {
                chain_id: ETHEREUM,
                address: Address::repeat_byte(0x0e),
                name: "weth-usdc".to_string(),
                coins: vec![WETH_MAINNET, USDC_MAINNET],
                receiver_supported: true,
            }],
            ..three_pool(true)
        };
        let chain = builtin_chain(ETHEREUM).unwrap();
        let calldata = adapter
            .build_swap_calldata(&chain, &params(&adapter, NATIVE_TOKEN, USDC_MAINNET))
            .unwrap();

        assert_eq!(calldata.pre_transactions.len(), 1);
        assert_eq!(calldata.pre_transactions[0].to, WETH_MAINNET);
        assert_eq!(calldata.pre_transactions[0].value, U256::from(1_000u64));
        assert_eq!(
            calldata.approvals,
            vec![Approval::Erc20 { token: WETH_MAINNET, spender: Address::repeat_byte(0x0e), amount: U256::from(1_000u64) }]
        );
        assert_eq!(calldata.swap.value, U256::ZERO);
    }
}
