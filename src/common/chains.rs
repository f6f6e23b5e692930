use std::collections::HashMap;

use alloy::primitives::Address;

use crate::constants::*;
use crate::types::{ChainConfig, ChainId, TokenInfo};

/// 체인 설정 조회 테이블
#[derive(Debug, Clone, Default)]
pub struct ChainDirectory {
    chains: HashMap<ChainId, ChainConfig>,
}

impl ChainDirectory {
    pub fn new(configs: impl IntoIterator<Item = ChainConfig>) -> Self {
        Self {
            chains: configs.into_iter().map(|c| (c.chain_id, c)).collect(),
        }
    }

    /// 기본 내장 체인 (Ethereum, Optimism, BSC, Polygon, Base, Arbitrum)
    pub fn builtin() -> Self {
        Self::new(SUPPORTED_CHAINS.iter().filter_map(|id| builtin_chain(*id)))
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn insert(&mut self, config: ChainConfig) {
        self.chains.insert(config.chain_id, config);
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// 내장 체인 설정
pub fn builtin_chain(chain_id: ChainId) -> Option<ChainConfig> {
    let wrapped = wrapped_native(chain_id)?;
    let (native_symbol, wrapped_symbol) = match chain_id {
        BSC => ("BNB", "WBNB"),
        POLYGON => ("POL", "WPOL"),
        _ => ("ETH", "WETH"),
    };

    let mut tokens = vec![TokenInfo::new(chain_id, wrapped, wrapped_symbol, 18)];
    let mut intermediates: Vec<Address> = vec![wrapped];

    if let Some(usdc) = usdc(chain_id) {
        // BSC 의 Binance-Peg USDC 는 18 decimals
        let decimals = if chain_id == BSC { 18 } else { 6 };
        tokens.push(TokenInfo::new(chain_id, usdc, "USDC", decimals));
        intermediates.push(usdc);
    }

    if chain_id == ETHEREUM {
        tokens.push(TokenInfo::new(chain_id, USDT_MAINNET, "USDT", 6));
        tokens.push(TokenInfo::new(chain_id, DAI_MAINNET, "DAI", 18));
        tokens.push(TokenInfo::new(chain_id, WBTC_MAINNET, "WBTC", 8));
        intermediates.push(USDT_MAINNET);
    }

    Some(ChainConfig {
        chain_id,
        name: chain_name(chain_id).to_string(),
        native_symbol: native_symbol.to_string(),
        native_decimals: 18,
        wrapped_native: Some(wrapped),
        tokens,
        intermediate_tokens: intermediates,
    })
}
