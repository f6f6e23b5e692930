use alloy::primitives::{address, b256, Address, B256};

use crate::types::ChainId;

// Chain ids
pub const ETHEREUM: ChainId = 1;
pub const OPTIMISM: ChainId = 10;
pub const BSC: ChainId = 56;
pub const POLYGON: ChainId = 137;
pub const BASE: ChainId = 8453;
pub const ARBITRUM: ChainId = 42161;

pub const SUPPORTED_CHAINS: [ChainId; 6] = [ETHEREUM, OPTIMISM, BSC, POLYGON, BASE, ARBITRUM];

/// 체인 네이티브 코인을 나타내는 예약 주소 (0x000...000)
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Multicall3 (모든 주요 EVM 체인에 동일 주소로 배포됨)
pub const MULTICALL3: Address = address!("ca11bde05977b3631167028862be2a173976ca11");
pub const DEFAULT_MULTICALL_BATCH_SIZE: usize = 100;

/// Uniswap Permit2 (V4 Universal Router 결제 경로)
pub const PERMIT2: Address = address!("000000000022d473030f116ddee9f6b43ac78ba3");

// Slippage / amounts
pub const BPS_DENOMINATOR: u32 = 10_000;
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50; // 0.5%
pub const DEFAULT_DEADLINE_SECS: u64 = 1_200; // 20분
pub const DEFAULT_QUOTE_TIMEOUT_MS: u64 = 3_000;

// Fee tier sets (hundredths of a bip, 3000 = 0.30%)
pub const UNISWAP_V3_FEE_TIERS: [u32; 4] = [100, 500, 3_000, 10_000];
pub const PANCAKE_V3_FEE_TIERS: [u32; 4] = [100, 500, 2_500, 10_000];
/// V4 표준 (fee, tickSpacing) 조합
pub const UNISWAP_V4_POOL_CONFIGS: [(u32, i32); 4] = [(100, 1), (500, 10), (3_000, 60), (10_000, 200)];

// Wrapped native tokens
pub const WETH_MAINNET: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
pub const WETH_OP_STACK: Address = address!("4200000000000000000000000000000000000006");
pub const WETH_ARBITRUM: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");
pub const WBNB: Address = address!("bb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c");
pub const WPOL: Address = address!("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270");

// Common token addresses (mainnet)
pub const USDC_MAINNET: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const USDT_MAINNET: Address = address!("dac17f958d2ee523a2206206994597c13d831ec7");
pub const DAI_MAINNET: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
pub const WBTC_MAINNET: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");

// USDC per chain
pub const USDC_OPTIMISM: Address = address!("0b2c639c533813f4aa9d7837caf62653d097ff85");
pub const USDC_BSC: Address = address!("8ac76a51cc950d9822d68b83fe1ad97b32cd580d");
pub const USDC_POLYGON: Address = address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359");
pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");
pub const USDC_ARBITRUM: Address = address!("af88d065e77c8cc2239327c5edb3a432268e5831");

// Uniswap V2 style routers / factories
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");
pub const UNISWAP_V2_FACTORY: Address = address!("5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f");
pub const UNISWAP_V2_INIT_CODE_HASH: B256 =
    b256!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");
pub const SUSHISWAP_ROUTER: Address = address!("d9e1ce17f2641f24ae83637ab66a2cca9c378b9f");
pub const SUSHISWAP_FACTORY: Address = address!("c0aee478e3658e2610c5f7a4a2e1777ce9e4f2ac");
pub const PANCAKE_V2_ROUTER: Address = address!("10ed43c718714eb63d5aa57b78b54704e256024e");
pub const PANCAKE_V2_FACTORY: Address = address!("ca143ce32fe78f1f7019d7d551a6402fc5350c73");
pub const PANCAKE_V2_INIT_CODE_HASH: B256 =
    b256!("00fb7f630766e6a796048ea87d01acd3068e8ff67d078148a3fa3f4a84f69bd5");
pub const QUICKSWAP_V2_ROUTER: Address = address!("a5e0829caced8ffdd4de3c43696c57f7d7a678ff");
pub const QUICKSWAP_V2_FACTORY: Address = address!("5757371414417b8c6caad45baef941abc7d3ab32");
pub const UNISWAP_V2_ROUTER_BASE: Address = address!("4752ba5dbc23f44d87826276bf6fd6b1c372ad24");
pub const UNISWAP_V2_FACTORY_BASE: Address = address!("8909dc15e40173ff4699343b6eb8132c65e18ec6");

// Uniswap V3 style quoters / routers
pub const UNISWAP_V3_ROUTER: Address = address!("e592427a0aece92de3edee1f18e0157c05861564");
pub const UNISWAP_V3_ROUTER02: Address = address!("68b3465833fb72a70ecdf485e0e4c7bd8665fc45");
pub const UNISWAP_V3_QUOTER_V2: Address = address!("61ffe014ba17989e743c5f6cb21bf9697530b21e");
pub const UNISWAP_V3_ROUTER02_BASE: Address = address!("2626664c2603336e57b271c5c0b26f421741e481");
pub const UNISWAP_V3_QUOTER_V2_BASE: Address = address!("3d4e44eb1374240ce5f1b871ab261cd16335b76a");
pub const PANCAKE_V3_SMART_ROUTER: Address = address!("13f4ea83d0bd40e75c8222255bc855a974568dd4");
pub const PANCAKE_V3_QUOTER_V2: Address = address!("b048bbc1ee6b733fffcfb9e9cef7375518e25997");

// Algebra (dynamic fee) deployments
pub const QUICKSWAP_V3_QUOTER: Address = address!("a15f0d7377b2a0c0c10db057f641bed21028fc89");
pub const QUICKSWAP_V3_ROUTER: Address = address!("f5b509bb0909a69b1c207e495f687a596c168e12");
pub const CAMELOT_V3_QUOTER: Address = address!("0fc73040b26e9bc8514fa028d998e73a254fa76e");
pub const CAMELOT_V3_ROUTER: Address = address!("1f721e2e82f6676fce4ea07a5958cf098d339e18");

// Curve
pub const CURVE_3POOL: Address = address!("bebc44782c7db0a1a60cb6fe97d0b483032ff1c7");

// Uniswap V4 (검증 필요: 배포 주소는 설정으로 덮어쓸 수 있음)
pub const UNISWAP_V4_QUOTER: Address = address!("52f0e24d1c21c8a0cb1e5a5dd6198556bd9e1203");
pub const UNISWAP_V4_UNIVERSAL_ROUTER: Address = address!("66a9893cc07d91d95644aedd05d03f95e1dba8af");
pub const UNISWAP_V4_QUOTER_BASE: Address = address!("0d5e0f971ed27fbff6c2837bf31316121532048d");
pub const UNISWAP_V4_UNIVERSAL_ROUTER_BASE: Address = address!("6ff5693b99212da76ad316178a184ab56d299b43");

/// 체인별 wrapped native 토큰 주소
pub fn wrapped_native(chain_id: ChainId) -> Option<Address> {
    match chain_id {
        ETHEREUM => Some(WETH_MAINNET),
        OPTIMISM | BASE => Some(WETH_OP_STACK),
        ARBITRUM => Some(WETH_ARBITRUM),
        BSC => Some(WBNB),
        POLYGON => Some(WPOL),
        _ => None,
    }
}

/// 체인별 USDC 주소
pub fn usdc(chain_id: ChainId) -> Option<Address> {
    match chain_id {
        ETHEREUM => Some(USDC_MAINNET),
        OPTIMISM => Some(USDC_OPTIMISM),
        BSC => Some(USDC_BSC),
        POLYGON => Some(USDC_POLYGON),
        BASE => Some(USDC_BASE),
        ARBITRUM => Some(USDC_ARBITRUM),
        _ => None,
    }
}

pub fn chain_name(chain_id: ChainId) -> &'static str {
    match chain_id {
        ETHEREUM => "ethereum",
        OPTIMISM => "optimism",
        BSC => "bsc",
        POLYGON => "polygon",
        BASE => "base",
        ARBITRUM => "arbitrum",
        _ => "unknown",
    }
}
