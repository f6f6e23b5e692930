use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::Address;
use serde::Serialize;
use tracing::{debug, info};

use super::algebra::{AlgebraAdapter, AlgebraDeployment};
use super::curve::{StableSwapAdapter, StableSwapPool};
use super::traits::{AdapterError, DexPlugin};
use super::uniswap_v2::{ConstantProductAdapter, ConstantProductDeployment};
use super::uniswap_v3::{ConcentratedDeployment, ConcentratedLiquidityAdapter, RouterVersion};
use super::uniswap_v4::{SingletonDeployment, SingletonPoolAdapter};
use crate::config::{Config, DexConfig};
use crate::constants::*;
use crate::types::{ChainId, DexKind};

/// 등록 전 플러그인 정의 (설정 덮어쓰기 대상)
#[derive(Debug, Clone)]
pub enum PluginSpec {
    ConstantProduct(ConstantProductAdapter),
    Concentrated(ConcentratedLiquidityAdapter),
    Algebra(AlgebraAdapter),
    StableSwap(StableSwapAdapter),
    Singleton(SingletonPoolAdapter),
}

fn missing(dex: &DexConfig, field: &str, chain_id: ChainId) -> AdapterError {
    AdapterError::Configuration(format!(
        "{} has no deployment on chain {} and override is missing {}",
        dex.id, chain_id, field
    ))
}

/// 체인 지정 덮어쓰기면 해당 체인만, 아니면 모든 배포
fn target_chains<T>(deployments: &BTreeMap<ChainId, T>, dex: &DexConfig) -> Vec<ChainId> {
    match dex.chain_id {
        Some(chain_id) => vec![chain_id],
        None => deployments.keys().copied().collect(),
    }
}

impl PluginSpec {
    pub fn id(&self) -> &str {
        match self {
            PluginSpec::ConstantProduct(a) => &a.id,
            PluginSpec::Concentrated(a) => &a.id,
            PluginSpec::Algebra(a) => &a.id,
            PluginSpec::StableSwap(a) => &a.id,
            PluginSpec::Singleton(a) => &a.id,
        }
    }

    /// 한 체인의 배포 제거
    pub fn remove_chain(&mut self, chain_id: ChainId) {
        match self {
            PluginSpec::ConstantProduct(a) => {
                a.deployments.remove(&chain_id);
            }
            PluginSpec::Concentrated(a) => {
                a.deployments.remove(&chain_id);
            }
            PluginSpec::Algebra(a) => {
                a.deployments.remove(&chain_id);
            }
            PluginSpec::StableSwap(a) => a.pools.retain(|p| p.chain_id != chain_id),
            PluginSpec::Singleton(a) => {
                a.deployments.remove(&chain_id);
            }
        }
    }

    /// 설정 덮어쓰기 적용
    ///
    /// 배포가 없는 체인을 지정하면 필요한 주소가 모두 있어야 새 배포를 만든다.
    pub fn apply(&mut self, dex: &DexConfig) -> Result<(), AdapterError> {
        match self {
            PluginSpec::ConstantProduct(a) => {
                for chain_id in target_chains(&a.deployments, dex) {
                    let deployment = match a.deployments.entry(chain_id) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(e) => e.insert(ConstantProductDeployment {
                            router: dex.router.ok_or_else(|| missing(dex, "router", chain_id))?,
                            factory: dex.factory.ok_or_else(|| missing(dex, "factory", chain_id))?,
                            init_code_hash: None,
                        }),
                    };
                    if let Some(router) = dex.router {
                        deployment.router = router;
                    }
                    if let Some(factory) = dex.factory {
                        // 다른 팩토리면 init code hash 를 신뢰할 수 없으니 getPair 사용
                        if factory != deployment.factory {
                            deployment.init_code_hash = None;
                        }
                        deployment.factory = factory;
                    }
                }
            }
            PluginSpec::Concentrated(a) => {
                for chain_id in target_chains(&a.deployments, dex) {
                    let deployment = match a.deployments.entry(chain_id) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(e) => e.insert(ConcentratedDeployment {
                            quoter: dex.quoter.ok_or_else(|| missing(dex, "quoter", chain_id))?,
                            router: dex.router.ok_or_else(|| missing(dex, "router", chain_id))?,
                            router_version: RouterVersion::SwapRouter02,
                        }),
                    };
                    if let Some(quoter) = dex.quoter {
                        deployment.quoter = quoter;
                    }
                    if let Some(router) = dex.router {
                        deployment.router = router;
                    }
                }
                if let Some(tiers) = &dex.fee_tiers {
                    a.fee_tiers = tiers.clone();
                }
            }
            PluginSpec::Algebra(a) => {
                for chain_id in target_chains(&a.deployments, dex) {
                    let deployment = match a.deployments.entry(chain_id) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(e) => e.insert(AlgebraDeployment {
                            quoter: dex.quoter.ok_or_else(|| missing(dex, "quoter", chain_id))?,
                            router: dex.router.ok_or_else(|| missing(dex, "router", chain_id))?,
                        }),
                    };
                    if let Some(quoter) = dex.quoter {
                        deployment.quoter = quoter;
                    }
                    if let Some(router) = dex.router {
                        deployment.router = router;
                    }
                }
            }
            PluginSpec::StableSwap(a) => {
                if let Some(pools) = &dex.pools {
                    match dex.chain_id {
                        Some(chain_id) => {
                            a.pools.retain(|p| p.chain_id != chain_id);
                            a.pools.extend(pools.iter().filter(|p| p.chain_id == chain_id).cloned());
                        }
                        None => a.pools = pools.clone(),
                    }
                }
            }
            PluginSpec::Singleton(a) => {
                for chain_id in target_chains(&a.deployments, dex) {
                    let deployment = match a.deployments.entry(chain_id) {
                        Entry::Occupied(e) => e.into_mut(),
                        Entry::Vacant(e) => e.insert(SingletonDeployment {
                            quoter: dex.quoter.ok_or_else(|| missing(dex, "quoter", chain_id))?,
                            universal_router: dex.router.ok_or_else(|| missing(dex, "router", chain_id))?,
                            permit2: PERMIT2,
                        }),
                    };
                    if let Some(quoter) = dex.quoter {
                        deployment.quoter = quoter;
                    }
                    if let Some(router) = dex.router {
                        deployment.universal_router = router;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn into_plugin(self) -> Arc<dyn DexPlugin> {
        match self {
            PluginSpec::ConstantProduct(a) => Arc::new(a),
            PluginSpec::Concentrated(a) => Arc::new(a),
            PluginSpec::Algebra(a) => Arc::new(a),
            PluginSpec::StableSwap(a) => Arc::new(a),
            PluginSpec::Singleton(a) => Arc::new(a),
        }
    }
}

fn constant_product(
    id: &str,
    name: &str,
    fee_numerator: u32,
    deployments: Vec<(ChainId, ConstantProductDeployment)>,
) -> PluginSpec {
    PluginSpec::ConstantProduct(ConstantProductAdapter {
        id: id.to_string(),
        name: name.to_string(),
        fee_numerator,
        fee_denominator: 10_000,
        deployments: deployments.into_iter().collect(),
    })
}

fn concentrated(
    id: &str,
    name: &str,
    fee_tiers: &[u32],
    deployments: Vec<(ChainId, Address, Address, RouterVersion)>,
) -> PluginSpec {
    PluginSpec::Concentrated(ConcentratedLiquidityAdapter {
        id: id.to_string(),
        name: name.to_string(),
        fee_tiers: fee_tiers.to_vec(),
        deployments: deployments
            .into_iter()
            .map(|(chain_id, quoter, router, router_version)| {
                (chain_id, ConcentratedDeployment { quoter, router, router_version })
            })
            .collect(),
    })
}

fn algebra(id: &str, name: &str, chain_id: ChainId, quoter: Address, router: Address) -> PluginSpec {
    PluginSpec::Algebra(AlgebraAdapter {
        id: id.to_string(),
        name: name.to_string(),
        deployments: BTreeMap::from([(chain_id, AlgebraDeployment { quoter, router })]),
    })
}

/// 기본 플러그인 목록 (등록 순서 = 동률 시 우선순위)
pub fn default_specs() -> Vec<PluginSpec> {
    use RouterVersion::*;

    vec![
        constant_product(
            "uniswap_v2",
            "Uniswap V2",
            9_970,
            vec![
                (
                    ETHEREUM,
                    ConstantProductDeployment {
                        router: UNISWAP_V2_ROUTER,
                        factory: UNISWAP_V2_FACTORY,
                        init_code_hash: Some(UNISWAP_V2_INIT_CODE_HASH),
                    },
                ),
                (
                    BASE,
                    ConstantProductDeployment {
                        router: UNISWAP_V2_ROUTER_BASE,
                        factory: UNISWAP_V2_FACTORY_BASE,
                        init_code_hash: None,
                    },
                ),
            ],
        ),
        constant_product(
            "sushiswap",
            "SushiSwap",
            9_970,
            vec![(
                ETHEREUM,
                ConstantProductDeployment {
                    router: SUSHISWAP_ROUTER,
                    factory: SUSHISWAP_FACTORY,
                    init_code_hash: None,
                },
            )],
        ),
        constant_product(
            "pancakeswap_v2",
            "PancakeSwap V2",
            9_975,
            vec![(
                BSC,
                ConstantProductDeployment {
                    router: PANCAKE_V2_ROUTER,
                    factory: PANCAKE_V2_FACTORY,
                    init_code_hash: Some(PANCAKE_V2_INIT_CODE_HASH),
                },
            )],
        ),
        constant_product(
            "quickswap_v2",
            "QuickSwap V2",
            9_970,
            vec![(
                POLYGON,
                ConstantProductDeployment {
                    router: QUICKSWAP_V2_ROUTER,
                    factory: QUICKSWAP_V2_FACTORY,
                    init_code_hash: None,
                },
            )],
        ),
        concentrated(
            "uniswap_v3",
            "Uniswap V3",
            &UNISWAP_V3_FEE_TIERS,
            vec![
                (ETHEREUM, UNISWAP_V3_QUOTER_V2, UNISWAP_V3_ROUTER, SwapRouter),
                (OPTIMISM, UNISWAP_V3_QUOTER_V2, UNISWAP_V3_ROUTER02, SwapRouter02),
                (POLYGON, UNISWAP_V3_QUOTER_V2, UNISWAP_V3_ROUTER02, SwapRouter02),
                (ARBITRUM, UNISWAP_V3_QUOTER_V2, UNISWAP_V3_ROUTER02, SwapRouter02),
                (BASE, UNISWAP_V3_QUOTER_V2_BASE, UNISWAP_V3_ROUTER02_BASE, SwapRouter02),
            ],
        ),
        concentrated(
            "pancakeswap_v3",
            "PancakeSwap V3",
            &PANCAKE_V3_FEE_TIERS,
            vec![(BSC, PANCAKE_V3_QUOTER_V2, PANCAKE_V3_SMART_ROUTER, SwapRouter02)],
        ),
        algebra("quickswap_v3", "QuickSwap V3", POLYGON, QUICKSWAP_V3_QUOTER, QUICKSWAP_V3_ROUTER),
        algebra("camelot_v3", "Camelot V3", ARBITRUM, CAMELOT_V3_QUOTER, CAMELOT_V3_ROUTER),
        PluginSpec::StableSwap(StableSwapAdapter {
            id: "curve".to_string(),
            name: "Curve".to_string(),
            pools: vec![StableSwapPool {
                chain_id: ETHEREUM,
                address: CURVE_3POOL,
                name: "3pool".to_string(),
                coins: vec![DAI_MAINNET, USDC_MAINNET, USDT_MAINNET],
                receiver_supported: false,
            }],
        }),
        PluginSpec::Singleton(SingletonPoolAdapter {
            id: "uniswap_v4".to_string(),
            name: "Uniswap V4".to_string(),
            pool_configs: UNISWAP_V4_POOL_CONFIGS.to_vec(),
            hooks: Address::ZERO,
            deployments: BTreeMap::from([
                (
                    ETHEREUM,
                    SingletonDeployment {
                        quoter: UNISWAP_V4_QUOTER,
                        universal_router: UNISWAP_V4_UNIVERSAL_ROUTER,
                        permit2: PERMIT2,
                    },
                ),
                (
                    BASE,
                    SingletonDeployment {
                        quoter: UNISWAP_V4_QUOTER_BASE,
                        universal_router: UNISWAP_V4_UNIVERSAL_ROUTER_BASE,
                        permit2: PERMIT2,
                    },
                ),
            ]),
        }),
    ]
}

/// /api/dexes 응답 항목
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DexInfo {
    pub id: String,
    pub name: String,
    pub kind: DexKind,
    pub chains: Vec<ChainId>,
    pub supports_multi_hop: bool,
    pub reliability_score: f64,
}

/// DEX 플러그인 레지스트리
///
/// 등록 순서를 보존한다. 순위 동률 처리에 사용된다.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn DexPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 플러그인 전체
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in default_specs() {
            registry.register(spec.into_plugin());
        }
        registry
    }

    /// 내장 플러그인에 설정 덮어쓰기 적용
    pub fn from_config(config: &Config) -> Result<Self, AdapterError> {
        let mut specs = default_specs();

        for dex in &config.dexes {
            let Some(position) = specs.iter().position(|s| s.id() == dex.id) else {
                return Err(AdapterError::Configuration(format!("unknown dex id: {}", dex.id)));
            };

            match (dex.enabled, dex.chain_id) {
                (false, None) => {
                    info!("🚫 DEX 비활성화: {}", dex.id);
                    specs.remove(position);
                }
                (false, Some(chain_id)) => {
                    debug!("DEX {} 체인 {} 비활성화", dex.id, chain_id);
                    specs[position].remove_chain(chain_id);
                }
                (true, _) => specs[position].apply(dex)?,
            }
        }

        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec.into_plugin());
        }
        info!("✅ DEX 플러그인 {}개 등록", registry.len());
        Ok(registry)
    }

    /// 같은 id 가 있으면 교체 (순서 유지)
    pub fn register(&mut self, plugin: Arc<dyn DexPlugin>) {
        match self.plugins.iter().position(|p| p.id() == plugin.id()) {
            Some(index) => self.plugins[index] = plugin,
            None => self.plugins.push(plugin),
        }
    }

    pub fn with(mut self, plugin: Arc<dyn DexPlugin>) -> Self {
        self.register(plugin);
        self
    }

    pub fn plugins(&self) -> &[Arc<dyn DexPlugin>] {
        &self.plugins
    }

    /// 해당 체인을 지원하는 플러그인 (등록 순)
    pub fn for_chain(&self, chain_id: ChainId) -> Vec<Arc<dyn DexPlugin>> {
        self.plugins
            .iter()
            .filter(|p| p.supports_chain(chain_id))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn DexPlugin>> {
        self.plugins.iter().find(|p| p.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn describe(&self, chain_id: Option<ChainId>) -> Vec<DexInfo> {
        self.plugins
            .iter()
            .filter(|p| chain_id.map_or(true, |c| p.supports_chain(c)))
            .map(|p| DexInfo {
                id: p.id().to_string(),
                name: p.name().to_string(),
                kind: p.kind(),
                chains: p.supported_chains(),
                supports_multi_hop: p.supports_multi_hop(),
                reliability_score: p.kind().reliability_score(),
            })
            .collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.id()))
            .finish()
    }
}
