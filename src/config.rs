use std::collections::HashSet;
use std::path::Path;

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::curve::StableSwapPool;
use crate::common::chains::{builtin_chain, ChainDirectory};
use crate::constants::*;
use crate::types::{ChainConfig, ChainId, FeeTier, TokenInfo};

fn default_true() -> bool {
    true
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_native_decimals() -> u8 {
    18
}

fn default_multicall_batch_size() -> usize {
    DEFAULT_MULTICALL_BATCH_SIZE
}

/// 설정 파일의 토큰 항목
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenEntry {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    /// 비어 있으면 내장 값 사용
    #[serde(default)]
    pub wrapped_native: Option<Address>,
    /// 비어 있으면 내장 값 사용
    #[serde(default)]
    pub intermediate_tokens: Vec<Address>,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
    #[serde(default = "default_multicall_batch_size")]
    pub multicall_batch_size: usize,
}

impl NetworkConfig {
    /// 내장 체인 정보와 합쳐 ChainConfig 생성 (설정 값 우선)
    pub fn chain_config(&self) -> ChainConfig {
        let builtin = builtin_chain(self.chain_id);

        let wrapped_native = self
            .wrapped_native
            .or_else(|| builtin.as_ref().and_then(|c| c.wrapped_native));

        let mut tokens: Vec<TokenInfo> = builtin.as_ref().map(|c| c.tokens.clone()).unwrap_or_default();
        for entry in &self.tokens {
            tokens.retain(|t| t.address != entry.address);
            tokens.push(TokenInfo {
                address: entry.address,
                symbol: entry.symbol.clone(),
                name: entry.name.clone().unwrap_or_else(|| entry.symbol.clone()),
                decimals: entry.decimals,
                logo_uri: None,
                chain_id: self.chain_id,
            });
        }

        let intermediate_tokens = if self.intermediate_tokens.is_empty() {
            builtin.as_ref().map(|c| c.intermediate_tokens.clone()).unwrap_or_default()
        } else {
            self.intermediate_tokens.clone()
        };

        ChainConfig {
            chain_id: self.chain_id,
            name: self.name.clone(),
            native_symbol: self.native_symbol.clone(),
            native_decimals: self.native_decimals,
            wrapped_native,
            tokens,
            intermediate_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// 플러그인 하나의 견적 제한 시간
    pub quote_timeout_ms: u64,
    pub enable_multi_hop: bool,
    /// 직접 경로가 있으면 멀티홉 탐색 생략
    pub multi_hop_only_when_no_direct: bool,
    pub max_intermediates: usize,
    pub max_alternatives: usize,
    /// 가격 영향 측정용 표본 견적 = amountIn / sample_divisor
    pub sample_divisor: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub default_slippage_bps: u32,
    pub max_slippage_bps: u32,
    pub default_deadline_secs: u64,
    /// 기존 allowance 가 충분하면 승인 트랜잭션 생략
    pub check_allowance: bool,
}

/// DEX 플러그인 설정 덮어쓰기
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexConfig {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 지정하면 해당 체인 배포에만 주소 덮어쓰기 적용
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    #[serde(default)]
    pub router: Option<Address>,
    #[serde(default)]
    pub quoter: Option<Address>,
    #[serde(default)]
    pub factory: Option<Address>,
    #[serde(default)]
    pub fee_tiers: Option<Vec<u32>>,
    #[serde(default)]
    pub pools: Option<Vec<StableSwapPool>>,
}

/// 파일에서 읽은 항목과 같이 기본은 활성 상태
impl Default for DexConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            chain_id: None,
            router: None,
            quoter: None,
            factory: None,
            fee_tiers: None,
            pools: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: Vec<NetworkConfig>,
    pub aggregator: AggregatorConfig,
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub dexes: Vec<DexConfig>,
    pub api: ApiConfig,
    pub monitoring: MonitoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        let rpc = |chain_id: ChainId| match chain_id {
            ETHEREUM => "https://eth.llamarpc.com",
            OPTIMISM => "https://mainnet.optimism.io",
            BSC => "https://bsc-dataseed.binance.org",
            POLYGON => "https://polygon-rpc.com",
            BASE => "https://mainnet.base.org",
            _ => "https://arb1.arbitrum.io/rpc",
        };

        let networks = SUPPORTED_CHAINS
            .iter()
            .filter_map(|id| builtin_chain(*id))
            .map(|chain| NetworkConfig {
                chain_id: chain.chain_id,
                name: chain.name.clone(),
                rpc_url: rpc(chain.chain_id).to_string(),
                enabled: true,
                native_symbol: chain.native_symbol.clone(),
                native_decimals: chain.native_decimals,
                wrapped_native: None,
                intermediate_tokens: Vec::new(),
                tokens: Vec::new(),
                multicall_batch_size: DEFAULT_MULTICALL_BATCH_SIZE,
            })
            .collect();

        Self {
            networks,
            aggregator: AggregatorConfig {
                quote_timeout_ms: DEFAULT_QUOTE_TIMEOUT_MS,
                enable_multi_hop: true,
                multi_hop_only_when_no_direct: false,
                max_intermediates: 3,
                max_alternatives: 5,
                sample_divisor: 1_000,
            },
            execution: ExecutionConfig {
                default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
                max_slippage_bps: 5_000,
                default_deadline_secs: DEFAULT_DEADLINE_SECS,
                check_allowance: true,
            },
            dexes: Vec::new(),
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            monitoring: MonitoringConfig {
                log_level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 파일이 없으면 기본 설정 사용
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            info!("📋 설정 파일 로드: {}", path);
            Self::load(path).await
        } else {
            warn!("⚠️ 설정 파일 없음 ({}), 기본 설정 사용", path);
            Ok(Self::default())
        }
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// 환경 변수 덮어쓰기 (RPC_URL_<CHAIN_ID>, API_PORT, QUOTE_TIMEOUT_MS, DEFAULT_SLIPPAGE_BPS)
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        for network in &mut self.networks {
            if let Some(url) = lookup(&format!("RPC_URL_{}", network.chain_id)) {
                network.rpc_url = url;
            }
        }
        if let Some(port) = lookup("API_PORT") {
            self.api.port = port.parse().map_err(|_| anyhow!("Invalid API_PORT: {}", port))?;
        }
        if let Some(timeout) = lookup("QUOTE_TIMEOUT_MS") {
            self.aggregator.quote_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid QUOTE_TIMEOUT_MS: {}", timeout))?;
        }
        if let Some(bps) = lookup("DEFAULT_SLIPPAGE_BPS") {
            self.execution.default_slippage_bps = bps
                .parse()
                .map_err(|_| anyhow!("Invalid DEFAULT_SLIPPAGE_BPS: {}", bps))?;
        }
        Ok(())
    }

    pub fn network(&self, chain_id: ChainId) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.chain_id == chain_id && n.enabled)
    }

    pub fn enabled_networks(&self) -> Vec<&NetworkConfig> {
        self.networks.iter().filter(|n| n.enabled).collect()
    }

    pub fn get_dex(&self, id: &str) -> Option<&DexConfig> {
        self.dexes.iter().find(|d| d.id == id)
    }

    pub fn chain_directory(&self) -> ChainDirectory {
        ChainDirectory::new(self.enabled_networks().into_iter().map(NetworkConfig::chain_config))
    }

    pub fn validate(&self) -> Result<()> {
        let enabled = self.enabled_networks();
        if enabled.is_empty() {
            return Err(anyhow!("At least one network must be enabled"));
        }

        let mut chain_ids = HashSet::new();
        for network in &self.networks {
            if !chain_ids.insert(network.chain_id) {
                return Err(anyhow!("Duplicate network chain id {}", network.chain_id));
            }
            if network.enabled && network.rpc_url.trim().is_empty() {
                return Err(anyhow!("Network {} RPC URL cannot be empty", network.name));
            }
            if network.multicall_batch_size == 0 {
                return Err(anyhow!("Network {} multicall batch size must be positive", network.name));
            }
        }

        if self.aggregator.quote_timeout_ms == 0 {
            return Err(anyhow!("Quote timeout must be greater than 0"));
        }
        if self.aggregator.sample_divisor < 2 {
            return Err(anyhow!("Sample divisor must be at least 2"));
        }

        if self.execution.max_slippage_bps > BPS_DENOMINATOR {
            return Err(anyhow!("Max slippage cannot exceed {} bps", BPS_DENOMINATOR));
        }
        if self.execution.default_slippage_bps > self.execution.max_slippage_bps {
            return Err(anyhow!("Default slippage exceeds max slippage"));
        }
        if self.execution.default_deadline_secs == 0 {
            return Err(anyhow!("Default deadline must be greater than 0"));
        }

        let mut dex_ids = HashSet::new();
        for dex in &self.dexes {
            if !dex_ids.insert((dex.id.as_str(), dex.chain_id)) {
                return Err(anyhow!("Duplicate dex override {}", dex.id));
            }
            if let Some(tiers) = &dex.fee_tiers {
                if tiers.is_empty() || tiers.iter().any(|t| *t > FeeTier::MAX) {
                    return Err(anyhow!("Dex {} has invalid fee tiers", dex.id));
                }
            }
        }

        if self.api.port == 0 {
            return Err(anyhow!("API port must be non-zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.networks.len(), SUPPORTED_CHAINS.len());
        assert!(config.network(ETHEREUM).is_some());
        assert_eq!(config.aggregator.quote_timeout_ms, DEFAULT_QUOTE_TIMEOUT_MS);
        assert_eq!(config.execution.default_slippage_bps, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.networks[0].rpc_url = "".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.execution.default_slippage_bps = 9_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.aggregator.quote_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        let duplicate = config.networks[0].clone();
        config.networks.push(duplicate);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dexes.push(DexConfig {
            id: "uniswap_v3".to_string(),
            fee_tiers: Some(vec![2_000_000]),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dex_override_is_enabled_by_default() {
        let parsed: DexConfig = toml::from_str(
            r#"
            id = "uniswap_v3"
            chain_id = 56
            router = "0x2121212121212121212121212121212121212121"
            "#,
        )
        .unwrap();
        let built = DexConfig { id: "uniswap_v3".to_string(), ..Default::default() };

        assert!(parsed.enabled);
        assert_eq!(built.enabled, parsed.enabled);
        assert_eq!(parsed.router, Some(Address::repeat_byte(0x21)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RPC_URL_8453", "http://localhost:9545"),
            ("API_PORT", "9000"),
            ("QUOTE_TIMEOUT_MS", "750"),
        ]);
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.network(BASE).unwrap().rpc_url, "http://localhost:9545");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.aggregator.quote_timeout_ms, 750);

        let bad = config.apply_overrides(|key| (key == "API_PORT").then(|| "abc".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn test_chain_config_merges_builtin() {
        let mut config = Config::default();
        let custom = Address::repeat_byte(0x77);
        config.networks[0].tokens.push(TokenEntry {
            address: custom,
            symbol: "CUST".to_string(),
            decimals: 9,
            name: None,
        });

        let chain = config.networks[0].chain_config();
        assert_eq!(chain.wrapped_native, Some(WETH_MAINNET));
        assert_eq!(chain.find_token(custom).unwrap().decimals, 9);
        assert!(chain.find_by_symbol("USDC").is_some());
        assert!(!chain.intermediate_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_config_file_round_trip() {
        let mut config = Config::default();
        config.dexes.push(DexConfig {
            id: "uniswap_v3".to_string(),
            chain_id: Some(BASE),
            quoter: Some(Address::repeat_byte(0x12)),
            ..Default::default()
        });

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_str.as_bytes()).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded.networks.len(), config.networks.len());
        assert_eq!(loaded.get_dex("uniswap_v3").unwrap().quoter, Some(Address::repeat_byte(0x12)));
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = tokio_test::block_on(Config::load_or_default("/nonexistent/swap-router.toml")).unwrap();
        assert_eq!(config.networks.len(), SUPPORTED_CHAINS.len());
    }
}
