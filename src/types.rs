use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::normalize::{normalize_address, NormalizeError};
use crate::constants::NATIVE_TOKEN;

pub type ChainId = u64;

/// U256 을 10진수 문자열로 직렬화 (API 응답용)
pub mod u256_dec {
    use alloy::primitives::U256;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim().parse::<U256>().map_err(D::Error::custom)
    }
}

/// 토큰 정보 (불변 값 객체)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u8,
    #[serde(default, rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    pub chain_id: ChainId,
}

impl TokenInfo {
    pub fn new(chain_id: ChainId, address: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals,
            logo_uri: None,
            chain_id,
        }
    }

    /// 네이티브 코인 예약 주소인지 확인
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN
    }
}

/// 체인 설정 (외부 설정 제공자가 공급, 프로세스당 한 번 로드)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub wrapped_native: Option<Address>,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
    /// 멀티홉 경로에 사용할 중간 토큰
    #[serde(default)]
    pub intermediate_tokens: Vec<Address>,
}

impl ChainConfig {
    pub fn native_token(&self) -> TokenInfo {
        TokenInfo::new(self.chain_id, NATIVE_TOKEN, &self.native_symbol, self.native_decimals)
    }

    /// 주소로 토큰 조회 (네이티브 예약 주소 포함)
    pub fn find_token(&self, address: Address) -> Option<TokenInfo> {
        if address == NATIVE_TOKEN {
            return Some(self.native_token());
        }
        self.tokens.iter().find(|t| t.address == address).cloned()
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<TokenInfo> {
        if symbol.eq_ignore_ascii_case(&self.native_symbol) {
            return Some(self.native_token());
        }
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
    }

    pub fn normalize(&self, address: Address) -> Result<Address, NormalizeError> {
        normalize_address(self.chain_id, self.wrapped_native, address)
    }
}

/// 유동성 프로토콜 계열
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DexKind {
    /// x*y=k (Uniswap V2 및 포크)
    ConstantProduct,
    /// fee tier 별 풀 (Uniswap V3 및 포크)
    ConcentratedLiquidity,
    /// Algebra 계열 동적 수수료 풀
    DynamicFee,
    /// Curve 계열 stable-swap
    StableSwap,
    /// 싱글톤 풀 매니저 (Uniswap V4)
    SingletonPool,
}

impl DexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DexKind::ConstantProduct => "constant_product",
            DexKind::ConcentratedLiquidity => "concentrated_liquidity",
            DexKind::DynamicFee => "dynamic_fee",
            DexKind::StableSwap => "stable_swap",
            DexKind::SingletonPool => "singleton_pool",
        }
    }

    /// 신뢰도 점수 (견적과 실제 체결의 일치 가능성)
    pub fn reliability_score(&self) -> f64 {
        match self {
            DexKind::ConstantProduct => 0.95,
            DexKind::ConcentratedLiquidity => 0.95,
            DexKind::StableSwap => 0.93,
            DexKind::DynamicFee => 0.9,
            DexKind::SingletonPool => 0.85, // 훅 때문에 체결 결과가 달라질 수 있음
        }
    }
}

impl fmt::Display for DexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fee tier string: {0}")]
pub struct FeeTierParseError(pub String);

/// 수수료 티어 (hundredths of a bip, 3000 = 0.30%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeTier(pub u32);

impl FeeTier {
    pub const MAX: u32 = 1_000_000;

    pub const fn new(pips: u32) -> Self {
        Self(pips)
    }

    pub fn pips(self) -> u32 {
        self.0
    }

    /// V2 스타일 수수료 비율 (예: 9975/10000) 을 티어 단위로 변환
    pub fn from_ratio(numerator: u32, denominator: u32) -> Self {
        if denominator == 0 || numerator > denominator {
            return Self(0);
        }
        let pips = (denominator - numerator) as u64 * Self::MAX as u64 / denominator as u64;
        Self(pips as u32)
    }

    /// 경로 표시용 문자열 ("Fee: 0.05%")
    pub fn detail(self) -> String {
        format!("Fee: {}", self)
    }

    /// `detail()` 로 만든 문자열에서 티어를 복원
    pub fn from_detail(detail: &str) -> Result<Self, FeeTierParseError> {
        let start = detail
            .find("Fee:")
            .ok_or_else(|| FeeTierParseError(detail.to_string()))?;
        let rest = &detail[start + "Fee:".len()..];
        let value = rest.split(',').next().unwrap_or_default();
        value.parse()
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 10_000;
        let mut frac = format!("{:04}", self.0 % 10_000);
        while frac.len() > 2 && frac.ends_with('0') {
            frac.pop();
        }
        write!(f, "{}.{}%", whole, frac)
    }
}

impl FromStr for FeeTier {
    type Err = FeeTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FeeTierParseError(s.to_string());
        let number = s.trim().strip_suffix('%').ok_or_else(err)?.trim();
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty()
            || frac.len() > 4
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let whole: u64 = whole.parse().map_err(|_| err())?;
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<4}", frac).parse().map_err(|_| err())?
        };
        let pips = whole
            .checked_mul(10_000)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(err)?;
        if pips > Self::MAX as u64 {
            return Err(err());
        }
        Ok(Self(pips as u32))
    }
}

/// 홉별 프로토콜 파라미터 (견적 시 선택된 값이 실행까지 그대로 전달됨)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HopParams {
    ConstantProduct {
        pair: Address,
    },
    FeeTier {
        fee: FeeTier,
    },
    DynamicFee {
        /// 견적 시점에 관측된 수수료 (표시용)
        observed_fee: Option<FeeTier>,
    },
    StableSwap {
        pool: Address,
        i: u8,
        j: u8,
    },
    Singleton {
        fee: FeeTier,
        tick_spacing: i32,
        hooks: Address,
    },
}

/// 실행 경로의 한 구간
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHop {
    pub dex_id: String,
    pub dex_name: String,
    pub kind: DexKind,
    /// 사람이 읽는 설명 ("Fee: 0.05%")
    pub detail: String,
    pub pool_or_quoter: Address,
    /// 이 홉이 지나는 토큰 주소 (정규화됨)
    pub path: Vec<Address>,
    pub params: HopParams,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
}

impl RouteHop {
    pub fn token_in(&self) -> Option<Address> {
        self.path.first().copied()
    }

    pub fn token_out(&self) -> Option<Address> {
        self.path.last().copied()
    }
}

/// 견적 후보 경로
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCandidate {
    pub chain_id: ChainId,
    pub dex_id: String,
    pub dex_name: String,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub hops: Vec<RouteHop>,
}

impl RouteCandidate {
    pub fn token_in(&self) -> Option<Address> {
        self.hops.first().and_then(RouteHop::token_in)
    }

    pub fn token_out(&self) -> Option<Address> {
        self.hops.last().and_then(RouteHop::token_out)
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    pub fn is_multi_hop(&self) -> bool {
        self.hops.len() > 1
    }

    /// 각 홉의 출력 토큰이 다음 홉의 입력 토큰과 같은지 확인
    pub fn has_path_continuity(&self) -> bool {
        if self.hops.is_empty() || self.hops.iter().any(|h| h.path.len() < 2) {
            return false;
        }
        self.hops
            .windows(2)
            .all(|pair| pair[0].token_out() == pair[1].token_in())
    }
}

/// 실행 시점 입력
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub chain_id: ChainId,
    /// 논리적 입력 토큰 (네이티브 예약 주소 가능)
    pub token_in: Address,
    /// 논리적 출력 토큰 (네이티브 예약 주소 가능)
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    pub deadline: u64,
    pub hops: Vec<RouteHop>,
    /// 트랜잭션 서명자 (알 수 있는 경우)
    pub sender: Option<Address>,
}

/// 서명 대상 트랜잭션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    #[serde(with = "u256_dec")]
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 스왑 전 필요한 토큰 승인
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    /// ERC-20 approve(spender, amount)
    Erc20 { token: Address, spender: Address, amount: U256 },
    /// ERC-20 approve(permit2) 후 Permit2.approve(token, spender)
    Permit2 { token: Address, permit2: Address, spender: Address, amount: U256 },
}

/// 플러그인이 생성한 실행 데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCalldata {
    /// 승인보다 먼저 실행할 트랜잭션 (예: 네이티브 래핑)
    pub pre_transactions: Vec<TxRequest>,
    pub approvals: Vec<Approval>,
    pub swap: TxRequest,
}

impl SwapCalldata {
    pub fn swap_only(swap: TxRequest) -> Self {
        Self {
            pre_transactions: Vec::new(),
            approvals: Vec::new(),
            swap,
        }
    }
}

/// 외부 서명자에게 전달되는 실행 계획
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    /// 스왑 전에 순서대로 실행해야 하는 트랜잭션
    pub approvals: Vec<TxRequest>,
    pub swap: TxRequest,
    #[serde(with = "u256_dec")]
    pub min_amount_out: U256,
    pub deadline: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmountUnits {
    #[default]
    Raw,
    Human,
}

/// 견적 요청 (외부 API 계층에서 전달)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub chain_id: ChainId,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: String,
    #[serde(default)]
    pub amount_units: Option<AmountUnits>,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
    #[serde(default)]
    pub user_address: Option<Address>,
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default)]
    pub deadline: Option<u64>,
}

/// 응답용 경로 표현
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    pub dex_id: String,
    pub dex_name: String,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    #[serde(with = "u256_dec")]
    pub min_amount_out: U256,
    pub hops: Vec<RouteHop>,
    pub price_impact_bps: Option<u32>,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    NoRoute,
    ExecutionBuildFailed,
    Configuration,
}

/// 견적 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteResponse {
    pub quote_id: String,
    pub chain_id: ChainId,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub best_route: Option<RouteView>,
    pub alternatives: Vec<RouteView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PANCAKE_V3_FEE_TIERS, UNISWAP_V3_FEE_TIERS, UNISWAP_V4_POOL_CONFIGS};

    fn hop(path: Vec<Address>) -> RouteHop {
        RouteHop {
            dex_id: "test".to_string(),
            dex_name: "Test".to_string(),
            kind: DexKind::ConcentratedLiquidity,
            detail: FeeTier(500).detail(),
            pool_or_quoter: Address::ZERO,
            path,
            params: HopParams::FeeTier { fee: FeeTier(500) },
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
        }
    }

    #[test]
    fn test_fee_tier_display() {
        assert_eq!(FeeTier(100).to_string(), "0.01%");
        assert_eq!(FeeTier(500).to_string(), "0.05%");
        assert_eq!(FeeTier(2_500).to_string(), "0.25%");
        assert_eq!(FeeTier(3_000).to_string(), "0.30%");
        assert_eq!(FeeTier(10_000).to_string(), "1.00%");
        assert_eq!(FeeTier(50).to_string(), "0.005%");
        assert_eq!(FeeTier(3_000).detail(), "Fee: 0.30%");
    }

    #[test]
    fn test_fee_tier_detail_round_trip() {
        let mut tiers: Vec<u32> = UNISWAP_V3_FEE_TIERS.to_vec();
        tiers.extend(PANCAKE_V3_FEE_TIERS);
        tiers.extend(UNISWAP_V4_POOL_CONFIGS.iter().map(|(fee, _)| *fee));
        tiers.extend([1, 50, 1_234, 9_999, 65_000, 1_000_000]);

        for pips in tiers {
            let tier = FeeTier(pips);
            assert_eq!(FeeTier::from_detail(&tier.detail()).unwrap(), tier, "tier {}", pips);
        }
        assert_eq!(FeeTier::from_detail("Fee: 0.30%").unwrap().pips(), 3_000);
        assert_eq!(
            FeeTier::from_detail("Fee: 0.30%, tickSpacing: 60").unwrap().pips(),
            3_000
        );
    }

    #[test]
    fn test_fee_tier_parse_rejects_garbage() {
        assert!("0.3".parse::<FeeTier>().is_err());
        assert!("abc%".parse::<FeeTier>().is_err());
        assert!("0.00001%".parse::<FeeTier>().is_err());
        assert!("101%".parse::<FeeTier>().is_err());
        assert!(FeeTier::from_detail("Pool: 3pool").is_err());
    }

    #[test]
    fn test_fee_tier_from_ratio() {
        assert_eq!(FeeTier::from_ratio(997, 1_000), FeeTier(3_000));
        assert_eq!(FeeTier::from_ratio(9_975, 10_000), FeeTier(2_500));
    }

    #[test]
    fn test_path_continuity() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);
        let c = Address::repeat_byte(0x03);

        let mut route = RouteCandidate {
            chain_id: 1,
            dex_id: "test".to_string(),
            dex_name: "Test".to_string(),
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
            hops: vec![hop(vec![a, b]), hop(vec![b, c])],
        };
        assert!(route.has_path_continuity());
        assert_eq!(route.token_in(), Some(a));
        assert_eq!(route.token_out(), Some(c));
        assert!(route.is_multi_hop());

        route.hops[1].path = vec![a, c];
        assert!(!route.has_path_continuity());
    }

    #[test]
    fn test_hop_params_serde_shape() {
        let params = HopParams::Singleton {
            fee: FeeTier(3_000),
            tick_spacing: 60,
            hooks: Address::ZERO,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["type"], "singleton");
        assert_eq!(json["fee"], 3_000);
        assert_eq!(json["tickSpacing"], 60);

        let back: HopParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
