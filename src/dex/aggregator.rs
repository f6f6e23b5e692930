use std::cmp::Reverse;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use super::AggregatorError;
use crate::adapters::{AdapterError, DexPlugin, PluginRegistry};
use crate::blockchain::rpc::ChainClient;
use crate::common::normalize::is_native;
use crate::config::AggregatorConfig;
use crate::constants::DEFAULT_QUOTE_TIMEOUT_MS;
use crate::types::{ChainConfig, RouteCandidate};

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// 플러그인 호출 하나의 제한 시간
    pub quote_timeout: Duration,
    pub enable_multi_hop: bool,
    pub multi_hop_only_when_no_direct: bool,
    pub max_intermediates: usize,
    pub max_alternatives: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_millis(DEFAULT_QUOTE_TIMEOUT_MS),
            enable_multi_hop: true,
            multi_hop_only_when_no_direct: false,
            max_intermediates: 3,
            max_alternatives: 5,
        }
    }
}

impl From<&AggregatorConfig> for AggregatorSettings {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            quote_timeout: Duration::from_millis(config.quote_timeout_ms),
            enable_multi_hop: config.enable_multi_hop,
            multi_hop_only_when_no_direct: config.multi_hop_only_when_no_direct,
            max_intermediates: config.max_intermediates,
            max_alternatives: config.max_alternatives,
        }
    }
}

/// 집계 결과 (순위 순)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationResult {
    pub best: Option<RouteCandidate>,
    pub alternatives: Vec<RouteCandidate>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }

    /// best 다음 alternatives 순서로 순회
    pub fn ranked(&self) -> impl Iterator<Item = &RouteCandidate> {
        self.best.iter().chain(self.alternatives.iter())
    }
}

/// 순위 비교용 후보 (registration = 플러그인 등록 순서, seq = 생성 순서)
struct Ranked {
    registration: usize,
    seq: usize,
    candidate: RouteCandidate,
}

/// 경로 집계기
///
/// 체인을 지원하는 모든 플러그인에 동시에 견적을 요청하고 출력량 순으로 정렬한다.
/// 한 플러그인의 실패나 지연은 해당 후보만 제외한다.
pub struct RouteAggregator {
    registry: Arc<PluginRegistry>,
    settings: AggregatorSettings,
}

impl RouteAggregator {
    pub fn new(registry: Arc<PluginRegistry>, settings: AggregatorSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub async fn aggregate(
        &self,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<AggregationResult, AggregatorError> {
        let start = Instant::now();

        if amount_in.is_zero() {
            return Err(AggregatorError::InvalidRequest("amountIn must be positive".to_string()));
        }
        // 래핑 토큰 설정이 없으면 플러그인까지 가기 전에 실패시킨다
        let normalized_in = chain
            .normalize(token_in)
            .map_err(|e| AggregatorError::Configuration(e.to_string()))?;
        let normalized_out = chain
            .normalize(token_out)
            .map_err(|e| AggregatorError::Configuration(e.to_string()))?;
        if normalized_in == normalized_out {
            return Err(AggregatorError::InvalidRequest(
                "tokenIn and tokenOut resolve to the same token".to_string(),
            ));
        }

        let plugins = self.registry.for_chain(chain.chain_id);
        if plugins.is_empty() {
            warn!("⚠️ 체인 {} 을 지원하는 DEX 플러그인이 없습니다", chain.chain_id);
            return Ok(AggregationResult::default());
        }

        let direct_futures = plugins.iter().enumerate().map(|(registration, plugin)| async move {
            let candidate = self
                .quote_hop(plugin.as_ref(), client, chain, token_in, token_out, amount_in)
                .await;
            candidate.map(|candidate| Ranked { registration, seq: 0, candidate })
        });
        let mut ranked: Vec<Ranked> = join_all(direct_futures).await.into_iter().flatten().collect();
        let direct_count = ranked.len();

        let skip_multi_hop = self.settings.multi_hop_only_when_no_direct && direct_count > 0;
        if self.settings.enable_multi_hop && !skip_multi_hop {
            let intermediates: Vec<Address> = chain
                .intermediate_tokens
                .iter()
                .copied()
                .filter(|t| *t != normalized_in && *t != normalized_out && !is_native(*t))
                .take(self.settings.max_intermediates)
                .collect();

            let mut jobs = Vec::new();
            for (registration, plugin) in plugins.iter().enumerate() {
                if !plugin.supports_multi_hop() {
                    continue;
                }
                for (index, intermediate) in intermediates.iter().enumerate() {
                    jobs.push((registration, index + 1, plugin.clone(), *intermediate));
                }
            }

            let multi_futures = jobs.into_iter().map(|(registration, seq, plugin, intermediate)| async move {
                let path = [token_in, intermediate, token_out];
                let candidate = self
                    .quote_path(plugin.as_ref(), client, chain, &path, amount_in)
                    .await;
                candidate.map(|candidate| Ranked { registration, seq, candidate })
            });
            ranked.extend(join_all(multi_futures).await.into_iter().flatten());
        }

        ranked.retain(|r| r.candidate.has_path_continuity() && !r.candidate.amount_out.is_zero());
        ranked.sort_by_key(|r| {
            (
                Reverse(r.candidate.amount_out),
                r.candidate.hop_count(),
                r.registration,
                r.seq,
            )
        });

        let total = ranked.len();
        let mut candidates = ranked.into_iter().map(|r| r.candidate);
        let best = candidates.next();
        let alternatives: Vec<RouteCandidate> = candidates.take(self.settings.max_alternatives).collect();

        match &best {
            Some(route) => info!(
                "📊 집계 완료 chain={} 후보 {}개 (직접 {}), 최적 {} {} ({}) - {:.2?}",
                chain.chain_id,
                total,
                direct_count,
                route.dex_id,
                route.amount_out,
                if route.is_multi_hop() { format!("{}홉", route.hop_count()) } else { "직접".to_string() },
                start.elapsed()
            ),
            None => info!(
                "📭 경로 없음 chain={} {} -> {} - {:.2?}",
                chain.chain_id,
                token_in,
                token_out,
                start.elapsed()
            ),
        }

        Ok(AggregationResult { best, alternatives })
    }

    /// 제한 시간을 둔 단일 홉 견적 (실패는 후보 없음으로 처리)
    pub async fn quote_hop(
        &self,
        plugin: &dyn DexPlugin,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Option<RouteCandidate> {
        let quote = plugin.quote_single_hop(client, chain, token_in, token_out, amount_in);
        match tokio::time::timeout(self.settings.quote_timeout, quote).await {
            Ok(Ok(Some(candidate))) => {
                debug!("  {} {} -> {}: {}", plugin.id(), token_in, token_out, candidate.amount_out);
                Some(candidate)
            }
            Ok(Ok(None)) => {
                debug!("  {} {} -> {}: 유동성 없음", plugin.id(), token_in, token_out);
                None
            }
            Ok(Err(e @ AdapterError::QuoteCallFailed(_))) => {
                debug!("  {} 견적 호출 실패: {}", plugin.id(), e);
                None
            }
            Ok(Err(e)) => {
                error!("❌ {} 견적 중 설정 오류: {}", plugin.id(), e);
                None
            }
            Err(_) => {
                warn!(
                    "⏱️ {} 견적 시간 초과 ({}ms)",
                    plugin.id(),
                    self.settings.quote_timeout.as_millis()
                );
                None
            }
        }
    }

    /// 한 플러그인으로 토큰 경로를 따라 홉을 연결한 견적
    ///
    /// 각 홉의 출력량이 다음 홉의 입력량이 된다.
    pub async fn quote_path(
        &self,
        plugin: &dyn DexPlugin,
        client: &dyn ChainClient,
        chain: &ChainConfig,
        path: &[Address],
        amount_in: U256,
    ) -> Option<RouteCandidate> {
        if path.len() < 2 {
            return None;
        }

        let mut hops = Vec::with_capacity(path.len() - 1);
        let mut amount = amount_in;
        for pair in path.windows(2) {
            let leg = self.quote_hop(plugin, client, chain, pair[0], pair[1], amount).await?;
            amount = leg.amount_out;
            hops.extend(leg.hops);
        }

        let candidate = RouteCandidate {
            chain_id: chain.chain_id,
            dex_id: plugin.id().to_string(),
            dex_name: plugin.name().to_string(),
            amount_in,
            amount_out: amount,
            hops,
        };
        if !candidate.has_path_continuity() || candidate.amount_out.is_zero() {
            return None;
        }
        Some(candidate)
    }
}
