//! 표시용 경로 지표 (순위 결정에는 쓰이지 않음)

use alloy::primitives::U256;
use tracing::debug;

use super::aggregator::RouteAggregator;
use crate::blockchain::rpc::ChainClient;
use crate::constants::BPS_DENOMINATOR;
use crate::types::{ChainConfig, RouteCandidate};
use crate::utils::math::price_impact_bps;

/// 같은 플러그인/경로에 소액 표본 견적을 내서 가격 영향 추정
///
/// 표본 견적이 실패하면 `None`.
pub async fn sample_price_impact(
    aggregator: &RouteAggregator,
    client: &dyn ChainClient,
    chain: &ChainConfig,
    route: &RouteCandidate,
    sample_divisor: u64,
) -> Option<u32> {
    let plugin = aggregator.registry().get(&route.dex_id)?;
    let sample_in = route.amount_in / U256::from(sample_divisor.max(2));
    if sample_in.is_zero() {
        return None;
    }

    let mut path = Vec::with_capacity(route.hops.len() + 1);
    for hop in &route.hops {
        if path.is_empty() {
            path.push(hop.token_in()?);
        }
        path.push(hop.token_out()?);
    }

    let sample = aggregator
        .quote_path(plugin.as_ref(), client, chain, &path, sample_in)
        .await?;
    let impact = price_impact_bps(sample_in, sample.amount_out, route.amount_in, route.amount_out);
    debug!("📐 {} sample {} -> {}, impact {:?}bps", route.dex_id, sample_in, sample.amount_out, impact);
    impact
}

/// 0..1 신뢰도
///
/// 프로토콜 신뢰도에서 시작해 홉 수, 가격 영향, 차선 경로와의 괴리만큼 감점한다.
pub fn confidence_score(
    route: &RouteCandidate,
    alternatives: &[RouteCandidate],
    price_impact_bps: Option<u32>,
) -> f64 {
    let mut score = route
        .hops
        .iter()
        .map(|h| h.kind.reliability_score())
        .fold(1.0_f64, f64::min);

    score -= 0.05 * route.hop_count().saturating_sub(1) as f64;

    match price_impact_bps {
        Some(bps) if bps > 1_000 => score -= 0.3,
        Some(bps) if bps > 300 => score -= 0.15,
        Some(bps) if bps > 100 => score -= 0.05,
        Some(_) => {}
        None => score -= 0.05,
    }

    // 차선보다 지나치게 좋은 견적은 오래된 상태나 조작된 풀일 수 있다
    if let Some(second) = alternatives.first() {
        if let Some(gap) = gap_bps(route.amount_out, second.amount_out) {
            if gap > 1_000 {
                score -= 0.2;
            } else if gap > 300 {
                score -= 0.1;
            }
        }
    } else {
        score -= 0.05;
    }

    (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

fn gap_bps(best: U256, second: U256) -> Option<u32> {
    if best.is_zero() || second >= best {
        return Some(0);
    }
    let gap = (best - second).checked_mul(U256::from(BPS_DENOMINATOR))? / best;
    Some(gap.saturating_to::<u32>())
}
