use alloy::primitives::U256;

use crate::constants::BPS_DENOMINATOR;

/// x*y=k 출력량 계산 (V2 스타일 수수료 비율 적용)
///
/// amountOut = floor(amountIn * feeNum * reserveOut / (reserveIn * feeDen + amountIn * feeNum))
///
/// 입력이 0 이거나 곱셈이 U256 범위를 넘으면 `None`.
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_numerator: u32,
    fee_denominator: u32,
) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() || fee_denominator == 0 {
        return None;
    }

    let amount_in_with_fee = amount_in.checked_mul(U256::from(fee_numerator))?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in
        .checked_mul(U256::from(fee_denominator))?
        .checked_add(amount_in_with_fee)?;

    numerator.checked_div(denominator)
}

/// 슬리피지 허용치를 적용한 최소 수령량 (내림)
pub fn min_amount_out(amount_out: U256, slippage_bps: u32) -> U256 {
    let bps = slippage_bps.min(BPS_DENOMINATOR);
    let keep = U256::from(BPS_DENOMINATOR - bps);
    match amount_out.checked_mul(keep) {
        Some(scaled) => scaled / U256::from(BPS_DENOMINATOR),
        // 오버플로우 시 먼저 나눈다
        None => amount_out / U256::from(BPS_DENOMINATOR) * keep,
    }
}

/// 소액 표본 견적 대비 실제 견적의 가격 영향 (bps)
///
/// 표본 비율로 환산한 기대 출력량보다 실제 출력량이 적은 만큼을 bps 로 표현한다.
pub fn price_impact_bps(
    sample_in: U256,
    sample_out: U256,
    amount_in: U256,
    amount_out: U256,
) -> Option<u32> {
    if sample_in.is_zero() || sample_out.is_zero() || amount_in.is_zero() {
        return None;
    }

    let ideal_out = sample_out.checked_mul(amount_in)? / sample_in;
    if ideal_out.is_zero() || amount_out >= ideal_out {
        return Some(0);
    }

    let shortfall = ideal_out - amount_out;
    let bps = shortfall.checked_mul(U256::from(BPS_DENOMINATOR))? / ideal_out;
    Some(bps.saturating_to::<u32>().min(BPS_DENOMINATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_amount_out_pancake_fee() {
        let out = get_amount_out(
            U256::from(1_000u64),
            U256::from(1_000_000u64),
            U256::from(2_000_000u64),
            9_975,
            10_000,
        )
        .unwrap();
        assert_eq!(out, U256::from(1_993u64));
    }

    #[test]
    fn test_get_amount_out_uniswap_fee() {
        let reserve = U256::from(10u64).pow(U256::from(24u64));
        let amount_in = U256::from(10u64).pow(U256::from(18u64));
        let out = get_amount_out(amount_in, reserve, reserve, 997, 1_000).unwrap();
        // 0.3% 수수료 + 미세한 가격 영향
        assert!(out < amount_in * U256::from(997u64) / U256::from(1_000u64));
        assert!(out > amount_in * U256::from(996u64) / U256::from(1_000u64));
    }

    #[test]
    fn test_get_amount_out_degenerate() {
        assert!(get_amount_out(U256::ZERO, U256::from(1u64), U256::from(1u64), 997, 1_000).is_none());
        assert!(get_amount_out(U256::from(1u64), U256::ZERO, U256::from(1u64), 997, 1_000).is_none());
        assert!(get_amount_out(U256::MAX, U256::from(1u64), U256::MAX, 997, 1_000).is_none());
    }

    #[test]
    fn test_min_amount_out() {
        assert_eq!(min_amount_out(U256::from(1_000_000u64), 50), U256::from(995_000u64));
        assert_eq!(min_amount_out(U256::from(999u64), 50), U256::from(994u64));
        assert_eq!(min_amount_out(U256::from(1_000u64), 0), U256::from(1_000u64));
        assert_eq!(min_amount_out(U256::from(1_000u64), 20_000), U256::ZERO);
        assert!(min_amount_out(U256::MAX, 50) < U256::MAX);
    }

    #[test]
    fn test_price_impact() {
        // 표본: 1 -> 2, 실제: 100 -> 190 (기대 200, 5% 손실)
        let impact = price_impact_bps(
            U256::from(1u64),
            U256::from(2u64),
            U256::from(100u64),
            U256::from(190u64),
        );
        assert_eq!(impact, Some(500));

        let none = price_impact_bps(U256::ZERO, U256::from(2u64), U256::from(1u64), U256::from(1u64));
        assert_eq!(none, None);

        let better = price_impact_bps(
            U256::from(10u64),
            U256::from(10u64),
            U256::from(100u64),
            U256::from(101u64),
        );
        assert_eq!(better, Some(0));
    }
}
