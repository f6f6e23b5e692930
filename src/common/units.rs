use alloy::primitives::utils::parse_units;
use alloy::primitives::U256;
use thiserror::Error;

use crate::types::AmountUnits;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must be greater than zero")]
    Zero,
    #[error("invalid amount '{0}'")]
    Invalid(String),
}

/// 요청 금액 문자열을 최소 단위 정수로 변환
///
/// `units` 가 `Human` 이거나 소수점이 포함된 경우 토큰 decimals 로 스케일링하고,
/// 그 외에는 이미 최소 단위(raw)인 정수로 해석한다.
pub fn parse_amount(input: &str, units: AmountUnits, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }

    let amount = if units == AmountUnits::Human || trimmed.contains('.') {
        parse_units(trimmed, decimals)
            .map_err(|_| AmountError::Invalid(trimmed.to_string()))?
            .get_absolute()
    } else {
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(trimmed.to_string()));
        }
        trimmed
            .parse::<U256>()
            .map_err(|_| AmountError::Invalid(trimmed.to_string()))?
    };

    if amount.is_zero() {
        return Err(AmountError::Zero);
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_amount() {
        let amount = parse_amount("1000000", AmountUnits::Raw, 6).unwrap();
        assert_eq!(amount, U256::from(1_000_000u64));
    }

    #[test]
    fn test_human_amount() {
        let amount = parse_amount("1.5", AmountUnits::Raw, 18).unwrap();
        assert_eq!(amount, U256::from(1_500_000_000_000_000_000u128));

        let amount = parse_amount("2", AmountUnits::Human, 6).unwrap();
        assert_eq!(amount, U256::from(2_000_000u64));
    }

    #[test]
    fn test_invalid_amounts() {
        assert_eq!(parse_amount("", AmountUnits::Raw, 18), Err(AmountError::Empty));
        assert_eq!(parse_amount("0", AmountUnits::Raw, 18), Err(AmountError::Zero));
        assert!(parse_amount("-1", AmountUnits::Raw, 18).is_err());
        assert!(parse_amount("12abc", AmountUnits::Raw, 18).is_err());
        assert!(parse_amount("0x10", AmountUnits::Raw, 18).is_err());
    }
}
