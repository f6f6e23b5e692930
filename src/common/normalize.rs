use alloy::primitives::Address;
use thiserror::Error;

use crate::constants::NATIVE_TOKEN;
use crate::types::ChainId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("chain {chain_id} has no wrapped native token configured")]
    MissingWrappedNative { chain_id: ChainId },
}

/// 네이티브 예약 주소인지 확인
pub fn is_native(address: Address) -> bool {
    address == NATIVE_TOKEN
}

/// 풀 조회용 주소로 변환
///
/// 네이티브 예약 주소는 체인의 wrapped native 토큰으로 바뀌고,
/// 나머지 주소는 그대로 반환된다. 결과에 다시 적용해도 값이 변하지 않는다.
pub fn normalize_address(
    chain_id: ChainId,
    wrapped_native: Option<Address>,
    address: Address,
) -> Result<Address, NormalizeError> {
    if !is_native(address) {
        return Ok(address);
    }
    wrapped_native.ok_or(NormalizeError::MissingWrappedNative { chain_id })
}
