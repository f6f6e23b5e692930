//! 공통 유틸리티 모듈
//!
//! 주소 정규화, 금액 단위 변환, 체인 디렉터리 등
//! 견적/실행 계층 전체에서 공유하는 기능을 포함합니다.

pub mod chains;
pub mod normalize;
pub mod units;

pub use chains::ChainDirectory;
pub use normalize::{is_native, normalize_address, NormalizeError};
pub use units::{parse_amount, AmountError};
