//! 온체인 컨트랙트 인터페이스
//!
//! 견적 조회와 실행 calldata 생성에 쓰이는 ABI 정의만 모아둔다.
//! RPC 바인딩은 두지 않고 `SolCall::abi_encode` / `abi_decode_returns` 로 직접 다룬다.

use alloy::sol;

sol! {
    /// Multicall3 aggregate3
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }

    interface IERC20 {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IWETH9 {
        function deposit() external payable;
        function withdraw(uint256 amount) external;
    }
}

sol! {
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }
}

sol! {
    /// Uniswap V3 QuoterV2 (PancakeSwap V3 동일)
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }

    /// 원조 SwapRouter (params 에 deadline 포함)
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
    }

    /// SwapRouter02 / PancakeSwap SmartRouter (deadline 은 multicall 로 전달)
    interface ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function multicall(uint256 deadline, bytes[] calldata data) external payable returns (bytes[] memory results);
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
    }
}

sol! {
    /// Algebra 견적기 (수수료는 풀이 동적으로 결정)
    interface IAlgebraQuoter {
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint256 amountIn, uint160 limitSqrtPrice)
            external
            returns (uint256 amountOut, uint16 fee);
    }

    interface IAlgebraRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 limitSqrtPrice;
        }

        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        function unwrapWNativeToken(uint256 amountMinimum, address recipient) external payable;
    }
}

sol! {
    /// Curve 구형 풀 (receiver 인자 없음)
    interface ICurvePool {
        function coins(uint256 i) external view returns (address);
        function get_dy(int128 i, int128 j, uint256 dx) external view returns (uint256);
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy) external;
    }

    /// Curve NG 풀 (receiver 지정 가능)
    interface ICurvePoolNg {
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy, address receiver) external returns (uint256);
    }
}

sol! {
    /// Uniswap Permit2 AllowanceTransfer
    interface IPermit2 {
        function approve(address token, address spender, uint160 amount, uint48 expiration) external;
        function allowance(address user, address token, address spender)
            external
            view
            returns (uint160 amount, uint48 expiration, uint48 nonce);
    }

    interface IUniversalRouter {
        function execute(bytes calldata commands, bytes[] calldata inputs, uint256 deadline) external payable;
    }
}

/// Uniswap V4 타입 (V4Router / V4Quoter)
pub mod v4 {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct PoolKey {
            address currency0;
            address currency1;
            uint24 fee;
            int24 tickSpacing;
            address hooks;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct PathKey {
            address intermediateCurrency;
            uint24 fee;
            int24 tickSpacing;
            address hooks;
            bytes hookData;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct QuoteExactSingleParams {
            PoolKey poolKey;
            bool zeroForOne;
            uint128 exactAmount;
            bytes hookData;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct ExactInputSingleParams {
            PoolKey poolKey;
            bool zeroForOne;
            uint128 amountIn;
            uint128 amountOutMinimum;
            bytes hookData;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct ExactInputParams {
            address currencyIn;
            PathKey[] path;
            uint128 amountIn;
            uint128 amountOutMinimum;
        }

        interface IV4Quoter {
            function quoteExactInputSingle(QuoteExactSingleParams memory params)
                external
                returns (uint256 amountOut, uint256 gasEstimate);
        }
    }

    /// Universal Router 명령
    pub mod commands {
        pub const V4_SWAP: u8 = 0x10;
        pub const WRAP_ETH: u8 = 0x0b;
        pub const UNWRAP_WETH: u8 = 0x0c;
    }

    /// V4Router 액션
    pub mod actions {
        pub const SWAP_EXACT_IN_SINGLE: u8 = 0x06;
        pub const SWAP_EXACT_IN: u8 = 0x07;
        pub const SETTLE: u8 = 0x0b;
        pub const SETTLE_ALL: u8 = 0x0c;
        pub const TAKE: u8 = 0x0e;
    }

    /// 라우터 자신을 가리키는 예약 주소 (ActionConstants.ADDRESS_THIS)
    pub const ADDRESS_THIS: alloy::primitives::Address = alloy::primitives::address!("0000000000000000000000000000000000000002");
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_known_selectors() {
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IMulticall3::aggregate3Call::SELECTOR, [0x82, 0xad, 0x56, 0xcb]);
        assert_eq!(IUniswapV2Router02::swapExactTokensForTokensCall::SELECTOR, [0x38, 0xed, 0x17, 0x39]);
        assert_eq!(ISwapRouter::exactInputSingleCall::SELECTOR, [0x41, 0x4b, 0xf3, 0x89]);
        assert_eq!(ISwapRouter02::exactInputSingleCall::SELECTOR, [0x04, 0xe4, 0x5a, 0xaf]);
        assert_eq!(ICurvePool::get_dyCall::SELECTOR, [0x5e, 0x0d, 0x44, 0x3f]);
    }

    #[test]
    fn test_erc20_approve_encoding() {
        let spender = Address::repeat_byte(0x11);
        let data = IERC20::approveCall { spender, amount: U256::from(5u64) }.abi_encode();
        assert_eq!(data.len(), 4 + 32 * 2);
        assert_eq!(&data[16..36], spender.as_slice());
    }
}
