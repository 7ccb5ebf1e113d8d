//! Contract bindings for the exchange's published call interfaces.

use alloy::sol;

sol! {
    /// Minimal ERC-20 surface used for metadata, balances and approvals.
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Pair factory. `getPair` returns the zero address for unknown pairs.
    interface IFactory {
        function getPair(address tokenA, address tokenB) external view returns (address);
    }

    interface IRouter {
        function factory() external view returns (address);
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[]);
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to
        ) external returns (uint256[]);
    }

    /// Limit order book. Status codes: 0 open, 1 filled, 2 cancelled.
    interface ILimitOrder {
        event OrderCreated(
            uint256 indexed orderId,
            address indexed maker,
            address tokenIn,
            address tokenOut,
            uint256 amountIn,
            uint256 minOut,
            uint256 expireAt
        );

        function createOrder(
            address tokenIn,
            address tokenOut,
            uint256 amountIn,
            uint256 minOut,
            uint256 expireAt
        ) external returns (uint256);
        function orders(uint256 orderId) external view returns (
            uint256 id,
            address maker,
            address tokenIn,
            address tokenOut,
            uint256 amountIn,
            uint256 minOut,
            uint256 expireAt,
            uint8 status
        );
        function fillOrder(uint256 orderId) external;
        function cancelOrder(uint256 orderId) external;
        function nextOrderId() external view returns (uint256);
        function isFillable(uint256 orderId) external view returns (bool ok, uint256 amountOut);
    }

    /// Deployable fungible token. The whole supply is minted to `to`.
    contract TokenTemplate {
        constructor(string name, string symbol, uint256 supply, address to);
    }

    contract RouterDeployment {
        constructor(address factory);
    }

    contract LimitOrderDeployment {
        constructor(address router);
    }
}

pub mod selectors {
    use super::{IERC20, ILimitOrder, IRouter};
    use alloy::sol_types::SolCall;

    pub const APPROVE: [u8; 4] = IERC20::approveCall::SELECTOR;
    pub const ADD_LIQUIDITY: [u8; 4] = IRouter::addLiquidityCall::SELECTOR;
    pub const SWAP_EXACT_TOKENS: [u8; 4] = IRouter::swapExactTokensForTokensCall::SELECTOR;
    pub const CREATE_ORDER: [u8; 4] = ILimitOrder::createOrderCall::SELECTOR;
    pub const FILL_ORDER: [u8; 4] = ILimitOrder::fillOrderCall::SELECTOR;
    pub const CANCEL_ORDER: [u8; 4] = ILimitOrder::cancelOrderCall::SELECTOR;
}
