//! Limit order types as reported by the order book contract.

use crate::contracts::ILimitOrder;
use crate::error::DexError;
use crate::types::{Address, Amount, TokenId, TxHash, U256};
use std::fmt;

/// Identifier assigned to an order by the order book contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub U256);

impl OrderId {
    pub fn new(id: u64) -> Self {
        Self(U256::from(id))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<U256> for OrderId {
    fn from(id: U256) -> Self {
        Self(id)
    }
}

/// Status of an order.
///
/// `Open` moves to `Filled` or `Cancelled` only through a mined
/// `fillOrder`/`cancelOrder` transaction; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Order is open and can be filled or cancelled.
    Open,
    /// Order has been filled.
    Filled,
    /// Order has been cancelled by its maker.
    Cancelled,
}

impl OrderStatus {
    /// Decode the contract's status code.
    pub fn from_code(code: u8) -> Result<Self, DexError> {
        match code {
            0 => Ok(Self::Open),
            1 => Ok(Self::Filled),
            2 => Ok(Self::Cancelled),
            other => Err(DexError::UnknownOrderStatus(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Filled => 1,
            Self::Cancelled => 2,
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "OPEN",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
        })
    }
}

/// An order in the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Address of the trader who placed the order.
    pub maker: Address,
    /// Token the maker sells.
    pub token_in: TokenId,
    /// Token the maker wants.
    pub token_out: TokenId,
    /// Raw amount of `token_in` escrowed.
    pub amount_in: Amount,
    /// Minimum raw amount of `token_out` the maker accepts.
    pub min_out: Amount,
    /// Expiry as a unix timestamp in seconds; zero never expires.
    pub expire_at: u64,
    /// Current status of the order.
    pub status: OrderStatus,
}

impl Order {
    /// Check if the order is still active (can be filled or cancelled).
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether the order has expired at unix time `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expire_at != 0 && now >= self.expire_at
    }
}

impl TryFrom<ILimitOrder::ordersReturn> for Order {
    type Error = DexError;

    fn try_from(raw: ILimitOrder::ordersReturn) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId(raw.id),
            maker: raw.maker,
            token_in: raw.tokenIn,
            token_out: raw.tokenOut,
            amount_in: raw.amountIn,
            min_out: raw.minOut,
            expire_at: raw.expireAt.saturating_to(),
            status: OrderStatus::from_code(raw.status)?,
        })
    }
}

/// Whether an order can be filled right now, as the contract sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fillability {
    pub fillable: bool,
    /// Output the fill would currently produce.
    pub amount_out: Amount,
}

/// A created order whose id has been discovered from its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub tx: TxHash,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_order(status: u8) -> ILimitOrder::ordersReturn {
        ILimitOrder::ordersReturn {
            id: U256::from(7u64),
            maker: Address::repeat_byte(0xaa),
            tokenIn: Address::repeat_byte(0x01),
            tokenOut: Address::repeat_byte(0x02),
            amountIn: U256::from(100u64),
            minOut: U256::from(120u64),
            expireAt: U256::ZERO,
            status,
        }
    }

    #[test]
    fn test_order_from_contract_tuple() {
        let order = Order::try_from(raw_order(0)).unwrap();
        assert_eq!(order.id, OrderId::new(7));
        assert_eq!(order.status, OrderStatus::Open);
        assert!(order.is_active());
        assert!(!order.is_expired(u64::MAX));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Open.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());

        let filled = Order::try_from(raw_order(1)).unwrap();
        assert!(!filled.is_active());
    }

    #[test]
    fn test_status_codes() {
        for status in [OrderStatus::Open, OrderStatus::Filled, OrderStatus::Cancelled] {
            assert_eq!(OrderStatus::from_code(status.code()).unwrap(), status);
        }
        assert!(matches!(
            Order::try_from(raw_order(9)),
            Err(DexError::UnknownOrderStatus(9))
        ));
    }

    #[test]
    fn test_expiry() {
        let mut order = Order::try_from(raw_order(0)).unwrap();
        order.expire_at = 1_000;
        assert!(!order.is_expired(999));
        assert!(order.is_expired(1_000));
    }
}
