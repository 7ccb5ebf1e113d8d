//! Limit order lifecycle against the order book contract.
//!
//! Status changes happen only on chain. This layer never checks fill or
//! cancel preconditions locally; whatever the contract reports is returned.

use crate::client::DexClient;
use crate::contracts::ILimitOrder;
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::order::{Fillability, Order, OrderId, PlacedOrder};
use crate::types::{Address, Receipt, TokenId, TxHash, U256};
use crate::units::to_raw;
use alloy::sol_types::SolEvent;
use futures_util::future::try_join;
use tracing::{debug, info};

impl<L: Ledger> DexClient<L> {
    /// Submit a new limit order selling `amount_human` of `token_in` for at
    /// least `min_out_human` of `token_out`. `expire_at` is a unix timestamp
    /// in seconds, zero for no expiry.
    ///
    /// Returns the transaction hash; use [`Self::confirm_order`] to learn the
    /// assigned id.
    pub async fn create_order(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        amount_human: &str,
        min_out_human: &str,
        expire_at: u64,
    ) -> Result<TxHash, DexError> {
        let book = self.config.limit_order_address()?;

        let (decimals_in, decimals_out) =
            try_join(self.decimals(token_in), self.decimals(token_out)).await?;
        let amount_in = to_raw(amount_human, decimals_in)?;
        let min_out = to_raw(min_out_human, decimals_out)?;

        self.ensure_allowance(token_in, book, amount_in).await?;

        let tx = self
            .submit(
                book,
                ILimitOrder::createOrderCall {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    amountIn: amount_in,
                    minOut: min_out,
                    expireAt: U256::from(expire_at),
                },
            )
            .await?;
        info!(%token_in, %token_out, %amount_in, %min_out, expire_at, %tx, "Order submitted");
        Ok(tx)
    }

    /// Wait for a `createOrder` transaction and discover the order id.
    ///
    /// The id comes from the `OrderCreated` event in the receipt. If the
    /// book emitted none, the id counter is read instead; it reports the
    /// most recently assigned id.
    pub async fn confirm_order(&self, tx: TxHash) -> Result<OrderId, DexError> {
        let book = self.config.limit_order_address()?;
        let receipt = self.confirm(tx).await?;

        if let Some(id) = order_id_from_receipt(&receipt, book) {
            debug!(%tx, %id, "Order id decoded from receipt");
            return Ok(id);
        }

        let id = self.next_order_id().await?;
        debug!(%tx, %id, "Order id read from counter");
        Ok(id)
    }

    /// Create an order and wait until its id is known.
    pub async fn place_order(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        amount_human: &str,
        min_out_human: &str,
        expire_at: u64,
    ) -> Result<PlacedOrder, DexError> {
        let tx = self
            .create_order(token_in, token_out, amount_human, min_out_human, expire_at)
            .await?;
        let id = self.confirm_order(tx).await?;
        Ok(PlacedOrder { id, tx })
    }

    /// Read an order's full state.
    pub async fn read_order(&self, id: OrderId) -> Result<Order, DexError> {
        let book = self.config.limit_order_address()?;
        let raw = self
            .read(book, ILimitOrder::ordersCall { orderId: id.0 })
            .await?;
        Order::try_from(raw)
    }

    /// Submit a fill for an order.
    pub async fn fill_order(&self, id: OrderId) -> Result<TxHash, DexError> {
        let book = self.config.limit_order_address()?;
        let tx = self
            .submit(book, ILimitOrder::fillOrderCall { orderId: id.0 })
            .await?;
        info!(%id, %tx, "Fill submitted");
        Ok(tx)
    }

    /// Submit a cancellation for an order.
    pub async fn cancel_order(&self, id: OrderId) -> Result<TxHash, DexError> {
        let book = self.config.limit_order_address()?;
        let tx = self
            .submit(book, ILimitOrder::cancelOrderCall { orderId: id.0 })
            .await?;
        info!(%id, %tx, "Cancel submitted");
        Ok(tx)
    }

    /// Ask the book whether an order can be filled now.
    pub async fn is_fillable(&self, id: OrderId) -> Result<Fillability, DexError> {
        let book = self.config.limit_order_address()?;
        let ret = self
            .read(book, ILimitOrder::isFillableCall { orderId: id.0 })
            .await?;
        Ok(Fillability {
            fillable: ret.ok,
            amount_out: ret.amountOut,
        })
    }

    /// The book's order id counter (the most recently assigned id).
    pub async fn next_order_id(&self) -> Result<OrderId, DexError> {
        let book = self.config.limit_order_address()?;
        let id = self.read(book, ILimitOrder::nextOrderIdCall {}).await?;
        Ok(OrderId(id))
    }
}

fn order_id_from_receipt(receipt: &Receipt, book: Address) -> Option<OrderId> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == book)
        .find_map(|log| ILimitOrder::OrderCreated::decode_log(log).ok())
        .map(|event| OrderId(event.data.orderId))
}
