//! The read/write capability the client drives contracts through.
//!
//! Implementations only move bytes: calldata in, return data or a
//! transaction hash out. ABI encoding stays on the client side, so the same
//! orchestration runs against a JSON-RPC node or an in-process mock.

use crate::error::DexError;
use crate::types::{Address, Bytes, Receipt, TxHash};
use async_trait::async_trait;

/// A signing account connected to a ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address of the signing account. Every submitted transaction is sent from it.
    fn account(&self) -> Address;

    /// Execute a read-only call against `to` and return the raw return data.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, DexError>;

    /// Sign and submit a state-changing call. Returns once the node accepted
    /// the transaction, not once it is mined.
    async fn send(&self, to: Address, input: Bytes) -> Result<TxHash, DexError>;

    /// Sign and submit a contract-creation transaction.
    async fn deploy(&self, code: Bytes) -> Result<TxHash, DexError>;

    /// Wait until the transaction is mined and return its receipt.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, DexError>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for std::sync::Arc<L> {
    fn account(&self) -> Address {
        (**self).account()
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, DexError> {
        (**self).call(to, input).await
    }

    async fn send(&self, to: Address, input: Bytes) -> Result<TxHash, DexError> {
        (**self).send(to, input).await
    }

    async fn deploy(&self, code: Bytes) -> Result<TxHash, DexError> {
        (**self).deploy(code).await
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, DexError> {
        (**self).wait_for_receipt(tx).await
    }
}
