//! Error type shared by every client operation.

use crate::types::{Address, TxHash};

/// Errors that can occur during DEX client operations.
///
/// Remote failures (transport errors, contract reverts reported by the
/// node) are wrapped without modification; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    #[error("{label} invalid: {value:?} is not a 20-byte hex address")]
    InvalidAddress { label: String, value: String },

    #[error("Invalid amount {value:?}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Invalid decimals {0:?}: expected an integer between 0 and 255")]
    InvalidDecimals(String),

    #[error("No route found from {token_in} to {token_out} within {max_hops} hops")]
    NoRouteFound {
        token_in: Address,
        token_out: Address,
        max_hops: usize,
    },

    #[error("Deploy failed: receipt of {0} has no contract address")]
    DeployFailed(TxHash),

    #[error("Transaction {0} reverted")]
    Reverted(TxHash),

    #[error("Router returned no amounts for the quoted path")]
    EmptyQuote,

    #[error("{0} contract address is not configured")]
    MissingContract(&'static str),

    #[error("Unknown order status code {0}")]
    UnknownOrderStatus(u8),

    #[error("Chain id mismatch: configured {configured}, endpoint reports {actual}")]
    ChainIdMismatch { configured: u64, actual: u64 },

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Invalid RPC url {0:?}")]
    InvalidRpcUrl(String),

    #[error("Token registry error: {0}")]
    Registry(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] alloy::transports::TransportError),

    #[error(transparent)]
    PendingTransaction(#[from] alloy::providers::PendingTransactionError),

    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
}
