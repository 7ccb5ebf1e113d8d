//! Client library for an on-chain token exchange: constant-product pairs
//! behind a router, plus a limit order book.
//!
//! This library provides:
//! - Decimal-aware conversion between human and raw token amounts
//! - A local token registry used as the set of routing intermediates
//! - Multi-hop route resolution and swap quotes
//! - Swaps and liquidity provision with an exact-amount allowance guard
//! - Limit order creation, inspection, filling and cancellation
//! - Token and core contract deployment
//!
//! All chain access goes through the [`Ledger`] trait; [`RpcLedger`] is the
//! JSON-RPC implementation.

pub mod allowance;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod limit;
pub mod order;
pub mod quote;
pub mod registry;
pub mod route;
pub mod rpc;
pub mod types;
pub mod units;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::DexClient;
pub use config::ClientConfig;
pub use error::DexError;
pub use exchange::{
    CoreBytecode, CoreContracts, DeployedToken, RegistryBalance, TokenBalance, TokenMeta,
    TokenParams,
};
pub use ledger::Ledger;
pub use order::{Fillability, Order, OrderId, OrderStatus, PlacedOrder};
pub use quote::Quote;
pub use registry::TokenRegistry;
pub use route::Route;
pub use rpc::RpcLedger;
pub use types::{
    non_zero, validate_address, Address, Amount, Bytes, Receipt, TokenDescriptor, TokenId, TxHash,
    U256,
};
pub use units::{parse_decimals, to_human, to_raw};
