//! The client object every operation hangs off.

use crate::config::ClientConfig;
use crate::contracts::IERC20;
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::registry::TokenRegistry;
use crate::types::{Address, Receipt, TxHash};
use alloy::sol_types::SolCall;

/// DEX client: a ledger connection plus the operator's local state.
///
/// Config and registry are owned here rather than kept in globals, so route
/// resolution and the allowance guard can run against any [`Ledger`].
#[derive(Debug)]
pub struct DexClient<L> {
    pub(crate) ledger: L,
    pub(crate) config: ClientConfig,
    pub(crate) registry: TokenRegistry,
}

impl<L: Ledger> DexClient<L> {
    /// Create a client over `ledger`, with the registry at the configured path.
    pub fn new(ledger: L, config: ClientConfig) -> Self {
        let registry = TokenRegistry::open(config.tokens_path.clone());
        Self::with_registry(ledger, config, registry)
    }

    /// Create a client with an explicit registry.
    pub fn with_registry(ledger: L, config: ClientConfig, registry: TokenRegistry) -> Self {
        Self {
            ledger,
            config,
            registry,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Update the configuration.
    pub fn set_config(&mut self, config: ClientConfig) {
        self.config = config;
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TokenRegistry {
        &mut self.registry
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Address of the signing account.
    pub fn account(&self) -> Address {
        self.ledger.account()
    }

    /// Wait for a submitted transaction to be mined.
    pub async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, DexError> {
        self.ledger.wait_for_receipt(tx).await
    }

    /// Wait for a transaction and fail if it reverted.
    pub async fn confirm(&self, tx: TxHash) -> Result<Receipt, DexError> {
        let receipt = self.ledger.wait_for_receipt(tx).await?;
        if !receipt.success {
            return Err(DexError::Reverted(tx));
        }
        Ok(receipt)
    }

    /// Read-only contract call with typed arguments and return value.
    pub(crate) async fn read<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, DexError> {
        let output = self.ledger.call(to, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(&output)?)
    }

    /// Submit a state-changing contract call.
    pub(crate) async fn submit<C: SolCall>(&self, to: Address, call: C) -> Result<TxHash, DexError> {
        self.ledger.send(to, call.abi_encode().into()).await
    }

    /// Decimals of a token, read fresh from chain.
    pub async fn decimals(&self, token: Address) -> Result<u8, DexError> {
        self.read(token, IERC20::decimalsCall {}).await
    }
}
