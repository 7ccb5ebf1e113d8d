//! Client configuration and its TOML store.

use crate::error::DexError;
use crate::types::{non_zero, Address};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the DEX client.
///
/// Loaded once at startup; callers save it back after every edit and after
/// a first-run deployment fills in contract addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// Chain id the endpoint is expected to serve.
    pub chain_id: u64,

    /// Hex-encoded secp256k1 private key of the operator account.
    pub private_key: String,

    /// Pair factory. When unset, the router is asked for its bound factory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,

    /// Swap/liquidity router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<Address>,

    /// Limit order book.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_order: Option<Address>,

    /// Path of the token registry file.
    #[serde(default = "default_tokens_path")]
    pub tokens_path: PathBuf,

    /// Maximum number of hops allowed when routing through multiple pairs.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Wait for an approval to be mined before submitting the transaction
    /// that spends it.
    #[serde(default = "default_wait_for_approvals")]
    pub wait_for_approvals: bool,
}

fn default_tokens_path() -> PathBuf {
    PathBuf::from("tokens.json")
}

fn default_max_hops() -> usize {
    3 // Max 3 hops (4 tokens in path)
}

fn default_wait_for_approvals() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            private_key: String::new(),
            factory: None,
            router: None,
            limit_order: None,
            tokens_path: default_tokens_path(),
            max_hops: default_max_hops(),
            wait_for_approvals: default_wait_for_approvals(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DexError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DexError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| DexError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Write configuration to a TOML file, replacing any previous content.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DexError> {
        let path = path.as_ref();
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| DexError::Config(format!("writing {}: {e}", path.display())))
    }

    /// Render the configuration as it would be saved.
    pub fn to_toml(&self) -> Result<String, DexError> {
        toml::to_string_pretty(self).map_err(|e| DexError::Config(format!("encoding: {e}")))
    }

    /// Create a new configuration with a custom RPC endpoint.
    pub fn with_rpc(mut self, rpc_url: impl Into<String>, chain_id: u64) -> Self {
        self.rpc_url = rpc_url.into();
        self.chain_id = chain_id;
        self
    }

    /// Create a new configuration with a custom signing key.
    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = private_key.into();
        self
    }

    /// Create a new configuration with the core contract addresses.
    pub fn with_contracts(
        mut self,
        factory: Option<Address>,
        router: Address,
        limit_order: Address,
    ) -> Self {
        self.factory = factory;
        self.router = Some(router);
        self.limit_order = Some(limit_order);
        self
    }

    /// Create a new configuration with custom max routing hops.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Create a new configuration with a custom token registry path.
    pub fn with_tokens_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokens_path = path.into();
        self
    }

    /// Create a new configuration that does not wait for approvals to be mined.
    pub fn with_wait_for_approvals(mut self, wait: bool) -> Self {
        self.wait_for_approvals = wait;
        self
    }

    /// Configured factory, ignoring an unset or zero address.
    pub fn factory_address(&self) -> Option<Address> {
        non_zero(self.factory)
    }

    /// Configured router, or an error if it has not been deployed yet.
    pub fn router_address(&self) -> Result<Address, DexError> {
        non_zero(self.router).ok_or(DexError::MissingContract("router"))
    }

    /// Configured limit order book, or an error if it has not been deployed yet.
    pub fn limit_order_address(&self) -> Result<Address, DexError> {
        non_zero(self.limit_order).ok_or(DexError::MissingContract("limit order"))
    }

    /// Whether any core contract still needs a first-run deployment.
    pub fn needs_core_deployment(&self) -> bool {
        non_zero(self.factory).is_none()
            || non_zero(self.router).is_none()
            || non_zero(self.limit_order).is_none()
    }
}
