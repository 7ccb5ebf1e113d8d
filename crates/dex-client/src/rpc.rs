//! JSON-RPC ledger backed by an alloy HTTP provider and a local signer.

use crate::config::ClientConfig;
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::types::{Address, Bytes, Receipt, TxHash};
use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tracing::{debug, info};

/// Ledger client talking to a node over HTTP JSON-RPC.
#[derive(Clone)]
pub struct RpcLedger {
    provider: DynProvider,
    account: Address,
}

impl RpcLedger {
    /// Connect to the configured endpoint with the configured signing key.
    ///
    /// Fails with [`DexError::ChainIdMismatch`] when the endpoint serves a
    /// different chain than the one the config names.
    pub async fn connect(config: &ClientConfig) -> Result<Self, DexError> {
        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .map_err(|e| DexError::InvalidKey(format!("{e}")))?;
        let account = signer.address();

        let url: Url = config
            .rpc_url
            .parse()
            .map_err(|_| DexError::InvalidRpcUrl(config.rpc_url.clone()))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        let actual = provider.get_chain_id().await?;
        if actual != config.chain_id {
            return Err(DexError::ChainIdMismatch {
                configured: config.chain_id,
                actual,
            });
        }

        info!(%account, chain_id = actual, rpc = %config.rpc_url, "Connected to ledger");
        Ok(Self { provider, account })
    }

    /// The underlying provider, for reads the client does not wrap.
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    fn request(&self) -> TransactionRequest {
        TransactionRequest::default().with_from(self.account)
    }
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    fn account(&self) -> Address {
        self.account
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, DexError> {
        let tx = self.request().with_to(to).with_input(input);
        Ok(self.provider.call(tx).await?)
    }

    async fn send(&self, to: Address, input: Bytes) -> Result<TxHash, DexError> {
        let tx = self.request().with_to(to).with_input(input);
        let pending = self.provider.send_transaction(tx).await?;
        let hash = *pending.tx_hash();
        debug!(%to, tx = %hash, "Transaction submitted");
        Ok(hash)
    }

    async fn deploy(&self, code: Bytes) -> Result<TxHash, DexError> {
        let tx = self.request().with_deploy_code(code);
        let pending = self.provider.send_transaction(tx).await?;
        let hash = *pending.tx_hash();
        debug!(tx = %hash, "Deployment submitted");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, DexError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx)
            .get_receipt()
            .await?;

        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            contract_address: receipt.contract_address,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        })
    }
}
