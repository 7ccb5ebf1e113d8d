//! Swap, liquidity and token operations composed from routing, quoting and
//! the allowance guard.

use crate::client::DexClient;
use crate::contracts::{IRouter, LimitOrderDeployment, RouterDeployment, TokenTemplate, IERC20};
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::types::{Address, Amount, Bytes, TokenDescriptor, TokenId, TxHash};
use crate::units::{to_human, to_raw};
use alloy::sol_types::SolConstructor;
use futures_util::future::{try_join, try_join3};
use tracing::{info, warn};

/// Token metadata read from chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Balance of the signing account in one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub raw: Amount,
    pub human: String,
    pub decimals: u8,
}

/// One registry token's balance. A failed read is kept per token so one
/// broken entry does not hide the others.
#[derive(Debug)]
pub struct RegistryBalance {
    pub token: TokenDescriptor,
    pub balance: Result<TokenBalance, DexError>,
}

/// Result of a successful token deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedToken {
    pub address: Address,
    pub tx: TxHash,
}

/// Parameters of a new token.
#[derive(Debug, Clone)]
pub struct TokenParams {
    pub name: String,
    pub symbol: String,
    /// Total supply in human units.
    pub supply: String,
    pub decimals: u8,
    /// Recipient of the whole supply.
    pub to: Address,
}

/// Creation bytecode for the exchange's core contracts.
#[derive(Debug, Clone, Default)]
pub struct CoreBytecode {
    pub factory: Bytes,
    pub router: Bytes,
    pub limit_order: Bytes,
}

/// Addresses of the core contracts after a first-run deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreContracts {
    pub factory: Address,
    pub router: Address,
    pub limit_order: Address,
}

impl<L: Ledger> DexClient<L> {
    /// Swap an exact `amount_human` of `token_in` for at least
    /// `min_out_human` of `token_out`, delivered to `to`.
    ///
    /// Returns the swap transaction hash; the caller decides whether to wait
    /// for it. Pair state may change between routing and execution; the
    /// minimum output is the only protection.
    pub async fn swap(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        amount_human: &str,
        min_out_human: &str,
        to: Address,
    ) -> Result<TxHash, DexError> {
        let router = self.config.router_address()?;
        let route = self.resolve_route(token_in, token_out).await?;

        let (decimals_in, decimals_out) =
            try_join(self.decimals(route.token_in()), self.decimals(route.token_out())).await?;
        let amount_in = to_raw(amount_human, decimals_in)?;
        let min_out = to_raw(min_out_human, decimals_out)?;

        self.ensure_allowance(route.token_in(), router, amount_in).await?;

        let tx = self
            .submit(
                router,
                IRouter::swapExactTokensForTokensCall {
                    amountIn: amount_in,
                    amountOutMin: min_out,
                    path: route.path().to_vec(),
                    to,
                },
            )
            .await?;
        info!(%route, %amount_in, %min_out, %tx, "Swap submitted");
        Ok(tx)
    }

    /// Provide liquidity for the `(token_a, token_b)` pair.
    ///
    /// Amounts are converted with each token's own decimals. Approvals run
    /// strictly in order A then B; a failed approval stops the operation
    /// before anything else is submitted.
    pub async fn add_liquidity(
        &self,
        token_a: TokenId,
        token_b: TokenId,
        amount_a_human: &str,
        amount_b_human: &str,
        min_a_human: &str,
        min_b_human: &str,
    ) -> Result<TxHash, DexError> {
        let router = self.config.router_address()?;

        let (decimals_a, decimals_b) =
            try_join(self.decimals(token_a), self.decimals(token_b)).await?;
        let amount_a = to_raw(amount_a_human, decimals_a)?;
        let amount_b = to_raw(amount_b_human, decimals_b)?;
        let min_a = to_raw(min_a_human, decimals_a)?;
        let min_b = to_raw(min_b_human, decimals_b)?;

        self.ensure_allowance(token_a, router, amount_a).await?;
        self.ensure_allowance(token_b, router, amount_b).await?;

        let tx = self
            .submit(
                router,
                IRouter::addLiquidityCall {
                    tokenA: token_a,
                    tokenB: token_b,
                    amountADesired: amount_a,
                    amountBDesired: amount_b,
                    amountAMin: min_a,
                    amountBMin: min_b,
                },
            )
            .await?;
        info!(%token_a, %token_b, %amount_a, %amount_b, %tx, "Liquidity submitted");
        Ok(tx)
    }

    /// Deploy a new token from `bytecode` and register it.
    ///
    /// Waits for the deployment to be mined. Nothing is registered unless
    /// the receipt names the created contract.
    pub async fn deploy_token(
        &mut self,
        bytecode: &Bytes,
        params: TokenParams,
    ) -> Result<DeployedToken, DexError> {
        let supply = to_raw(&params.supply, params.decimals)?;

        let constructor = TokenTemplate::constructorCall {
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            supply,
            to: params.to,
        };
        let tx = self
            .ledger
            .deploy(creation_code(bytecode, &constructor.abi_encode()))
            .await?;

        let address = self.deployed_address(tx).await?;
        self.registry.upsert(TokenDescriptor::new(
            address,
            params.symbol.clone(),
            params.name.clone(),
            params.decimals,
        ))?;

        info!(%address, %tx, symbol = %params.symbol, "Token deployed");
        Ok(DeployedToken { address, tx })
    }

    /// Name, symbol and decimals of a token, read concurrently.
    pub async fn token_meta(&self, token: TokenId) -> Result<TokenMeta, DexError> {
        let (name, symbol, decimals) = try_join3(
            self.read(token, IERC20::nameCall {}),
            self.read(token, IERC20::symbolCall {}),
            self.read(token, IERC20::decimalsCall {}),
        )
        .await?;
        Ok(TokenMeta {
            name,
            symbol,
            decimals,
        })
    }

    /// Read a token's metadata from chain and add it to the registry.
    pub async fn register_token(&mut self, token: TokenId) -> Result<TokenDescriptor, DexError> {
        let meta = self.token_meta(token).await?;
        let entry = TokenDescriptor::new(token, meta.symbol, meta.name, meta.decimals);
        self.registry.upsert(entry.clone())?;
        Ok(entry)
    }

    /// Balance of the signing account in `token`.
    pub async fn token_balance(&self, token: TokenId) -> Result<TokenBalance, DexError> {
        let (decimals, raw) = try_join(
            self.decimals(token),
            self.read(
                token,
                IERC20::balanceOfCall {
                    account: self.account(),
                },
            ),
        )
        .await?;
        Ok(TokenBalance {
            raw,
            human: to_human(raw, decimals),
            decimals,
        })
    }

    /// Balances of every registry token, in registry order.
    pub async fn registry_balances(&self) -> Vec<RegistryBalance> {
        let mut balances = Vec::new();
        for token in self.registry.list() {
            let balance = self.token_balance(token.address).await;
            if let Err(e) = &balance {
                warn!(token = %token.address, error = %e, "Balance read failed");
            }
            balances.push(RegistryBalance { token, balance });
        }
        balances
    }

    /// Deploy whichever core contracts are not configured yet: factory,
    /// then router bound to the factory, then the order book bound to the
    /// router. Each deployed address is written into the client's config
    /// as soon as it is confirmed; persisting the config is up to the caller.
    pub async fn deploy_core(&mut self, code: &CoreBytecode) -> Result<CoreContracts, DexError> {
        let factory = match self.config.factory_address() {
            Some(factory) => factory,
            None => {
                let tx = self.ledger.deploy(code.factory.clone()).await?;
                let factory = self.deployed_address(tx).await?;
                info!(%factory, "Factory deployed");
                self.config.factory = Some(factory);
                factory
            }
        };

        let router = match self.config.router_address() {
            Ok(router) => router,
            Err(_) => {
                let args = RouterDeployment::constructorCall { factory }.abi_encode();
                let tx = self.ledger.deploy(creation_code(&code.router, &args)).await?;
                let router = self.deployed_address(tx).await?;
                info!(%router, "Router deployed");
                self.config.router = Some(router);
                router
            }
        };

        let limit_order = match self.config.limit_order_address() {
            Ok(limit_order) => limit_order,
            Err(_) => {
                let args = LimitOrderDeployment::constructorCall { router }.abi_encode();
                let tx = self
                    .ledger
                    .deploy(creation_code(&code.limit_order, &args))
                    .await?;
                let limit_order = self.deployed_address(tx).await?;
                info!(%limit_order, "Limit order book deployed");
                self.config.limit_order = Some(limit_order);
                limit_order
            }
        };

        Ok(CoreContracts {
            factory,
            router,
            limit_order,
        })
    }

    async fn deployed_address(&self, tx: TxHash) -> Result<Address, DexError> {
        let receipt = self.ledger.wait_for_receipt(tx).await?;
        match receipt.contract_address {
            Some(address) if receipt.success && !address.is_zero() => Ok(address),
            _ => Err(DexError::DeployFailed(tx)),
        }
    }
}

fn creation_code(bytecode: &Bytes, constructor_args: &[u8]) -> Bytes {
    let mut code = Vec::with_capacity(bytecode.len() + constructor_args.len());
    code.extend_from_slice(bytecode);
    code.extend_from_slice(constructor_args);
    code.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TokenRegistry;
    use crate::testing::MockLedger;
    use crate::types::U256;
    use alloy::sol_types::SolValue;
    use std::sync::Arc;

    fn client(ledger: &Arc<MockLedger>) -> DexClient<Arc<MockLedger>> {
        DexClient::with_registry(ledger.clone(), ledger.config(), TokenRegistry::in_memory(vec![]))
    }

    fn params(to: Address) -> TokenParams {
        TokenParams {
            name: "MyToken".to_string(),
            symbol: "MTK".to_string(),
            supply: "1000000".to_string(),
            decimals: 18,
            to,
        }
    }

    #[tokio::test]
    async fn test_swap_approves_first_hop_then_swaps() {
        let ledger = Arc::new(MockLedger::new());
        let a = ledger.add_token("Token A", "TKA", 18);
        let b = ledger.add_token("Token B", "TKB", 6);
        ledger.add_pair(a, b);

        let client = client(&ledger);
        let to = Address::repeat_byte(0xcc);
        client.swap(a, b, "1.5", "2", to).await.unwrap();

        let amount_in = U256::from(15u64) * U256::from(10u64).pow(U256::from(17));
        assert_eq!(ledger.approvals(), vec![(a, ledger.router(), amount_in)]);

        let swaps = ledger.swaps();
        assert_eq!(swaps.len(), 1);
        let swap = &swaps[0];
        assert_eq!(swap.amountIn, amount_in);
        assert_eq!(swap.amountOutMin, U256::from(2_000_000u64));
        assert_eq!(swap.path, vec![a, b]);
        assert_eq!(swap.to, to);
    }

    #[tokio::test]
    async fn test_add_liquidity_converts_each_side() {
        let ledger = Arc::new(MockLedger::new());
        let a = ledger.add_token("Token A", "TKA", 18);
        let b = ledger.add_token("Token B", "TKB", 6);

        let client = client(&ledger);
        client
            .add_liquidity(a, b, "1", "2", "0.5", "1")
            .await
            .unwrap();

        let one_a = U256::from(10u64).pow(U256::from(18));
        assert_eq!(
            ledger.approvals(),
            vec![
                (a, ledger.router(), one_a),
                (b, ledger.router(), U256::from(2_000_000u64)),
            ]
        );
        let liquidity = ledger.liquidity_calls();
        assert_eq!(liquidity.len(), 1);
        assert_eq!(liquidity[0].amountBDesired, U256::from(2_000_000u64));
        assert_eq!(liquidity[0].amountAMin, one_a / U256::from(2u64));
        // The mock's factory now knows the pair
        assert!(client.pair_exists(ledger.factory(), a, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_liquidity_stops_after_rejected_first_approval() {
        let ledger = Arc::new(MockLedger::new());
        let a = ledger.add_token("Token A", "TKA", 18);
        let b = ledger.add_token("Token B", "TKB", 18);
        ledger.reject_approvals_for(a);

        let client = client(&ledger);
        assert!(client.add_liquidity(a, b, "1", "1", "0", "0").await.is_err());
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_add_liquidity_stops_after_reverted_approval() {
        let ledger = Arc::new(MockLedger::new());
        let a = ledger.add_token("Token A", "TKA", 18);
        let b = ledger.add_token("Token B", "TKB", 18);
        ledger.revert_approvals_for(a);

        let client = client(&ledger);
        let err = client.add_liquidity(a, b, "1", "1", "0", "0").await.unwrap_err();
        assert!(matches!(err, DexError::Reverted(_)));
        // Only the reverted approval went out
        assert_eq!(ledger.sent().len(), 1);
        assert!(ledger.liquidity_calls().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_token_registers_on_success() {
        let ledger = Arc::new(MockLedger::new());
        let mut client = client(&ledger);
        let to = ledger.account();

        let deployed = client
            .deploy_token(&Bytes::from_static(&[0x60, 0x80]), params(to))
            .await
            .unwrap();

        let tokens = client.registry().list();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].address, deployed.address);
        assert_eq!(tokens[0].symbol, "MTK");
        assert_eq!(tokens[0].decimals, 18);

        // Creation code is the bytecode followed by the constructor arguments
        let code = ledger.deployments().pop().unwrap();
        assert_eq!(&code[..2], &[0x60, 0x80]);
        let (name, symbol, supply, recipient) =
            <(String, String, U256, Address)>::abi_decode_params(&code[2..]).unwrap();
        assert_eq!((name.as_str(), symbol.as_str()), ("MyToken", "MTK"));
        assert_eq!(supply, U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18)));
        assert_eq!(recipient, to);
    }

    #[tokio::test]
    async fn test_deploy_token_without_address_registers_nothing() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fail_deployments(true);
        let mut client = client(&ledger);

        let err = client
            .deploy_token(&Bytes::new(), params(ledger.account()))
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::DeployFailed(_)));
        assert!(client.registry().list().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_token_rejects_bad_supply() {
        let ledger = Arc::new(MockLedger::new());
        let mut client = client(&ledger);
        let mut params = params(ledger.account());
        params.supply = "1.5".to_string();
        params.decimals = 0;

        let err = client.deploy_token(&Bytes::new(), params).await.unwrap_err();
        assert!(matches!(err, DexError::InvalidAmount { .. }));
        assert!(ledger.deployments().is_empty());
    }

    #[tokio::test]
    async fn test_token_meta_and_register() {
        let ledger = Arc::new(MockLedger::new());
        let token = ledger.add_token("Token A", "TKA", 6);
        let mut client = client(&ledger);

        let meta = client.token_meta(token).await.unwrap();
        assert_eq!(
            meta,
            TokenMeta {
                name: "Token A".to_string(),
                symbol: "TKA".to_string(),
                decimals: 6
            }
        );

        client.register_token(token).await.unwrap();
        assert_eq!(client.registry().find(token).unwrap().symbol, "TKA");
    }

    #[tokio::test]
    async fn test_registry_balances_keep_failures_per_token() {
        let ledger = Arc::new(MockLedger::new());
        let token = ledger.add_token("Token A", "TKA", 6);
        ledger.set_balance(token, ledger.account(), U256::from(2_500_000u64));
        let unknown = Address::repeat_byte(0xee);

        let client = DexClient::with_registry(
            ledger.clone(),
            ledger.config(),
            TokenRegistry::in_memory(vec![
                TokenDescriptor::new(token, "TKA", "Token A", 6),
                TokenDescriptor::new(unknown, "???", "Unknown", 18),
            ]),
        );

        let balances = client.registry_balances().await;
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].balance.as_ref().unwrap().human, "2.5");
        assert!(balances[1].balance.is_err());
    }

    #[tokio::test]
    async fn test_deploy_core_fills_missing_contracts() {
        let ledger = Arc::new(MockLedger::new());
        let mut config = ledger.config();
        config.router = None;
        config.limit_order = None;
        let existing_factory = config.factory.unwrap();

        let mut client = DexClient::with_registry(ledger.clone(), config, TokenRegistry::in_memory(vec![]));
        let core = client.deploy_core(&CoreBytecode::default()).await.unwrap();

        assert_eq!(core.factory, existing_factory);
        assert_eq!(ledger.deployments().len(), 2);
        assert_eq!(client.config().router, Some(core.router));
        assert_eq!(client.config().limit_order, Some(core.limit_order));
        assert!(!client.config().needs_core_deployment());

        // The router was constructed against the existing factory
        let router_code = &ledger.deployments()[0];
        assert_eq!(Address::abi_decode(router_code).unwrap(), existing_factory);
    }
}
