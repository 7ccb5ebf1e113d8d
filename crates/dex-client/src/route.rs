//! Multi-hop route resolution through existing liquidity pairs.

use crate::client::DexClient;
use crate::contracts::{IFactory, IRouter};
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::types::{Address, TokenId};
use std::fmt;
use tracing::debug;

/// An ordered path of 2 to 4 tokens. Adjacent tokens had a pair at
/// resolution time; pair state may change before the path is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: Vec<TokenId>,
}

impl Route {
    pub(crate) fn new(path: Vec<TokenId>) -> Self {
        debug_assert!((2..=4).contains(&path.len()));
        Self { path }
    }

    /// The tokens of the route, input first.
    pub fn path(&self) -> &[TokenId] {
        &self.path
    }

    /// Get the number of hops in this route.
    pub fn hops(&self) -> usize {
        self.path.len() - 1
    }

    /// Get the input token.
    pub fn token_in(&self) -> TokenId {
        self.path[0]
    }

    /// Get the output token.
    pub fn token_out(&self) -> TokenId {
        self.path[self.path.len() - 1]
    }

    pub fn into_path(self) -> Vec<TokenId> {
        self.path
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl<L: Ledger> DexClient<L> {
    /// Factory to probe for pairs: the configured one if set and non-zero,
    /// otherwise the factory the router is bound to.
    pub async fn factory_address(&self) -> Result<Address, DexError> {
        if let Some(factory) = self.config.factory_address() {
            return Ok(factory);
        }
        let router = self.config.router_address()?;
        self.read(router, IRouter::factoryCall {}).await
    }

    /// Whether the factory knows a pair for `(a, b)`.
    pub async fn pair_exists(&self, factory: Address, a: TokenId, b: TokenId) -> Result<bool, DexError> {
        let pair = self
            .read(factory, IFactory::getPairCall { tokenA: a, tokenB: b })
            .await?;
        Ok(!pair.is_zero())
    }

    /// Resolve a path from `token_in` to `token_out` using at most the
    /// configured number of hops.
    pub async fn resolve_route(&self, token_in: TokenId, token_out: TokenId) -> Result<Route, DexError> {
        self.resolve_path(token_in, token_out, self.config.max_hops).await
    }

    /// Find a path from `token_in` to `token_out` of at most `max_hops` hops.
    ///
    /// The search is greedy and deterministic: a direct pair always wins,
    /// then the first intermediate token in registry order that connects
    /// both ends, then the first pair of intermediates. Paths are not
    /// compared by price. Every pair check is a fresh factory read.
    pub async fn resolve_path(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        max_hops: usize,
    ) -> Result<Route, DexError> {
        let factory = self.factory_address().await?;

        if self.pair_exists(factory, token_in, token_out).await? {
            debug!(%token_in, %token_out, "Direct pair found");
            return Ok(Route::new(vec![token_in, token_out]));
        }

        let mids = self.registry.candidate_hops(token_in, token_out);

        if max_hops >= 2 {
            for &mid in &mids {
                if self.pair_exists(factory, token_in, mid).await?
                    && self.pair_exists(factory, mid, token_out).await?
                {
                    debug!(%token_in, %mid, %token_out, "Two-hop route found");
                    return Ok(Route::new(vec![token_in, mid, token_out]));
                }
            }
        }

        if max_hops >= 3 {
            for &mid1 in &mids {
                if !self.pair_exists(factory, token_in, mid1).await? {
                    continue;
                }
                for &mid2 in &mids {
                    if mid2 == mid1 {
                        continue;
                    }
                    if self.pair_exists(factory, mid1, mid2).await?
                        && self.pair_exists(factory, mid2, token_out).await?
                    {
                        debug!(%token_in, %mid1, %mid2, %token_out, "Three-hop route found");
                        return Ok(Route::new(vec![token_in, mid1, mid2, token_out]));
                    }
                }
            }
        }

        Err(DexError::NoRouteFound {
            token_in,
            token_out,
            max_hops: max_hops.min(3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TokenRegistry;
    use crate::testing::MockLedger;
    use crate::types::TokenDescriptor;
    use std::sync::Arc;

    fn a() -> Address {
        Address::repeat_byte(0x0a)
    }

    fn b() -> Address {
        Address::repeat_byte(0x0b)
    }

    fn x() -> Address {
        Address::repeat_byte(0x01)
    }

    fn y() -> Address {
        Address::repeat_byte(0x02)
    }

    fn client_with(ledger: &Arc<MockLedger>, mids: &[Address]) -> DexClient<Arc<MockLedger>> {
        let tokens = mids
            .iter()
            .map(|m| TokenDescriptor::new(*m, "MID", "Mid", 18))
            .collect();
        DexClient::with_registry(
            ledger.clone(),
            ledger.config(),
            TokenRegistry::in_memory(tokens),
        )
    }

    #[tokio::test]
    async fn test_direct_pair_wins() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), b());
        ledger.add_pair(a(), x());
        ledger.add_pair(x(), b());

        let client = client_with(&ledger, &[x()]);
        let route = client.resolve_path(a(), b(), 3).await.unwrap();
        assert_eq!(route.path(), &[a(), b()]);
        assert_eq!(route.hops(), 1);
    }

    #[tokio::test]
    async fn test_two_hop_route() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), x());
        ledger.add_pair(x(), b());

        let client = client_with(&ledger, &[x()]);
        let route = client.resolve_path(a(), b(), 3).await.unwrap();
        assert_eq!(route.path(), &[a(), x(), b()]);
    }

    #[tokio::test]
    async fn test_first_match_in_registry_order() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), x());
        ledger.add_pair(x(), b());
        ledger.add_pair(a(), y());
        ledger.add_pair(y(), b());

        let client = client_with(&ledger, &[y(), x()]);
        let route = client.resolve_path(a(), b(), 3).await.unwrap();
        assert_eq!(route.path(), &[a(), y(), b()]);
    }

    #[tokio::test]
    async fn test_three_hop_route() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), x());
        ledger.add_pair(x(), y());
        ledger.add_pair(y(), b());

        let client = client_with(&ledger, &[x(), y()]);
        let route = client.resolve_path(a(), b(), 3).await.unwrap();
        assert_eq!(route.path(), &[a(), x(), y(), b()]);
        assert_eq!(route.token_in(), a());
        assert_eq!(route.token_out(), b());

        // Not reachable within two hops
        let err = client.resolve_path(a(), b(), 2).await.unwrap_err();
        assert!(matches!(err, DexError::NoRouteFound { max_hops: 2, .. }));
    }

    #[tokio::test]
    async fn test_no_route_found() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), x());

        let client = client_with(&ledger, &[x(), y()]);
        let err = client.resolve_path(a(), b(), 3).await.unwrap_err();
        assert!(matches!(err, DexError::NoRouteFound { .. }));
    }

    #[tokio::test]
    async fn test_factory_from_router_when_unset() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), b());

        let mut config = ledger.config();
        config.factory = None;
        let client = DexClient::with_registry(ledger.clone(), config, TokenRegistry::in_memory(vec![]));

        assert_eq!(client.factory_address().await.unwrap(), ledger.factory());
        assert!(client.resolve_path(a(), b(), 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_no_caching_between_resolutions() {
        let ledger = Arc::new(MockLedger::new());
        ledger.add_pair(a(), b());
        let client = client_with(&ledger, &[]);

        client.resolve_path(a(), b(), 3).await.unwrap();
        client.resolve_path(a(), b(), 3).await.unwrap();
        assert_eq!(ledger.pair_lookups(), 2);
    }

    #[test]
    fn test_route_display() {
        let route = Route::new(vec![a(), b()]);
        assert_eq!(route.to_string(), format!("{} -> {}", a(), b()));
    }
}
