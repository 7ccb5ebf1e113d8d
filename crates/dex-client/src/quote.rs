//! Swap quotes from the router along a resolved route.

use crate::client::DexClient;
use crate::contracts::IRouter;
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::route::Route;
use crate::types::{Amount, TokenId};
use crate::units::{to_human, to_raw};
use futures_util::future::try_join;

/// A quote for a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// The route the router was asked about.
    pub route: Route,
    /// The raw input amount.
    pub amount_in: Amount,
    /// The raw expected output of the final hop.
    pub amount_out: Amount,
    /// `amount_out` in the output token's human units.
    pub out_human: String,
}

impl<L: Ledger> DexClient<L> {
    /// Quote swapping `amount_human` of `token_in` into `token_out`.
    ///
    /// Decimals are read fresh on every call.
    pub async fn quote(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        amount_human: &str,
    ) -> Result<Quote, DexError> {
        let router = self.config.router_address()?;
        let route = self.resolve_route(token_in, token_out).await?;

        let (decimals_in, decimals_out) =
            try_join(self.decimals(route.token_in()), self.decimals(route.token_out())).await?;
        let amount_in = to_raw(amount_human, decimals_in)?;

        let amount_out = self.amounts_out(router, amount_in, &route).await?;

        Ok(Quote {
            out_human: to_human(amount_out, decimals_out),
            route,
            amount_in,
            amount_out,
        })
    }

    /// Router estimate of the final-hop output for a raw input along `route`.
    pub(crate) async fn amounts_out(
        &self,
        router: TokenId,
        amount_in: Amount,
        route: &Route,
    ) -> Result<Amount, DexError> {
        let amounts = self
            .read(
                router,
                IRouter::getAmountsOutCall {
                    amountIn: amount_in,
                    path: route.path().to_vec(),
                },
            )
            .await?;
        amounts.last().copied().ok_or(DexError::EmptyQuote)
    }
}
