//! Allowance guard: approve a spender only when the current allowance is short.
//!
//! The read and the approval are not atomic. An approval changed by another
//! actor in between can cause a redundant approval or a short allowance at
//! execution time; approvals are always for the exact amount needed, never
//! unlimited, which bounds what such a race can expose.

use crate::client::DexClient;
use crate::contracts::IERC20;
use crate::error::DexError;
use crate::ledger::Ledger;
use crate::types::{Address, Amount, TokenId, TxHash};
use tracing::{debug, info};

impl<L: Ledger> DexClient<L> {
    /// Allowance granted by the signing account to `spender` for `token`.
    pub async fn allowance(&self, token: TokenId, spender: Address) -> Result<Amount, DexError> {
        self.read(
            token,
            IERC20::allowanceCall {
                owner: self.account(),
                spender,
            },
        )
        .await
    }

    /// Ensure `spender` may move at least `needed` of `token`.
    ///
    /// Returns `None` without submitting anything when the allowance already
    /// suffices. Otherwise submits `approve(spender, needed)` and returns its
    /// hash without waiting for it to be mined.
    pub async fn approve_if_needed(
        &self,
        token: TokenId,
        spender: Address,
        needed: Amount,
    ) -> Result<Option<TxHash>, DexError> {
        let current = self.allowance(token, spender).await?;
        if current >= needed {
            debug!(%token, %spender, %current, %needed, "Allowance sufficient");
            return Ok(None);
        }

        let tx = self
            .submit(
                token,
                IERC20::approveCall {
                    spender,
                    amount: needed,
                },
            )
            .await?;
        info!(%token, %spender, %needed, %tx, "Approval submitted");
        Ok(Some(tx))
    }

    /// Run the guard and, when configured to, wait for a submitted approval
    /// to be mined successfully before returning.
    pub(crate) async fn ensure_allowance(
        &self,
        token: TokenId,
        spender: Address,
        needed: Amount,
    ) -> Result<Option<TxHash>, DexError> {
        let approval = self.approve_if_needed(token, spender, needed).await?;
        if let Some(tx) = approval {
            if self.config.wait_for_approvals {
                self.confirm(tx).await?;
            }
        }
        Ok(approval)
    }
}
