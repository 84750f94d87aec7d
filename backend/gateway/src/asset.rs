//! Balances and allowances through the standard token interface.
//!
//! Works for any token contract, including the Stellar Asset Contract that
//! wraps the native coin.

use std::sync::Arc;

use crate::errors::{GatewayError, Result};
use crate::ledger::{arg, Invocation};
use crate::scval;
use crate::signer::{validate_address, Signer};
use crate::submitter::{Action, Receipt, TransactionSubmitter};

/// How long an approval stays live, in ledgers (about a week at 5s/ledger).
pub const APPROVAL_LEDGERS: u32 = 120_960;

#[derive(Clone)]
pub struct AssetAccessor {
    submitter: Arc<TransactionSubmitter>,
}

impl AssetAccessor {
    pub fn new(submitter: Arc<TransactionSubmitter>) -> Self {
        Self { submitter }
    }

    pub async fn balance_of(&self, asset: &str, owner: &str) -> Result<i128> {
        validate_address(owner)?;
        let value = self
            .submitter
            .query(&Invocation::new(asset, "balance").arg(arg::address(owner)))
            .await?;
        scval::as_i128(&value)
    }

    pub async fn allowance(&self, asset: &str, owner: &str, spender: &str) -> Result<i128> {
        validate_address(owner)?;
        validate_address(spender)?;
        let value = self
            .submitter
            .query(
                &Invocation::new(asset, "allowance")
                    .arg(arg::address(owner))
                    .arg(arg::address(spender)),
            )
            .await?;
        scval::as_i128(&value)
    }

    /// Let `spender` move up to `amount` of the signer's `asset`.
    pub async fn approve(
        &self,
        signer: &dyn Signer,
        asset: &str,
        spender: &str,
        amount: i128,
    ) -> Result<Receipt> {
        validate_address(spender)?;
        if amount < 0 {
            return Err(GatewayError::Validation(
                "allowance cannot be negative".into(),
            ));
        }
        let expiration = self
            .submitter
            .latest_ledger()
            .await?
            .saturating_add(APPROVAL_LEDGERS);
        let invocation = Invocation::new(asset, "approve")
            .arg(arg::address(signer.address()))
            .arg(arg::address(spender))
            .arg(arg::i128(amount))
            .arg(arg::u32(expiration));

        self.submitter
            .execute(Action::ApproveAsset, signer, invocation)
            .await
    }
}
