//! Sponsor relay: pays for faucet mints on behalf of users.
//!
//! The relay holds its own key and will only ever mint the fixed faucet
//! allocation to the requesting address. Any other action must be signed by
//! the user, so the relay turns it away.
//!
//! Each grant first claims the address's cooldown slot in the journal, then
//! mints. The slot is released only when the mint provably did not land; a
//! send or confirmation whose outcome is unknown keeps it claimed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db;
use crate::errors::{ContractKind, GatewayError, Result};
use crate::ledger::{arg, Invocation};
use crate::signer::{validate_address, Signer};
use crate::submitter::{Action, Receipt, TransactionSubmitter};

/// Units minted per grant: 1,000 whole tokens at 7 decimals.
pub const FAUCET_ALLOCATION: i128 = 1_000 * 10_000_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRequest {
    pub action: String,
    pub user_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorReceipt {
    pub status: String,
    pub ledger: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorResponse {
    pub success: bool,
    pub hash: String,
    pub receipt: SponsorReceipt,
}

pub struct Sponsor {
    submitter: Arc<TransactionSubmitter>,
    signer: Option<Arc<dyn Signer>>,
    faucet_contract_id: String,
    pool: SqlitePool,
    cooldown_secs: u64,
    /// Serializes slot claims within this process.
    claims: Mutex<()>,
}

impl Sponsor {
    pub fn new(
        submitter: Arc<TransactionSubmitter>,
        signer: Option<Arc<dyn Signer>>,
        faucet_contract_id: &str,
        pool: SqlitePool,
        cooldown_secs: u64,
    ) -> Self {
        Self {
            submitter,
            signer,
            faucet_contract_id: faucet_contract_id.to_string(),
            pool,
            cooldown_secs,
            claims: Mutex::new(()),
        }
    }

    pub async fn grant(&self, request: &SponsorRequest) -> Result<SponsorResponse> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            GatewayError::Config("sponsor relay has no signing key configured".into())
        })?;

        if Action::parse(&request.action) != Some(Action::Faucet) {
            return Err(GatewayError::Validation(format!(
                "action '{}' cannot be sponsored; it must be signed by the user's own wallet",
                request.action
            )));
        }
        validate_address(&request.user_address)?;

        let claim = self.claim(&request.user_address).await?;
        let receipt = self.mint(&**signer, claim, &request.user_address).await?;
        info!(
            user = %request.user_address,
            hash = %receipt.hash,
            ledger = receipt.ledger,
            "Sponsored faucet mint"
        );

        Ok(SponsorResponse {
            success: true,
            hash: receipt.hash,
            receipt: SponsorReceipt {
                status: "success".into(),
                ledger: receipt.ledger,
            },
        })
    }

    /// Take the cooldown slot for `user`, or report when it frees up.
    async fn claim(&self, user: &str) -> Result<i64> {
        let now = Utc::now().timestamp();
        let cooldown = i64::try_from(self.cooldown_secs).unwrap_or(i64::MAX);
        let claimed = {
            let _serialized = self.claims.lock().await;
            db::claim_sponsorship(&self.pool, user, now, cooldown).await?
        };
        if let Some(id) = claimed {
            return Ok(id);
        }

        let last = db::last_sponsorship(&self.pool, user).await?.unwrap_or(now);
        let next = last.saturating_add(cooldown);
        Err(GatewayError::Cooldown {
            address: user.to_string(),
            retry_after_secs: u64::try_from(next - now).unwrap_or_default(),
        })
    }

    async fn mint(&self, signer: &dyn Signer, claim: i64, user: &str) -> Result<Receipt> {
        let invocation = Invocation::new(&self.faucet_contract_id, "mint")
            .arg(arg::address(user))
            .arg(arg::i128(FAUCET_ALLOCATION))
            .with_codes(ContractKind::Faucet);

        let signed = match self
            .submitter
            .prepare(signer.address(), invocation)
            .await
            .and_then(|prepared| self.submitter.sign(signer, prepared))
        {
            Ok(signed) => signed,
            Err(e) => return self.release(claim, e).await,
        };
        db::attach_transaction(&self.pool, claim, &signed.hash).await?;

        let pending = match self.submitter.send(&signed).await {
            Ok(pending) => pending,
            Err(e @ GatewayError::TransactionFailed { .. }) => {
                return self.release(claim, e).await
            }
            Err(e) => {
                warn!(%user, hash = %signed.hash, "Mint send outcome unknown, slot stays claimed: {e}");
                return Err(e);
            }
        };

        match self.submitter.await_confirmation(&pending).await {
            Ok(receipt) => {
                db::confirm_sponsorship(&self.pool, claim, receipt.ledger).await?;
                Ok(receipt)
            }
            Err(e @ GatewayError::TransactionFailed { .. }) => self.release(claim, e).await,
            Err(e) => {
                warn!(%user, hash = %pending.hash, "Mint not confirmed, slot stays claimed: {e}");
                Err(e)
            }
        }
    }

    async fn release(&self, claim: i64, cause: GatewayError) -> Result<Receipt> {
        db::release_sponsorship(&self.pool, claim).await?;
        Err(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, FaucetError, Rejection};
    use crate::fees::FeePolicy;
    use crate::ledger::TxLookup;
    use crate::signer::KeypairSigner;
    use crate::submitter::ConfirmationPolicy;
    use crate::testing::MockLedger;
    use std::time::Duration;

    async fn relay_with(
        ledger: Arc<MockLedger>,
        with_key: bool,
        confirmation: ConfirmationPolicy,
    ) -> (Sponsor, SqlitePool) {
        let pool = db::init_pool("sqlite::memory:").await.unwrap();
        let submitter = Arc::new(TransactionSubmitter::new(
            ledger,
            FeePolicy::default(),
            confirmation,
            "net",
        ));
        let signer: Option<Arc<dyn Signer>> =
            with_key.then(|| Arc::new(KeypairSigner::from_bytes(&[42u8; 32])) as Arc<dyn Signer>);
        let faucet = stellar_strkey::Contract([4u8; 32]).to_string();
        (
            Sponsor::new(submitter, signer, &faucet, pool.clone(), 86_400),
            pool,
        )
    }

    async fn relay(ledger: Arc<MockLedger>, with_key: bool) -> (Sponsor, SqlitePool) {
        relay_with(ledger, with_key, ConfirmationPolicy::default()).await
    }

    fn request(action: &str, user: &str) -> SponsorRequest {
        SponsorRequest {
            action: action.into(),
            user_address: user.into(),
        }
    }

    fn user() -> String {
        KeypairSigner::from_bytes(&[1u8; 32]).address().to_string()
    }

    #[tokio::test]
    async fn mints_allocation_with_relay_key() {
        let ledger = Arc::new(MockLedger::new());
        let (sponsor, pool) = relay(ledger.clone(), true).await;

        let resp = sponsor.grant(&request("faucet", &user())).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.receipt.status, "success");
        assert_eq!(resp.receipt.ledger, 100);

        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        let call = &sent[0].envelope.invocation;
        assert_eq!(call.function, "mint");
        assert_eq!(call.args, vec![arg::address(&user()), arg::i128(FAUCET_ALLOCATION)]);
        assert_eq!(call.codes, ContractKind::Faucet);
        assert_ne!(sent[0].envelope.source, user());

        let journal = db::sponsorships_for(&pool, &user()).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].status, "confirmed");
        assert_eq!(journal[0].tx_hash.as_deref(), Some(resp.hash.as_str()));
        assert_eq!(journal[0].ledger, Some(100));
    }

    #[tokio::test]
    async fn refuses_every_other_action() {
        let ledger = Arc::new(MockLedger::new());
        let (sponsor, _) = relay(ledger.clone(), true).await;

        for action in ["create_commitment", "approve_completion", "transfer", "FAUCET", ""] {
            let err = sponsor.grant(&request(action, &user())).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(err.to_string().contains("signed by the user"));
        }
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let (sponsor, _) = relay(Arc::new(MockLedger::new()), false).await;
        let err = sponsor.grant(&request("faucet", &user())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn malformed_address_is_rejected() {
        let (sponsor, _) = relay(Arc::new(MockLedger::new()), true).await;
        let err = sponsor.grant(&request("faucet", "0xabc")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn repeat_grant_inside_cooldown_is_refused() {
        let ledger = Arc::new(MockLedger::new());
        let (sponsor, pool) = relay(ledger.clone(), true).await;

        sponsor.grant(&request("faucet", &user())).await.unwrap();
        let err = sponsor.grant(&request("faucet", &user())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(matches!(
            err,
            GatewayError::Cooldown { retry_after_secs, .. } if retry_after_secs > 86_000
        ));
        assert_eq!(ledger.sent().len(), 1);

        // A grant older than the cooldown no longer blocks.
        let other = KeypairSigner::from_bytes(&[2u8; 32]).address().to_string();
        let long_ago = Utc::now().timestamp() - 90_000;
        let old = db::claim_sponsorship(&pool, &other, long_ago, 86_400)
            .await
            .unwrap()
            .unwrap();
        db::confirm_sponsorship(&pool, old, 1).await.unwrap();
        sponsor.grant(&request("faucet", &other)).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_grants_mint_once() {
        let ledger = Arc::new(MockLedger::new());
        let (sponsor, pool) = relay(ledger.clone(), true).await;
        let req = request("faucet", &user());

        let (first, second) = tokio::join!(sponsor.grant(&req), sponsor.grant(&req));

        let (granted, refused): (Vec<_>, Vec<_>) =
            [first, second].into_iter().partition(|r| r.is_ok());
        assert_eq!(granted.len(), 1);
        assert_eq!(refused.len(), 1);
        let err = refused.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(ledger.sent().len(), 1);
        assert_eq!(db::sponsorships_for(&pool, &user()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_mint_frees_the_slot() {
        let ledger = Arc::new(MockLedger::new());
        ledger.queue_lookup(TxLookup::Failed {
            ledger: 90,
            detail: "faucet not initialized".into(),
            code: Some(FaucetError::NotInitialized.code()),
        });
        let (sponsor, pool) = relay(ledger.clone(), true).await;

        let err = sponsor.grant(&request("faucet", &user())).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::TransactionFailed {
                code: Some(Rejection::Faucet(FaucetError::NotInitialized)),
                ..
            }
        ));
        let journal = db::sponsorships_for(&pool, &user()).await.unwrap();
        assert_eq!(journal[0].status, "failed");
        assert_eq!(journal[0].tx_hash.as_deref(), Some(ledger.sent()[0].hash.as_str()));

        // The failed mint consumed the relay's sequence number.
        let relay_key = KeypairSigner::from_bytes(&[42u8; 32]);
        ledger.set_sequence(relay_key.address(), 2);
        sponsor.grant(&request("faucet", &user())).await.unwrap();
        assert_eq!(ledger.sent().len(), 2);
    }

    #[tokio::test]
    async fn rejected_simulation_frees_the_slot() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fail("mint", FaucetError::InvalidAmount.code());
        let (sponsor, pool) = relay(ledger.clone(), true).await;

        let err = sponsor.grant(&request("faucet", &user())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(ledger.sent().is_empty());

        let journal = db::sponsorships_for(&pool, &user()).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].status, "failed");
        assert_eq!(journal[0].tx_hash, None);
        assert_eq!(db::last_sponsorship(&pool, &user()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unconfirmed_mint_keeps_the_slot() {
        let ledger = Arc::new(MockLedger::new());
        ledger.always_pending(true);
        let confirmation = ConfirmationPolicy {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
        };
        let (sponsor, pool) = relay_with(ledger.clone(), true, confirmation).await;

        let err = sponsor.grant(&request("faucet", &user())).await.unwrap_err();
        assert!(matches!(err, GatewayError::ConfirmationTimeout { .. }));

        let journal = db::sponsorships_for(&pool, &user()).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].status, "pending");
        assert_eq!(journal[0].tx_hash.as_deref(), Some(ledger.sent()[0].hash.as_str()));

        let err = sponsor.grant(&request("faucet", &user())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(ledger.sent().len(), 1);
    }
}
