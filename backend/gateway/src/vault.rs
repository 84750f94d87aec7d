//! Typed client for the commitment vault contract.
//!
//! Writes go through the [`TransactionSubmitter`] and resolve once the
//! transaction is confirmed. Every transition returns the record as the
//! contract left it, so callers never read a stale status after a write.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::asset::AssetAccessor;
use crate::commitment::{AssetView, CommitmentView};
use crate::errors::{ContractKind, GatewayError, Result};
use crate::ledger::{arg, Invocation};
use crate::scval;
use crate::signer::{validate_address, Signer};
use crate::submitter::{Action, Receipt, TransactionSubmitter};

/// Parameters of a new commitment.
#[derive(Debug, Clone)]
pub struct NewCommitment {
    pub validator: String,
    pub charity: String,
    pub asset: AssetView,
    pub amount: i128,
    /// Absolute unix time (seconds).
    pub deadline: u64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub receipt: Receipt,
    pub commitment: CommitmentView,
}

#[derive(Clone)]
pub struct VaultClient {
    submitter: Arc<TransactionSubmitter>,
    assets: AssetAccessor,
    contract_id: String,
}

impl VaultClient {
    pub fn new(submitter: Arc<TransactionSubmitter>, contract_id: &str) -> Self {
        Self {
            assets: AssetAccessor::new(submitter.clone()),
            submitter,
            contract_id: contract_id.to_string(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    fn call(&self, function: &str) -> Invocation {
        Invocation::new(&self.contract_id, function).with_codes(ContractKind::Vault)
    }

    // ─────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────

    /// Check locally, verify funds, then stake. Returns the new id.
    pub async fn create(&self, signer: &dyn Signer, new: NewCommitment) -> Result<(u64, Receipt)> {
        let creator = signer.address();
        validate_address(&new.validator)?;
        validate_address(&new.charity)?;
        if new.amount <= 0 {
            return Err(GatewayError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        if new.deadline <= now {
            return Err(GatewayError::Validation(
                "deadline must be in the future".into(),
            ));
        }
        if new.validator == creator || new.charity == creator || new.validator == new.charity {
            warn!(
                creator,
                validator = %new.validator,
                charity = %new.charity,
                "Commitment parties coincide"
            );
        }

        let asset_contract = match &new.asset {
            AssetView::Native => self.native_asset().await?,
            AssetView::Token(address) => address.clone(),
        };
        let balance = self.assets.balance_of(&asset_contract, creator).await?;
        if balance < new.amount {
            return Err(GatewayError::Funds(format!(
                "balance {balance} is lower than the stake {}",
                new.amount
            )));
        }

        let invocation = match &new.asset {
            AssetView::Native => self.call("create_native"),
            AssetView::Token(token) => {
                let allowance = self
                    .assets
                    .allowance(token, creator, &self.contract_id)
                    .await?;
                if allowance < new.amount {
                    return Err(GatewayError::Funds(format!(
                        "allowance {allowance} is lower than the stake {}; approve the vault first",
                        new.amount
                    )));
                }
                self.call("create")
            }
        }
        .arg(arg::address(creator))
        .arg(arg::address(&new.validator))
        .arg(arg::address(&new.charity));

        let invocation = match &new.asset {
            AssetView::Native => invocation,
            AssetView::Token(token) => invocation.arg(arg::address(token)),
        }
        .arg(arg::i128(new.amount))
        .arg(arg::u64(new.deadline))
        .arg(arg::string(&new.description));

        let receipt = self
            .submitter
            .execute(Action::CreateCommitment, signer, invocation)
            .await?;
        let id = receipt
            .return_value
            .as_ref()
            .ok_or_else(|| GatewayError::Decode("create returned no id".into()))
            .and_then(scval::as_u64)?;
        info!(id, creator, amount = %new.amount, "Commitment created");
        Ok((id, receipt))
    }

    pub async fn confirm_completion(&self, signer: &dyn Signer, id: u64) -> Result<Transition> {
        self.transition(Action::ConfirmCompletion, "confirm_completion", signer, id, true)
            .await
    }

    pub async fn approve(&self, signer: &dyn Signer, id: u64) -> Result<Transition> {
        self.transition(Action::ApproveCompletion, "approve", signer, id, true)
            .await
    }

    pub async fn reject(&self, signer: &dyn Signer, id: u64) -> Result<Transition> {
        self.transition(Action::RejectCompletion, "reject", signer, id, true)
            .await
    }

    /// Permissionless; `signer` only pays the fee.
    pub async fn resolve_expired(&self, signer: &dyn Signer, id: u64) -> Result<Transition> {
        self.transition(Action::ResolveExpired, "resolve_expired", signer, id, false)
            .await
    }

    async fn transition(
        &self,
        action: Action,
        function: &str,
        signer: &dyn Signer,
        id: u64,
        as_caller: bool,
    ) -> Result<Transition> {
        let mut invocation = self.call(function);
        if as_caller {
            invocation = invocation.arg(arg::address(signer.address()));
        }
        let invocation = invocation.arg(arg::u64(id));

        let receipt = self.submitter.execute(action, signer, invocation).await?;
        let commitment = match &receipt.return_value {
            Some(value) => CommitmentView::from_scval(value)?,
            None => self.get(id).await?,
        };
        info!(id, action = action.as_str(), status = ?commitment.status, "Commitment updated");
        Ok(Transition {
            receipt,
            commitment,
        })
    }

    // ─────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────

    pub async fn get(&self, id: u64) -> Result<CommitmentView> {
        let value = self
            .submitter
            .query(&self.call("get").arg(arg::u64(id)))
            .await?;
        CommitmentView::from_scval(&value)
    }

    pub async fn by_creator(&self, creator: &str) -> Result<Vec<u64>> {
        validate_address(creator)?;
        let value = self
            .submitter
            .query(&self.call("commitments_by_creator").arg(arg::address(creator)))
            .await?;
        scval::u64_list(&value)
    }

    pub async fn by_validator(&self, validator: &str) -> Result<Vec<u64>> {
        validate_address(validator)?;
        let value = self
            .submitter
            .query(&self.call("commitments_by_validator").arg(arg::address(validator)))
            .await?;
        scval::u64_list(&value)
    }

    pub async fn count(&self) -> Result<u64> {
        let value = self.submitter.query(&self.call("count")).await?;
        scval::as_u64(&value)
    }

    pub async fn native_asset(&self) -> Result<String> {
        let value = self.submitter.query(&self.call("native_asset")).await?;
        scval::as_address(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{Outcome, Status};
    use crate::errors::{ContractError, ErrorKind};
    use crate::fees::FeePolicy;
    use crate::signer::KeypairSigner;
    use crate::submitter::ConfirmationPolicy;
    use crate::testing::MockLedger;
    use serde_json::json;

    fn vault(ledger: Arc<MockLedger>) -> VaultClient {
        let submitter = TransactionSubmitter::new(
            ledger,
            FeePolicy::default(),
            ConfirmationPolicy::default(),
            "net",
        );
        VaultClient::new(Arc::new(submitter), &stellar_strkey::Contract([8u8; 32]).to_string())
    }

    fn account(seed: u8) -> KeypairSigner {
        KeypairSigner::from_bytes(&[seed; 32])
    }

    fn new_commitment(asset: AssetView, amount: i128) -> NewCommitment {
        NewCommitment {
            validator: account(2).address().to_string(),
            charity: account(3).address().to_string(),
            asset,
            amount,
            deadline: u64::try_from(Utc::now().timestamp()).unwrap() + 3_600,
            description: "ship the release".into(),
        }
    }

    fn token() -> AssetView {
        AssetView::Token(stellar_strkey::Contract([5u8; 32]).to_string())
    }

    #[tokio::test]
    async fn create_with_token_returns_id() {
        let ledger = Arc::new(MockLedger::new());
        ledger.respond("balance", json!({ "i128": "1000" }));
        ledger.respond("allowance", json!({ "i128": "1000" }));
        ledger.respond("create", json!({ "u64": "1" }));
        let client = vault(ledger.clone());

        let (id, receipt) = client
            .create(&account(1), new_commitment(token(), 500))
            .await
            .unwrap();

        assert_eq!(id, 1);
        assert!(!receipt.sponsored);
        let sent = ledger.sent();
        let call = &sent[0].envelope.invocation;
        assert_eq!(call.function, "create");
        assert_eq!(call.args.len(), 7);
        assert_eq!(call.args[4], arg::i128(500));
    }

    #[tokio::test]
    async fn create_native_resolves_native_asset_balance() {
        let ledger = Arc::new(MockLedger::new());
        let native = stellar_strkey::Contract([6u8; 32]).to_string();
        ledger.respond("native_asset", json!({ "address": native }));
        ledger.respond("balance", json!({ "i128": "1000" }));
        ledger.respond("create_native", json!({ "u64": "2" }));
        let client = vault(ledger.clone());

        let (id, _) = client
            .create(&account(1), new_commitment(AssetView::Native, 500))
            .await
            .unwrap();

        assert_eq!(id, 2);
        let simulated = ledger.simulated();
        assert!(simulated
            .iter()
            .any(|(_, call)| call.function == "balance" && call.contract_id == native));
        assert_eq!(ledger.sent()[0].envelope.invocation.args.len(), 6);
    }

    #[tokio::test]
    async fn create_rejects_before_touching_the_ledger() {
        let ledger = Arc::new(MockLedger::new());
        let client = vault(ledger.clone());

        let zero = client.create(&account(1), new_commitment(token(), 0)).await;
        assert_eq!(zero.unwrap_err().kind(), ErrorKind::Validation);

        let mut past = new_commitment(token(), 10);
        past.deadline = 1;
        assert_eq!(
            client.create(&account(1), past).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let mut bad = new_commitment(token(), 10);
        bad.charity = "charity".into();
        assert_eq!(
            client.create(&account(1), bad).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        assert!(ledger.simulated().is_empty());
    }

    #[tokio::test]
    async fn create_checks_funds() {
        let ledger = Arc::new(MockLedger::new());
        ledger.respond("balance", json!({ "i128": "100" }));
        ledger.respond("allowance", json!({ "i128": "0" }));
        let client = vault(ledger.clone());

        let err = client
            .create(&account(1), new_commitment(token(), 500))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Funds(msg) if msg.contains("balance")));

        ledger.respond("balance", json!({ "i128": "1000" }));
        let err = client
            .create(&account(1), new_commitment(token(), 500))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Funds(msg) if msg.contains("approve")));
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn transitions_return_the_updated_record() {
        let ledger = Arc::new(MockLedger::new());
        let mut record = CommitmentView::sample(4);
        record.status = Status::Resolved;
        record.outcome = Outcome::Success;
        ledger.respond("approve", record.to_scval());
        let client = vault(ledger.clone());
        let validator = account(2);

        let transition = client.approve(&validator, 4).await.unwrap();
        assert_eq!(transition.commitment, record);

        let sent = ledger.sent();
        let call = &sent[0].envelope.invocation;
        assert_eq!(call.args, vec![arg::address(validator.address()), arg::u64(4)]);
    }

    #[tokio::test]
    async fn resolve_expired_takes_only_the_id() {
        let ledger = Arc::new(MockLedger::new());
        let mut record = CommitmentView::sample(4);
        record.status = Status::Resolved;
        record.outcome = Outcome::Failed;
        ledger.respond("resolve_expired", record.to_scval());
        let client = vault(ledger.clone());

        let transition = client.resolve_expired(&account(9), 4).await.unwrap();
        assert_eq!(transition.commitment.outcome, Outcome::Failed);
        assert_eq!(ledger.sent()[0].envelope.invocation.args, vec![arg::u64(4)]);
    }

    #[tokio::test]
    async fn unauthorized_attestation_surfaces_verbatim() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fail("reject", ContractError::Unauthorized.code());
        let client = vault(ledger.clone());

        let err = client.reject(&account(1), 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn queries() {
        let ledger = Arc::new(MockLedger::new());
        let creator = account(1);
        ledger.respond("count", json!({ "u64": "2" }));
        ledger.respond(
            "commitments_by_creator",
            json!({ "vec": [{ "u64": "1" }, { "u64": "2" }] }),
        );
        ledger.respond("commitments_by_validator", json!({ "vec": [] }));
        ledger.respond_to(
            "get",
            vec![arg::u64(2)],
            CommitmentView::sample(2).to_scval(),
        );
        let client = vault(ledger);

        assert_eq!(client.count().await.unwrap(), 2);
        assert_eq!(client.by_creator(creator.address()).await.unwrap(), vec![1, 2]);
        assert!(client.by_validator(creator.address()).await.unwrap().is_empty());
        assert_eq!(client.get(2).await.unwrap().id, 2);
        assert!(client.by_creator("creator").await.is_err());
    }
}
