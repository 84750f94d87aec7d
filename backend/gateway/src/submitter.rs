//! Fee-aware, two-phase submission of ledger-mutating calls.
//!
//! `submit` prices a call (fee conditions + simulated cost + headroom), signs
//! and sends it, and returns a [`PendingTransaction`] as soon as the network
//! accepts it. `await_confirmation` then polls for the receipt. Nothing here
//! resubmits or bumps fees on its own; a timeout leaves the handle valid for
//! another wait.
//!
//! The faucet claim is the only action allowed to go through the sponsor
//! relay. Any relay failure falls back to the user signing the call directly.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{ContractKind, GatewayError, Result};
use crate::fees::{self, FeePolicy, FeeQuote};
use crate::ledger::{arg, Invocation, Ledger, SignedEnvelope, TransactionEnvelope, TxLookup};
use crate::relay::RelayClient;
use crate::signer::Signer;

/// Ledgers a signed transaction stays valid for (about ten minutes).
const VALIDITY_LEDGERS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// User intents the submitter knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Faucet,
    ApproveAsset,
    CreateCommitment,
    ConfirmCompletion,
    ApproveCompletion,
    RejectCompletion,
    ResolveExpired,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "faucet" => Self::Faucet,
            "approve_asset" => Self::ApproveAsset,
            "create_commitment" => Self::CreateCommitment,
            "confirm_completion" => Self::ConfirmCompletion,
            "approve_completion" => Self::ApproveCompletion,
            "reject_completion" => Self::RejectCompletion,
            "resolve_expired" => Self::ResolveExpired,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faucet => "faucet",
            Self::ApproveAsset => "approve_asset",
            Self::CreateCommitment => "create_commitment",
            Self::ConfirmCompletion => "confirm_completion",
            Self::ApproveCompletion => "approve_completion",
            Self::RejectCompletion => "reject_completion",
            Self::ResolveExpired => "resolve_expired",
        }
    }

    /// Only the faucet may be paid for by the relay. Everything that moves
    /// or attests a stake must carry the user's own signature.
    pub fn is_relay_eligible(&self) -> bool {
        matches!(self, Self::Faucet)
    }
}

/// A priced, unsigned call.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub envelope: TransactionEnvelope,
    pub quote: FeeQuote,
}

/// Handle to a transaction the network has accepted but not yet confirmed.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub hash: String,
    pub quote: FeeQuote,
    /// Error table for the called contract.
    pub codes: ContractKind,
    pub submitted_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub hash: String,
    pub ledger: u32,
    /// Contract return value, when the call produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    /// The sponsor relay signed and paid for this transaction.
    pub sponsored: bool,
}

pub struct TransactionSubmitter {
    ledger: Arc<dyn Ledger>,
    fees: FeePolicy,
    confirmation: ConfirmationPolicy,
    network_passphrase: String,
    relay: Option<RelayClient>,
}

impl TransactionSubmitter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        fees: FeePolicy,
        confirmation: ConfirmationPolicy,
        network_passphrase: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            fees,
            confirmation,
            network_passphrase: network_passphrase.into(),
            relay: None,
        }
    }

    pub fn with_relay(mut self, relay: RelayClient) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Read-only call; returns the contract's return value.
    pub async fn query(&self, invocation: &Invocation) -> Result<Value> {
        let simulation = self.ledger.simulate(None, invocation).await?;
        simulation.result.ok_or_else(|| {
            GatewayError::Decode(format!("{} returned no value", invocation.function))
        })
    }

    pub async fn prepare(&self, source: &str, invocation: Invocation) -> Result<PreparedTransaction> {
        let conditions = self.ledger.fee_conditions().await?;
        let sequence = self.ledger.sequence(source).await?.saturating_add(1);
        let simulation = self.ledger.simulate(Some(source), &invocation).await?;
        let quote = fees::quote(conditions, simulation.min_resource_fee, &self.fees);
        debug!(
            function = %invocation.function,
            resource_fee = simulation.min_resource_fee,
            resource_limit = quote.resource_limit,
            inclusion_fee = quote.inclusion_fee,
            sequence,
            "Priced transaction"
        );

        let max_ledger = simulation.latest_ledger.saturating_add(VALIDITY_LEDGERS);
        Ok(PreparedTransaction {
            envelope: TransactionEnvelope::new(source, sequence, invocation, quote, max_ledger)
                .with_simulation(&simulation),
            quote,
        })
    }

    pub async fn submit(
        &self,
        signer: &dyn Signer,
        invocation: Invocation,
    ) -> Result<PendingTransaction> {
        let prepared = self.prepare(signer.address(), invocation).await?;
        let signed = self.sign(signer, prepared)?;
        self.send(&signed).await
    }

    pub fn sign(&self, signer: &dyn Signer, prepared: PreparedTransaction) -> Result<SignedEnvelope> {
        prepared.envelope.sign(signer, &self.network_passphrase)
    }

    /// Hand a signed transaction to the network, exactly once.
    pub async fn send(&self, signed: &SignedEnvelope) -> Result<PendingTransaction> {
        let hash = self.ledger.send(signed).await?;
        let envelope = &signed.envelope;
        info!(
            %hash,
            function = %envelope.invocation.function,
            source = %envelope.source,
            "Submitted transaction"
        );

        Ok(PendingTransaction {
            hash,
            quote: envelope.fee,
            codes: envelope.invocation.codes,
            submitted_at: Instant::now(),
        })
    }

    /// Poll until the transaction lands or the confirmation timeout elapses.
    /// Transient lookup failures are retried within the same budget.
    pub async fn await_confirmation(&self, pending: &PendingTransaction) -> Result<Receipt> {
        let started = Instant::now();
        loop {
            match self.ledger.transaction(&pending.hash).await {
                Ok(TxLookup::Success(inclusion)) => {
                    info!(hash = %pending.hash, ledger = inclusion.ledger, "Transaction confirmed");
                    return Ok(Receipt {
                        hash: pending.hash.clone(),
                        ledger: inclusion.ledger,
                        return_value: inclusion.return_value,
                        sponsored: false,
                    });
                }
                Ok(TxLookup::Failed {
                    ledger,
                    detail,
                    code,
                }) => {
                    warn!(hash = %pending.hash, ledger, %detail, "Transaction failed");
                    return Err(GatewayError::TransactionFailed {
                        hash: pending.hash.clone(),
                        detail,
                        code: code.map(|c| pending.codes.decode(c)),
                    });
                }
                Ok(TxLookup::Pending) => {}
                Err(e) if e.is_retryable() => {
                    warn!(hash = %pending.hash, "Receipt lookup failed, still waiting: {e}");
                }
                Err(e) => return Err(e),
            }

            if started.elapsed() >= self.confirmation.timeout {
                return Err(GatewayError::ConfirmationTimeout {
                    hash: pending.hash.clone(),
                    waited_secs: self.confirmation.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.confirmation.poll_interval).await;
        }
    }

    pub async fn submit_and_confirm(
        &self,
        signer: &dyn Signer,
        invocation: Invocation,
    ) -> Result<Receipt> {
        let pending = self.submit(signer, invocation).await?;
        self.await_confirmation(&pending).await
    }

    /// Route `invocation` for `action`: through the relay when the action is
    /// eligible and a relay is configured, otherwise signed by `signer`.
    pub async fn execute(
        &self,
        action: Action,
        signer: &dyn Signer,
        invocation: Invocation,
    ) -> Result<Receipt> {
        if action.is_relay_eligible() {
            if let Some(relay) = &self.relay {
                match relay.request(action, signer.address()).await {
                    Ok(receipt) => return Ok(receipt),
                    Err(e) => warn!(
                        action = action.as_str(),
                        "Sponsor relay unavailable, signing directly: {e}"
                    ),
                }
            }
        }
        self.submit_and_confirm(signer, invocation).await
    }

    /// Claim the faucet allocation for `signer`.
    pub async fn claim_faucet(&self, signer: &dyn Signer, faucet_contract: &str) -> Result<Receipt> {
        let invocation = Invocation::new(faucet_contract, "faucet")
            .arg(arg::address(signer.address()))
            .with_codes(ContractKind::Faucet);
        self.execute(Action::Faucet, signer, invocation).await
    }

    /// Current ledger sequence, for expiration arithmetic.
    pub async fn latest_ledger(&self) -> Result<u32> {
        self.ledger.latest_ledger().await
    }
}
