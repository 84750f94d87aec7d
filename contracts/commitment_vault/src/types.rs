//! # Types
//!
//! Shared data structures used across all modules of the commitment vault.
//!
//! ## Design decisions
//!
//! ### Terms / State split
//!
//! A `Commitment` is internally stored as two separate ledger entries:
//!
//! - [`CommitmentTerms`]: written once at creation; never mutated.
//! - [`CommitmentState`]: written on confirmation and on resolution.
//!
//! The public API exposes the reconstructed [`Commitment`] struct.
//!
//! ### Status as a Finite-State Machine
//!
//! [`CommitmentStatus`] only moves forward:
//!
//! ```text
//! Active ──► PendingValidation ──► Resolved
//!    └─────────────────────────────►┘
//! ```
//!
//! [`Outcome`] is `None` until the status becomes `Resolved`, and is written
//! in the same state update.

use soroban_sdk::{contracttype, Address, String};

/// Seconds the validator has to respond after the creator confirms.
pub const VALIDATION_WINDOW: u64 = 24 * 60 * 60;

/// The asset a stake is denominated in.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Asset {
    /// The network's native coin, moved through its asset contract.
    Native,
    /// A fungible token implementing the standard token interface.
    Token(Address),
}

/// Lifecycle status of a commitment.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum CommitmentStatus {
    /// Stake locked; creator has not confirmed completion yet.
    Active,
    /// Creator confirmed; waiting on the validator.
    PendingValidation,
    /// Stake released to exactly one party.
    Resolved,
}

/// Final result of a commitment.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    None,
    /// Validator approved; stake returned to the creator.
    Success,
    /// Rejected, expired, or validator silence; stake sent to the charity.
    Failed,
}

/// Immutable commitment terms, written once at creation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentTerms {
    pub id: u64,
    pub creator: Address,
    pub validator: Address,
    pub charity: Address,
    pub asset: Asset,
    pub amount: i128,
    pub deadline: u64,
    pub created_at: u64,
    pub description: String,
}

/// Mutable commitment state, updated on confirmation and resolution.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentState {
    pub status: CommitmentStatus,
    pub outcome: Outcome,
    /// `0` until the creator confirms.
    pub confirmation_time: u64,
    /// `0` until the creator confirms; then `confirmation_time + VALIDATION_WINDOW`.
    pub validator_deadline: u64,
}

impl CommitmentState {
    pub fn active() -> Self {
        Self {
            status: CommitmentStatus::Active,
            outcome: Outcome::None,
            confirmation_time: 0,
            validator_deadline: 0,
        }
    }
}

/// Full on-chain representation of a commitment.
///
/// Used as the public API return type; reconstructed internally from
/// the split `CommitmentTerms` + `CommitmentState` storage entries.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Commitment {
    /// Unique identifier (auto-incremented, starting at 1).
    pub id: u64,
    /// Address that staked the funds and receives them back on success.
    pub creator: Address,
    /// Address allowed to approve or reject the completion claim.
    pub validator: Address,
    /// Address that receives the stake on failure.
    pub charity: Address,
    pub asset: Asset,
    /// Stake in the asset's smallest unit.
    pub amount: i128,
    /// Ledger timestamp before which the creator must confirm.
    pub deadline: u64,
    /// Ledger timestamp at creation.
    pub created_at: u64,
    pub confirmation_time: u64,
    pub validator_deadline: u64,
    /// Free text shown to users; carries no protocol meaning.
    pub description: String,
    pub status: CommitmentStatus,
    pub outcome: Outcome,
}

impl Commitment {
    pub fn from_parts(terms: CommitmentTerms, state: CommitmentState) -> Self {
        Commitment {
            id: terms.id,
            creator: terms.creator,
            validator: terms.validator,
            charity: terms.charity,
            asset: terms.asset,
            amount: terms.amount,
            deadline: terms.deadline,
            created_at: terms.created_at,
            confirmation_time: state.confirmation_time,
            validator_deadline: state.validator_deadline,
            description: terms.description,
            status: state.status,
            outcome: state.outcome,
        }
    }
}
