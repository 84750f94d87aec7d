//! # Commitment Vault Contract
//!
//! Staked-commitment escrow. A creator locks a stake against a promise, names a
//! validator who attests completion and a charity that receives the stake on
//! failure. Every stake resolves to exactly one party.
//!
//! | Phase        | Entry Point(s)                                   |
//! |--------------|--------------------------------------------------|
//! | Bootstrap    | [`CommitmentVault::init`]                        |
//! | Creation     | `create` (token), `create_native`                |
//! | Confirmation | `confirm_completion`                             |
//! | Attestation  | `approve`, `reject`                              |
//! | Expiry       | `resolve_expired` (permissionless)               |
//! | Queries      | `get`, `commitments_by_creator`, `commitments_by_validator`, `count`, `custody`, `native_asset` |
//!
//! ## Architecture
//!
//! Storage access is delegated to [`storage`], asset movement to [`asset`] and
//! event emission to [`events`]. This file holds the entry points and the
//! status-machine rules.
//!
//! A Soroban invocation is all-or-nothing, so the status write and the stake
//! transfer in every transition commit together or not at all. Two racing
//! transitions on the same commitment serialize on the ledger; the second one
//! sees the advanced status and fails with [`Error::InvalidState`].

#![no_std]

#[cfg(test)]
extern crate std;

use soroban_sdk::{contract, contracterror, contractimpl, Address, Env, String, Vec};

mod asset;
mod events;
mod storage;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;

pub use events::{CommitmentCreated, CommitmentResolved, CompletionConfirmed};
pub use types::{Asset, Commitment, CommitmentStatus, Outcome, VALIDATION_WINDOW};

use types::{CommitmentState, CommitmentTerms};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Stake must be strictly positive.
    InvalidAmount = 1,
    /// Deadline must be strictly in the future.
    InvalidDeadline = 2,
    /// A party address cannot be the vault itself.
    InvalidAddress = 3,
    InsufficientFunds = 4,
    /// The vault was not allowed to pull the token stake.
    InsufficientAllowance = 5,
    /// Caller is not the creator/validator the operation requires.
    Unauthorized = 6,
    /// Transition is illegal from the current status.
    InvalidState = 7,
    /// Confirmation attempted at or after the deadline.
    Expired = 8,
    /// Neither expiry rule applies yet.
    NotYetResolvable = 9,
    NotFound = 10,
    AlreadyInitialized = 11,
    NotInitialized = 12,
}

#[contract]
pub struct CommitmentVault;

#[contractimpl]
impl CommitmentVault {
    // ─────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────

    /// Record the asset contract of the network's native coin.
    ///
    /// Must be called once after deployment; native stakes fail with
    /// `NotInitialized` until it is.
    pub fn init(env: Env, native_asset: Address) -> Result<(), Error> {
        if storage::has_native_asset(&env) {
            return Err(Error::AlreadyInitialized);
        }
        storage::set_native_asset(&env, &native_asset);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────

    /// Stake `amount` of `token` against a promise due before `deadline`.
    ///
    /// `creator` must have approved the vault to spend at least `amount`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        env: Env,
        creator: Address,
        validator: Address,
        charity: Address,
        token: Address,
        amount: i128,
        deadline: u64,
        description: String,
    ) -> Result<u64, Error> {
        open(
            &env,
            creator,
            validator,
            charity,
            Asset::Token(token),
            amount,
            deadline,
            description,
        )
    }

    /// Stake `amount` of the native coin; the creator's signature on the
    /// transfer is the attached value.
    pub fn create_native(
        env: Env,
        creator: Address,
        validator: Address,
        charity: Address,
        amount: i128,
        deadline: u64,
        description: String,
    ) -> Result<u64, Error> {
        open(
            &env,
            creator,
            validator,
            charity,
            Asset::Native,
            amount,
            deadline,
            description,
        )
    }

    // ─────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────

    /// Creator claims completion. Opens the validator's 24h window.
    pub fn confirm_completion(env: Env, caller: Address, id: u64) -> Result<Commitment, Error> {
        caller.require_auth();
        let terms = storage::load_terms(&env, id)?;
        let mut state = storage::load_state(&env, id)?;

        if caller != terms.creator {
            return Err(Error::Unauthorized);
        }
        if state.status != CommitmentStatus::Active {
            return Err(Error::InvalidState);
        }
        let now = env.ledger().timestamp();
        if now >= terms.deadline {
            return Err(Error::Expired);
        }

        state.confirmation_time = now;
        state.validator_deadline = now + VALIDATION_WINDOW;
        state.status = CommitmentStatus::PendingValidation;
        storage::save_state(&env, id, &state);

        events::emit_confirmed(&env, id, state.confirmation_time, state.validator_deadline);
        Ok(Commitment::from_parts(terms, state))
    }

    /// Validator accepts the completion claim; the stake returns to the creator.
    pub fn approve(env: Env, caller: Address, id: u64) -> Result<Commitment, Error> {
        attest(&env, caller, id, Outcome::Success)
    }

    /// Validator refuses the completion claim; the stake goes to the charity.
    pub fn reject(env: Env, caller: Address, id: u64) -> Result<Commitment, Error> {
        attest(&env, caller, id, Outcome::Failed)
    }

    /// Apply the expiry rules. Anyone may call this.
    ///
    /// - `Active` at or past `deadline`: the creator never confirmed.
    /// - `PendingValidation` at or past `validator_deadline`: validator silence.
    ///
    /// Both resolve as `Failed` with the stake sent to the charity.
    pub fn resolve_expired(env: Env, id: u64) -> Result<Commitment, Error> {
        let terms = storage::load_terms(&env, id)?;
        let state = storage::load_state(&env, id)?;
        let now = env.ledger().timestamp();

        match state.status {
            CommitmentStatus::Resolved => Err(Error::InvalidState),
            CommitmentStatus::Active if now >= terms.deadline => {
                settle(&env, terms, state, Outcome::Failed)
            }
            CommitmentStatus::PendingValidation if now >= state.validator_deadline => {
                settle(&env, terms, state, Outcome::Failed)
            }
            _ => Err(Error::NotYetResolvable),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get(env: Env, id: u64) -> Result<Commitment, Error> {
        storage::load_commitment(&env, id)
    }

    pub fn commitments_by_creator(env: Env, creator: Address) -> Vec<u64> {
        storage::ids_by_creator(&env, creator)
    }

    pub fn commitments_by_validator(env: Env, validator: Address) -> Vec<u64> {
        storage::ids_by_validator(&env, validator)
    }

    /// Number of commitments ever created; also the highest assigned ID.
    pub fn count(env: Env) -> u64 {
        storage::commitment_count(&env)
    }

    /// Total unresolved stake held for `asset`.
    pub fn custody(env: Env, asset: Asset) -> Result<i128, Error> {
        let address = asset::contract_address(&env, &asset)?;
        Ok(storage::custody(&env, &address))
    }

    pub fn native_asset(env: Env) -> Result<Address, Error> {
        storage::native_asset(&env)
    }
}

#[allow(clippy::too_many_arguments)]
fn open(
    env: &Env,
    creator: Address,
    validator: Address,
    charity: Address,
    asset: Asset,
    amount: i128,
    deadline: u64,
    description: String,
) -> Result<u64, Error> {
    creator.require_auth();

    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    let now = env.ledger().timestamp();
    if deadline <= now {
        return Err(Error::InvalidDeadline);
    }
    let vault = env.current_contract_address();
    if creator == vault || validator == vault || charity == vault {
        return Err(Error::InvalidAddress);
    }

    asset::pull_stake(env, &asset, &creator, amount)?;

    let terms = CommitmentTerms {
        id: storage::next_commitment_id(env),
        creator,
        validator,
        charity,
        asset,
        amount,
        deadline,
        created_at: now,
        description,
    };
    storage::save_commitment(env, &terms, &CommitmentState::active());
    events::emit_created(env, &terms);

    Ok(terms.id)
}

fn attest(env: &Env, caller: Address, id: u64, outcome: Outcome) -> Result<Commitment, Error> {
    caller.require_auth();
    let terms = storage::load_terms(env, id)?;
    let state = storage::load_state(env, id)?;

    if caller != terms.validator {
        return Err(Error::Unauthorized);
    }
    if state.status != CommitmentStatus::PendingValidation {
        return Err(Error::InvalidState);
    }

    settle(env, terms, state, outcome)
}

/// Write the terminal status and outcome, then release the stake to the
/// single recipient the outcome selects.
fn settle(
    env: &Env,
    terms: CommitmentTerms,
    mut state: CommitmentState,
    outcome: Outcome,
) -> Result<Commitment, Error> {
    state.status = CommitmentStatus::Resolved;
    state.outcome = outcome;
    storage::save_state(env, terms.id, &state);

    let recipient = if outcome == Outcome::Success {
        terms.creator.clone()
    } else {
        terms.charity.clone()
    };
    asset::release_stake(env, &terms.asset, &recipient, terms.amount)?;

    let commitment = Commitment::from_parts(terms, state);
    events::emit_resolved(env, &commitment, &recipient);
    Ok(commitment)
}
