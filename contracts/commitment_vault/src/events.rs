//! Ledger events emitted on every state transition.
//!
//! Topics are `(symbol, commitment_id)`; the data is one of the structs below.

use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::types::{Asset, Commitment, CommitmentTerms, Outcome};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentCreated {
    pub id: u64,
    pub creator: Address,
    pub validator: Address,
    pub charity: Address,
    pub asset: Asset,
    pub amount: i128,
    pub deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletionConfirmed {
    pub id: u64,
    pub confirmation_time: u64,
    pub validator_deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommitmentResolved {
    pub id: u64,
    pub outcome: Outcome,
    pub recipient: Address,
    pub amount: i128,
}

pub fn emit_created(env: &Env, terms: &CommitmentTerms) {
    env.events().publish(
        (symbol_short!("created"), terms.id),
        CommitmentCreated {
            id: terms.id,
            creator: terms.creator.clone(),
            validator: terms.validator.clone(),
            charity: terms.charity.clone(),
            asset: terms.asset.clone(),
            amount: terms.amount,
            deadline: terms.deadline,
        },
    );
}

pub fn emit_confirmed(env: &Env, id: u64, confirmation_time: u64, validator_deadline: u64) {
    env.events().publish(
        (symbol_short!("confirmed"), id),
        CompletionConfirmed {
            id,
            confirmation_time,
            validator_deadline,
        },
    );
}

pub fn emit_resolved(env: &Env, commitment: &Commitment, recipient: &Address) {
    env.events().publish(
        (symbol_short!("resolved"), commitment.id),
        CommitmentResolved {
            id: commitment.id,
            outcome: commitment.outcome,
            recipient: recipient.clone(),
            amount: commitment.amount,
        },
    );
}
