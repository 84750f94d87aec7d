//! # Storage
//!
//! Provides typed helpers over Soroban's two storage tiers used by the vault:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key               | Type      | Description                          |
//! |-------------------|-----------|--------------------------------------|
//! | `CommitmentCount` | `u64`     | Highest commitment ID assigned       |
//! | `NativeAsset`     | `Address` | Asset contract of the native coin    |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                  | Type              | Description                     |
//! |----------------------|-------------------|---------------------------------|
//! | `Terms(id)`          | `CommitmentTerms` | Immutable commitment terms      |
//! | `State(id)`          | `CommitmentState` | Mutable status/outcome/times    |
//! | `ByCreator(addr)`    | `Vec<u64>`        | IDs created by `addr`           |
//! | `ByValidator(addr)`  | `Vec<u64>`        | IDs validated by `addr`         |
//! | `Custody(token)`     | `i128`            | Stake held per asset contract   |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::types::{Commitment, CommitmentState, CommitmentTerms};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Highest assigned commitment ID (Instance).
    CommitmentCount,
    /// Asset contract address of the native coin (Instance).
    NativeAsset,
    /// Immutable commitment terms keyed by ID (Persistent).
    Terms(u64),
    /// Mutable commitment state keyed by ID (Persistent).
    State(u64),
    /// Commitment IDs per creator (Persistent).
    ByCreator(Address),
    /// Commitment IDs per validator (Persistent).
    ByValidator(Address),
    /// Stake currently held for an asset contract (Persistent).
    Custody(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

/// Reads, increments, and stores the commitment counter.
/// Returns the ID for the new commitment (post-increment value, so IDs start at 1).
pub fn next_commitment_id(env: &Env) -> u64 {
    bump_instance(env);
    let next = commitment_count(env) + 1;
    env.storage()
        .instance()
        .set(&DataKey::CommitmentCount, &next);
    next
}

/// Number of commitments ever created.
pub fn commitment_count(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::CommitmentCount)
        .unwrap_or(0)
}

pub fn has_native_asset(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::NativeAsset)
}

pub fn set_native_asset(env: &Env, native: &Address) {
    env.storage().instance().set(&DataKey::NativeAsset, native);
    bump_instance(env);
}

pub fn native_asset(env: &Env) -> Result<Address, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::NativeAsset)
        .ok_or(Error::NotInitialized)
}

// ── Persistent Storage Helpers ───────────────────────────────────────

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

/// Save the immutable terms and the initial state of a new commitment,
/// and index it under its creator and validator.
pub fn save_commitment(env: &Env, terms: &CommitmentTerms, state: &CommitmentState) {
    let terms_key = DataKey::Terms(terms.id);
    env.storage().persistent().set(&terms_key, terms);
    bump_persistent(env, &terms_key);

    save_state(env, terms.id, state);

    push_index(env, DataKey::ByCreator(terms.creator.clone()), terms.id);
    push_index(env, DataKey::ByValidator(terms.validator.clone()), terms.id);
}

/// Load the full `Commitment` by combining terms and state.
pub fn load_commitment(env: &Env, id: u64) -> Result<Commitment, Error> {
    let terms = load_terms(env, id)?;
    let state = load_state(env, id)?;
    Ok(Commitment::from_parts(terms, state))
}

pub fn load_terms(env: &Env, id: u64) -> Result<CommitmentTerms, Error> {
    let key = DataKey::Terms(id);
    let terms: CommitmentTerms = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::NotFound)?;
    bump_persistent(env, &key);
    Ok(terms)
}

pub fn load_state(env: &Env, id: u64) -> Result<CommitmentState, Error> {
    let key = DataKey::State(id);
    let state: CommitmentState = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::NotFound)?;
    bump_persistent(env, &key);
    Ok(state)
}

/// Save only the mutable state (confirmation and resolution).
pub fn save_state(env: &Env, id: u64, state: &CommitmentState) {
    let key = DataKey::State(id);
    env.storage().persistent().set(&key, state);
    bump_persistent(env, &key);
}

// ── Indexes ──────────────────────────────────────────────────────────

fn push_index(env: &Env, key: DataKey, id: u64) {
    let mut ids = load_index(env, &key);
    ids.push_back(id);
    env.storage().persistent().set(&key, &ids);
    bump_persistent(env, &key);
}

fn load_index(env: &Env, key: &DataKey) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(key)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn ids_by_creator(env: &Env, creator: Address) -> Vec<u64> {
    load_index(env, &DataKey::ByCreator(creator))
}

pub fn ids_by_validator(env: &Env, validator: Address) -> Vec<u64> {
    load_index(env, &DataKey::ByValidator(validator))
}

// ── Custody ──────────────────────────────────────────────────────────

pub fn custody(env: &Env, token: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Custody(token.clone()))
        .unwrap_or(0)
}

/// Adjust the tracked custody balance for `token` by `delta`.
pub fn adjust_custody(env: &Env, token: &Address, delta: i128) {
    let key = DataKey::Custody(token.clone());
    let updated = custody(env, token) + delta;
    env.storage().persistent().set(&key, &updated);
    bump_persistent(env, &key);
}
