//! # Test Faucet Contract
//!
//! Hands out a fixed allocation of a test stake asset. The faucet is the admin
//! of a Stellar Asset Contract and mints on request:
//!
//! | Entry Point | Signer        | Effect                                  |
//! |-------------|---------------|-----------------------------------------|
//! | `init`      | `admin`       | Record the admin and the managed token  |
//! | `faucet`    | recipient     | Mint [`ALLOCATION`] to the recipient    |
//! | `mint`      | admin         | Mint any amount to any address          |
//!
//! `mint` is what the sponsor relay calls with its own key, so a user can be
//! funded without holding any native coin for fees.

#![no_std]

#[cfg(test)]
extern crate std;

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env,
};


/// Fixed faucet allocation: 1,000 whole units at 7 decimals.
pub const ALLOCATION: i128 = 1_000 * 10_000_000;

const DAY_IN_LEDGERS: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidAmount = 3,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum DataKey {
    Admin,
    Token,
}

#[contract]
pub struct TestFaucet;

#[contractimpl]
impl TestFaucet {
    /// Record `admin` and the asset contract this faucet administers.
    ///
    /// The asset's admin must be handed to this contract separately
    /// (`set_admin` on the asset contract).
    pub fn init(env: Env, admin: Address, token: Address) -> Result<(), Error> {
        admin.require_auth();
        let storage = env.storage().instance();
        if storage.has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        storage.set(&DataKey::Admin, &admin);
        storage.set(&DataKey::Token, &token);
        bump_instance(&env);
        Ok(())
    }

    /// Mint the fixed allocation to `to`, who signs the request.
    pub fn faucet(env: Env, to: Address) -> Result<i128, Error> {
        to.require_auth();
        mint_to(&env, &to, ALLOCATION)?;
        Ok(ALLOCATION)
    }

    /// Admin-signed mint of `amount` to `to`.
    pub fn mint(env: Env, to: Address, amount: i128) -> Result<(), Error> {
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        load(&env, &DataKey::Admin)?.require_auth();
        mint_to(&env, &to, amount)
    }

    pub fn token(env: Env) -> Result<Address, Error> {
        load(&env, &DataKey::Token)
    }

    pub fn allocation(_env: Env) -> i128 {
        ALLOCATION
    }
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

fn load(env: &Env, key: &DataKey) -> Result<Address, Error> {
    bump_instance(env);
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

fn mint_to(env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
    let token = load(env, &DataKey::Token)?;
    token::StellarAssetClient::new(env, &token).mint(to, &amount);
    env.events()
        .publish((symbol_short!("dripped"), to.clone()), amount);
    Ok(())
}
