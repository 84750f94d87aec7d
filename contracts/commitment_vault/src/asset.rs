//! Asset boundary.
//!
//! Every stake moves through the standard token interface. The native coin is
//! reached through its asset contract, recorded once by `init`; fungible
//! tokens carry their own contract address. Callers resolve an [`Asset`] here
//! exactly once per operation and never branch on the variant elsewhere.

use soroban_sdk::{token, Address, Env};

use crate::storage;
use crate::types::Asset;
use crate::Error;

/// Address of the token contract that moves `asset`.
pub fn contract_address(env: &Env, asset: &Asset) -> Result<Address, Error> {
    match asset {
        Asset::Native => storage::native_asset(env),
        Asset::Token(address) => Ok(address.clone()),
    }
}

pub fn client<'a>(env: &'a Env, asset: &Asset) -> Result<token::Client<'a>, Error> {
    let address = contract_address(env, asset)?;
    Ok(token::Client::new(env, &address))
}

/// Move `amount` from `from` into vault custody.
///
/// Native stakes are pulled with a direct transfer authorized by `from`.
/// Token stakes are pulled with `transfer_from`, spending an allowance that
/// `from` granted the vault beforehand.
pub fn pull_stake(env: &Env, asset: &Asset, from: &Address, amount: i128) -> Result<(), Error> {
    let token = client(env, asset)?;
    let vault = env.current_contract_address();

    if token.balance(from) < amount {
        return Err(Error::InsufficientFunds);
    }

    match asset {
        Asset::Native => token.transfer(from, &vault, &amount),
        Asset::Token(_) => {
            if token.allowance(from, &vault) < amount {
                return Err(Error::InsufficientAllowance);
            }
            token.transfer_from(&vault, from, &vault, &amount);
        }
    }

    storage::adjust_custody(env, &token.address, amount);
    Ok(())
}

/// Release `amount` from vault custody to `to`.
pub fn release_stake(env: &Env, asset: &Asset, to: &Address, amount: i128) -> Result<(), Error> {
    let token = client(env, asset)?;
    token.transfer(&env.current_contract_address(), to, &amount);
    storage::adjust_custody(env, &token.address, -amount);
    Ok(())
}
