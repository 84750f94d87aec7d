//! Off-ledger side of the commitment vault.
//!
//! * [`submitter`] prices, signs and confirms ledger-mutating calls, routing
//!   faucet claims through the sponsor relay when one is configured.
//! * [`vault`] and [`asset`] are typed clients for the vault contract and the
//!   token interface.
//! * [`projector`] turns a record into display status and a timeline.
//! * [`sponsor`] and [`api`] make up the HTTP service.

pub mod api;
pub mod asset;
pub mod commitment;
pub mod config;
pub mod db;
pub mod errors;
pub mod fees;
pub mod ledger;
pub mod projector;
pub mod relay;
pub mod rpc;
pub mod scval;
pub mod signer;
pub mod sponsor;
pub mod submitter;
pub mod vault;
pub mod xdr;

#[cfg(test)]
mod testing;
