//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::errors::{GatewayError, Result};
use crate::fees::FeePolicy;
use crate::submitter::ConfirmationPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Soroban RPC endpoint (e.g. https://soroban-testnet.stellar.org)
    pub rpc_url: String,
    /// Network passphrase signed into every envelope
    pub network_passphrase: String,
    /// The commitment vault contract address (Strkey format)
    pub vault_contract_id: String,
    /// The test faucet contract address (Strkey format)
    pub faucet_contract_id: String,
    /// Secret key (`S...`) the sponsor relay signs with; relay disabled when unset
    pub sponsor_secret_key: Option<String>,
    /// Base URL of a sponsor relay, used by client-side faucet claims
    pub relay_url: Option<String>,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    pub fee_policy: FeePolicy,
    pub confirmation: ConfirmationPolicy,
    /// Minimum time between two sponsored faucet mints for one address
    pub sponsor_cooldown_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            optional(key).ok_or_else(|| {
                GatewayError::Config(format!("{key} environment variable is required"))
            })
        };

        Ok(Config {
            rpc_url: optional("RPC_URL")
                .unwrap_or_else(|| "https://soroban-testnet.stellar.org".to_string()),
            network_passphrase: optional("NETWORK_PASSPHRASE")
                .unwrap_or_else(|| "Test SDF Network ; September 2015".to_string()),
            vault_contract_id: required("VAULT_CONTRACT_ID")?,
            faucet_contract_id: required("FAUCET_CONTRACT_ID")?,
            sponsor_secret_key: optional("SPONSOR_SECRET_KEY"),
            relay_url: optional("RELAY_URL"),
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./sponsorships.db".to_string()),
            api_port: parse(&optional, "API_PORT", 3001)?,
            fee_policy: FeePolicy {
                headroom_percent: parse(&optional, "GAS_HEADROOM_PERCENT", 20)?,
                base_fee_multiplier: parse(&optional, "BASE_FEE_MULTIPLIER", 2)?,
                priority_fee_floor: parse(&optional, "PRIORITY_FEE_FLOOR", 100)?,
                flat_fee: parse(&optional, "FLAT_FEE", 100)?,
            },
            confirmation: ConfirmationPolicy {
                timeout: Duration::from_secs(parse(&optional, "CONFIRMATION_TIMEOUT_SECS", 60)?),
                poll_interval: Duration::from_millis(parse(
                    &optional,
                    "CONFIRMATION_POLL_MS",
                    1_000,
                )?),
            },
            sponsor_cooldown_secs: parse(&optional, "SPONSOR_COOLDOWN_SECS", 86_400)?,
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GatewayError::Config(format!("Invalid {key}: {raw}"))),
    }
}
