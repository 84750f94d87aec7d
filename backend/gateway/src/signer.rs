//! Signing capability and address handling.
//!
//! Whoever holds a [`Signer`] can authorize ledger calls as its address. The
//! gateway never assumes where the key lives: the sponsor relay loads one from
//! configuration, a wallet integration supplies its own implementation.

use ed25519_dalek::{Signer as _, SigningKey};
use stellar_strkey::{ed25519, Strkey};

use crate::errors::{GatewayError, Result};

pub trait Signer: Send + Sync {
    /// Account address (`G...`) of the signing key.
    fn address(&self) -> &str;

    /// Ed25519 signature over `payload`.
    fn sign(&self, payload: &[u8]) -> [u8; 64];
}

/// An in-process ed25519 keypair.
pub struct KeypairSigner {
    key: SigningKey,
    address: String,
}

impl KeypairSigner {
    /// Load a keypair from an `S...` secret seed.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let seed = ed25519::PrivateKey::from_string(secret.trim())
            .map_err(|_| GatewayError::Config("secret key is not a valid S... strkey".into()))?;
        Ok(Self::from_bytes(&seed.0))
    }

    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        let key = SigningKey::from_bytes(seed);
        let address = ed25519::PublicKey(key.verifying_key().to_bytes()).to_string();
        Self { key, address }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl Signer for KeypairSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, payload: &[u8]) -> [u8; 64] {
        self.key.sign(payload).to_bytes()
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Accept account (`G...`) and contract (`C...`) addresses.
pub fn validate_address(address: &str) -> Result<()> {
    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(_)) | Ok(Strkey::Contract(_)) => Ok(()),
        _ => Err(GatewayError::Validation(format!(
            "'{address}' is not a valid account or contract address"
        ))),
    }
}

/// Account address whose only purpose is to source read-only simulations.
pub fn simulation_source() -> String {
    ed25519::PublicKey([0; 32]).to_string()
}
