//! Application-wide error types.
//!
//! Every failure is classified into an [`ErrorKind`] so callers can decide
//! whether to surface it verbatim, offer a retry, or fall back.

use serde::Serialize;
use thiserror::Error;

/// Failure taxonomy shared by the submitter, the relay and the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed address, non-positive amount, past deadline.
    Validation,
    /// Caller is not the creator/validator the operation requires.
    Authorization,
    /// Transition illegal from the current status.
    State,
    /// Balance or allowance too low.
    Funds,
    /// RPC failure, dropped transaction, confirmation timeout. Retryable.
    Network,
    /// Missing or invalid configuration (including an unconfigured relay).
    Configuration,
    /// The sponsor relay refused a repeat request inside its cooldown.
    RateLimited,
    Internal,
}

/// Error codes returned by the commitment vault contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractError {
    InvalidAmount,
    InvalidDeadline,
    InvalidAddress,
    InsufficientFunds,
    InsufficientAllowance,
    Unauthorized,
    InvalidState,
    Expired,
    NotYetResolvable,
    NotFound,
    AlreadyInitialized,
    NotInitialized,
}

impl ContractError {
    /// Map a `#[contracterror]` discriminant back to its variant.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::InvalidAmount,
            2 => Self::InvalidDeadline,
            3 => Self::InvalidAddress,
            4 => Self::InsufficientFunds,
            5 => Self::InsufficientAllowance,
            6 => Self::Unauthorized,
            7 => Self::InvalidState,
            8 => Self::Expired,
            9 => Self::NotYetResolvable,
            10 => Self::NotFound,
            11 => Self::AlreadyInitialized,
            12 => Self::NotInitialized,
            _ => return None,
        })
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidAmount => 1,
            Self::InvalidDeadline => 2,
            Self::InvalidAddress => 3,
            Self::InsufficientFunds => 4,
            Self::InsufficientAllowance => 5,
            Self::Unauthorized => 6,
            Self::InvalidState => 7,
            Self::Expired => 8,
            Self::NotYetResolvable => 9,
            Self::NotFound => 10,
            Self::AlreadyInitialized => 11,
            Self::NotInitialized => 12,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount | Self::InvalidDeadline | Self::InvalidAddress => {
                ErrorKind::Validation
            }
            Self::InsufficientFunds | Self::InsufficientAllowance => ErrorKind::Funds,
            Self::Unauthorized => ErrorKind::Authorization,
            Self::InvalidState | Self::Expired | Self::NotYetResolvable | Self::NotFound => {
                ErrorKind::State
            }
            Self::AlreadyInitialized | Self::NotInitialized => ErrorKind::Configuration,
        }
    }

    /// The failing precondition, phrased for end users.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "amount must be greater than zero",
            Self::InvalidDeadline => "deadline must be in the future",
            Self::InvalidAddress => "validator and charity must be valid external addresses",
            Self::InsufficientFunds => "balance is lower than the stake",
            Self::InsufficientAllowance => "the vault is not approved to move the stake",
            Self::Unauthorized => "caller is not permitted to perform this action",
            Self::InvalidState => "commitment is not in the required status",
            Self::Expired => "the commitment deadline has passed",
            Self::NotYetResolvable => "commitment cannot be resolved as expired yet",
            Self::NotFound => "commitment does not exist",
            Self::AlreadyInitialized => "vault is already initialized",
            Self::NotInitialized => "vault has no native asset configured",
        }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self, self.describe())
    }
}

/// Error codes returned by the test faucet contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaucetError {
    AlreadyInitialized,
    NotInitialized,
    InvalidAmount,
}

impl FaucetError {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::AlreadyInitialized,
            2 => Self::NotInitialized,
            3 => Self::InvalidAmount,
            _ => return None,
        })
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::AlreadyInitialized => 1,
            Self::NotInitialized => 2,
            Self::InvalidAmount => 3,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInitialized | Self::NotInitialized => ErrorKind::Configuration,
            Self::InvalidAmount => ErrorKind::Validation,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "faucet is already initialized",
            Self::NotInitialized => "faucet has not been initialized",
            Self::InvalidAmount => "mint amount must be greater than zero",
        }
    }
}

/// Which contract a call targets, and so which table its error codes are
/// read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractKind {
    Vault,
    Faucet,
    #[default]
    Other,
}

impl ContractKind {
    pub fn decode(self, code: u32) -> Rejection {
        let known = match self {
            Self::Vault => ContractError::from_code(code).map(Rejection::Vault),
            Self::Faucet => FaucetError::from_code(code).map(Rejection::Faucet),
            Self::Other => None,
        };
        known.unwrap_or(Rejection::Other { code })
    }
}

/// A call a contract refused with one of its `#[contracterror]` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Vault(ContractError),
    Faucet(FaucetError),
    /// A contract whose codes the gateway does not know, such as a token.
    Other { code: u32 },
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Vault(e) => e.kind(),
            Self::Faucet(e) => e.kind(),
            Self::Other { .. } => ErrorKind::Internal,
        }
    }
}

impl From<ContractError> for Rejection {
    fn from(e: ContractError) -> Self {
        Self::Vault(e)
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vault(e) => write!(f, "{e}"),
            Self::Faucet(e) => write!(f, "faucet {:?}: {}", e, e.describe()),
            Self::Other { code } => write!(f, "contract error #{code}"),
        }
    }
}

/// Extract the raw contract error code from a host error message such as
/// `HostError: Error(Contract, #7)`.
pub fn host_error_code(message: &str) -> Option<u32> {
    const MARKER: &str = "Error(Contract, #";
    let start = message.find(MARKER)? + MARKER.len();
    let digits: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Funds error: {0}")]
    Funds(String),

    #[error("Ledger rejected the call: {0}")]
    Contract(Rejection),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction {hash} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { hash: String, waited_secs: u64 },

    #[error("Transaction {hash} failed on ledger: {detail}")]
    TransactionFailed {
        hash: String,
        detail: String,
        code: Option<Rejection>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{address} was sponsored recently; retry in {retry_after_secs}s")]
    Cooldown {
        address: String,
        retry_after_secs: u64,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::State(_) => ErrorKind::State,
            Self::Funds(_) => ErrorKind::Funds,
            Self::Contract(code) => code.kind(),
            Self::TransactionFailed { code: Some(code), .. } => code.kind(),
            Self::Network(_)
            | Self::ConfirmationTimeout { .. }
            | Self::TransactionFailed { code: None, .. }
            | Self::Http(_) => ErrorKind::Network,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Cooldown { .. } => ErrorKind::RateLimited,
            Self::Database(_)
            | Self::Migrate(_)
            | Self::Json(_)
            | Self::Xdr(_)
            | Self::Decode(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Network failures may succeed on resubmission; nothing else will
    /// change by trying again with the same inputs.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_codes_round_trip_the_vault_enum() {
        assert_eq!(ContractError::from_code(1), Some(ContractError::InvalidAmount));
        assert_eq!(ContractError::from_code(7), Some(ContractError::InvalidState));
        assert_eq!(ContractError::from_code(12), Some(ContractError::NotInitialized));
        assert_eq!(ContractError::from_code(0), None);
        assert_eq!(ContractError::from_code(13), None);
    }

    #[test]
    fn codes_match_their_discriminants() {
        for code in 1..=12 {
            assert_eq!(ContractError::from_code(code).unwrap().code(), code);
        }
        for code in 1..=3 {
            assert_eq!(FaucetError::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn host_message_parsing() {
        let msg = "HostError: Error(Contract, #6)\n\nEvent log (newest first): ...";
        assert_eq!(host_error_code(msg), Some(6));
        assert_eq!(host_error_code("Error(Contract, #10)"), Some(10));
        assert_eq!(host_error_code("Error(Budget, ExceededLimit)"), None);
    }

    #[test]
    fn codes_are_read_against_the_failing_contract() {
        assert_eq!(
            ContractKind::Vault.decode(2),
            Rejection::Vault(ContractError::InvalidDeadline)
        );
        let faucet = ContractKind::Faucet.decode(2);
        assert_eq!(faucet, Rejection::Faucet(FaucetError::NotInitialized));
        assert_eq!(faucet.kind(), ErrorKind::Configuration);
        assert_eq!(
            ContractKind::Faucet.decode(3).kind(),
            ErrorKind::Validation
        );
        assert_eq!(ContractKind::Other.decode(2), Rejection::Other { code: 2 });
        assert_eq!(ContractKind::Vault.decode(40), Rejection::Other { code: 40 });
        assert_eq!(
            GatewayError::Contract(ContractKind::Other.decode(10)).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn taxonomy() {
        assert_eq!(
            GatewayError::Contract(ContractError::InvalidDeadline.into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GatewayError::Contract(ContractError::InsufficientAllowance.into()).kind(),
            ErrorKind::Funds
        );
        assert_eq!(
            GatewayError::Contract(ContractError::Unauthorized.into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            GatewayError::Contract(ContractError::Expired.into()).kind(),
            ErrorKind::State
        );
        let failed = GatewayError::TransactionFailed {
            hash: "ab".into(),
            detail: "lost race".into(),
            code: Some(ContractError::InvalidState.into()),
        };
        assert_eq!(failed.kind(), ErrorKind::State);
        assert!(!failed.is_retryable());

        let timeout = GatewayError::ConfirmationTimeout {
            hash: "ab".into(),
            waited_secs: 60,
        };
        assert!(timeout.is_retryable());
        assert_eq!(GatewayError::Config("x".into()).kind(), ErrorKind::Configuration);
    }
}
