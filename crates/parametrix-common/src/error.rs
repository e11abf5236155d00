//! Error types for Parametrix
//!
//! Two layers:
//! - [`LedgerError`]: the fixed result-code taxonomy returned by every ledger entry point
//! - [`ParametrixError`]: unified error for the host, orchestrator and tooling around the ledgers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using ParametrixError
pub type Result<T> = std::result::Result<T, ParametrixError>;

/// Result type alias for ledger entry points
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Failure codes returned by ledger entry points.
///
/// The code is the whole error signal; a failed call leaves ledger state untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerError {
    /// Caller lacks the required privilege or ownership
    #[error("unauthorized")]
    Unauthorized,

    /// An argument fails a domain constraint
    #[error("invalid input")]
    InvalidInput,

    /// A referenced entity does not exist
    #[error("not found")]
    NotFound,

    /// Reserved for uniqueness constraints
    #[error("already exists")]
    AlreadyExists,

    /// Reserved for the value-transfer collaborator
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Reserved
    #[error("expired")]
    Expired,

    /// Ledger paused, or the entity state forbids the transition
    #[error("invalid state")]
    InvalidState,
}

impl LedgerError {
    /// Stable numeric code
    pub const fn code(self) -> u32 {
        match self {
            LedgerError::Unauthorized => 100,
            LedgerError::InvalidInput => 101,
            LedgerError::NotFound => 102,
            LedgerError::AlreadyExists => 103,
            LedgerError::InsufficientFunds => 104,
            LedgerError::Expired => 105,
            LedgerError::InvalidState => 106,
        }
    }

    /// Reverse of [`LedgerError::code`]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            100 => Some(LedgerError::Unauthorized),
            101 => Some(LedgerError::InvalidInput),
            102 => Some(LedgerError::NotFound),
            103 => Some(LedgerError::AlreadyExists),
            104 => Some(LedgerError::InsufficientFunds),
            105 => Some(LedgerError::Expired),
            106 => Some(LedgerError::InvalidState),
            _ => None,
        }
    }
}

/// Unified error type for Parametrix services
#[derive(Debug, Error)]
pub enum ParametrixError {
    // Ledger rejections
    #[error("Ledger rejected call: {0} (code {code})", code = .0.code())]
    Ledger(#[from] LedgerError),

    // Trigger condition evaluation errors
    #[error("Condition error: {0}")]
    Condition(String),

    // Value transfer errors
    #[error("Payout error: {0}")]
    Payout(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Actor mailbox closed or reply dropped
    #[error("Channel error: {0}")]
    Channel(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ParametrixError {
    /// The ledger code, when this error is a ledger rejection
    pub fn ledger_code(&self) -> Option<LedgerError> {
        match self {
            ParametrixError::Ledger(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ParametrixError {
    fn from(err: serde_json::Error) -> Self {
        ParametrixError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ParametrixError {
    fn from(err: std::io::Error) -> Self {
        ParametrixError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for ParametrixError {
    fn from(err: anyhow::Error) -> Self {
        ParametrixError::Internal(err.to_string())
    }
}
