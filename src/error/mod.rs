//! Error handling for the ledger
//!
//! Every fallible operation returns [`Result`]. Storage and decode failures are fatal for the
//! command that hit them; the remaining kinds are reported back to the caller with no state
//! written.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Open/read/write failure on the persistent store
    Database(String),
    /// A stored value failed to encode or decode
    Serialization(String),
    /// Requested amount exceeds the spendable balance
    InsufficientFunds { required: u64, available: u64 },
    /// A ledger is already present where one was about to be created
    AlreadyExists(String),
    /// No ledger (or no block) where one was expected
    NotFound(String),
    /// The nonce space was exhausted without meeting the target
    Mining(String),
    /// A submitted transaction failed its integrity check
    Transaction(String),
    /// Configuration errors
    Config(String),
}

impl BlockchainError {
    /// Fatal kinds abort the running command and are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BlockchainError::Database(_)
                | BlockchainError::Serialization(_)
                | BlockchainError::Mining(_)
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::AlreadyExists(msg) => write!(f, "Already exists: {msg}"),
            BlockchainError::NotFound(msg) => write!(f, "Not found: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
