use crate::types::{AccountId, CallHash, TransactionType};
use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Chain capability operations
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Call-data decoding errors
    #[error("Decoder error: {0}")]
    Decoder(String),

    /// Call data received for a multisig transaction does not hash to its call hash
    #[error("Call data mismatch: expected call hash {expected}, call data hashes to {actual}")]
    CallDataMismatch { expected: CallHash, actual: CallHash },

    /// Signatory set/threshold cannot produce a multisig account id
    #[error("Multisig derivation failed: {0}")]
    MultisigDerivation(String),

    /// Sender cannot cover fee and deposit
    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        required: u128,
        available: u128,
    },

    /// Transaction type cannot be encoded for this chain
    #[error("Unsupported transaction {tx_type:?}: {reason}")]
    UnsupportedTransaction {
        tx_type: TransactionType,
        reason: String,
    },

    /// Wrapper stack does not match the payload it wraps
    #[error("Invalid wrapper: {0}")]
    InvalidWrapper(String),

    /// Secure messaging delivery
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Schema migration failures
    #[error("Migration to version {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// Proxy worker task is gone or never answered
    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),
}

/// Chain capability error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Failed to establish a connection to the chain provider
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// No live handle for the chain
    #[error("Chain not connected: {chain_id}")]
    NotConnected { chain_id: String },

    /// Chain call failed (covers network errors, runtime rejections, etc.)
    #[error("Chain call failed: {method} - {message}")]
    CallFailed { method: String, message: String },

    /// Retry limit exceeded for chain operation
    #[error("Max retries exceeded: {operation}")]
    MaxRetriesExceeded { operation: String },

    /// Chain call timed out
    #[error("Request timeout: {timeout_seconds}s for {operation}")]
    Timeout {
        timeout_seconds: u64,
        operation: String,
    },

    /// Chain returned unexpected or malformed data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::ConnectionFailed(_)
                | ChainError::Timeout { .. }
                | ChainError::CallFailed { .. }
        )
    }
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for chain capability operations
pub type ChainResult<T> = Result<T, ChainError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<crate::decoder::DecoderError> for AppError {
    fn from(err: crate::decoder::DecoderError) -> Self {
        AppError::Decoder(err.to_string())
    }
}

impl From<crate::codec::CodecError> for AppError {
    fn from(err: crate::codec::CodecError) -> Self {
        AppError::InvalidData(format!("Codec error: {}", err))
    }
}
