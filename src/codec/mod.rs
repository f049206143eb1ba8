//! Wire codec, call hashing and multisig address derivation
//!
//! - **scale** - compact integers and the handful of SCALE shapes calls use
//! - **hashing** - call hashes and deterministic multisig account ids

pub mod hashing;
pub mod scale;

pub use hashing::{call_hash, derive_multisig_account_id, MULTISIG_DERIVATION_PREFIX};
pub use scale::ScaleReader;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Codec-specific error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Invalid compact prefix 0x{0:02x}")]
    InvalidCompact(u8),

    #[error("Invalid {what} variant {value}")]
    InvalidVariant { what: &'static str, value: u8 },

    #[error("Compact value {value} does not fit in {target}")]
    Overflow { target: &'static str, value: u128 },

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}
