//! Call-data decoder
//!
//! Rebuilds a [`DecodedTransaction`] from raw bytes seen on chain, e.g. a
//! multisig call whose data arrives after its hash. Input is tried first as a
//! length-prefixed v4 extrinsic, then as bare call bytes.
//!
//! Calls the registry cannot resolve, or that have no argument parser, come
//! back with `tx_type == None` and no args instead of failing; only a known
//! call with malformed arguments is an error.

mod calls;

pub use crate::types::is_decoded_tx;

use tracing::debug;

use self::calls::CallDecoder;
use crate::chain::{CallRegistry, ChainApi};
use crate::codec::{CodecError, ScaleReader};
use crate::types::{AccountId, DecodedTransaction};

/// Result type for decoder operations
pub type DecoderResult<T> = Result<T, DecoderError>;

/// Decoder-specific error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecoderError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Malformed {section}.{method} arguments: {reason}")]
    Malformed {
        section: String,
        method: String,
        reason: String,
    },

    #[error("Calls nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("{0} trailing bytes after call")]
    TrailingBytes(usize),

    #[error("Empty call data")]
    Empty,
}

const EXTRINSIC_VERSION: u8 = 4;
const SIGNED_BIT: u8 = 0b1000_0000;

/// Envelope of a v4 extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExtrinsicHeader {
    signer: Option<AccountId>,
    call_offset: usize,
}

/// Parse the extrinsic envelope, `None` when `bytes` is not one
fn parse_extrinsic_header(bytes: &[u8]) -> Option<ExtrinsicHeader> {
    let mut reader = ScaleReader::new(bytes);
    let declared = reader.read_compact().ok()?;
    if declared != reader.remaining() as u128 {
        return None;
    }

    let version = reader.read_u8().ok()?;
    if version & !SIGNED_BIT != EXTRINSIC_VERSION {
        return None;
    }

    let signer = if version & SIGNED_BIT != 0 {
        let signer = reader.read_multi_address().ok()?;
        let signature_len = match reader.read_u8().ok()? {
            0 | 1 => 64,
            2 => 65,
            _ => return None,
        };
        reader.read_bytes(signature_len).ok()?;
        // Era: immortal is one zero byte, mortal is two bytes
        if reader.read_u8().ok()? != 0 {
            reader.read_u8().ok()?;
        }
        reader.read_compact().ok()?;
        reader.read_compact().ok()?;
        Some(signer)
    } else {
        None
    };

    Some(ExtrinsicHeader {
        signer,
        call_offset: reader.position(),
    })
}

fn decode_bare_call(
    decoder: &CallDecoder<'_>,
    call: &[u8],
    sender: AccountId,
) -> DecoderResult<DecodedTransaction> {
    let mut reader = ScaleReader::new(call);
    let decoded = decoder.decode_call(call, &mut reader, sender, 0)?;
    if !reader.is_empty() {
        return Err(DecoderError::TrailingBytes(reader.remaining()));
    }
    Ok(decoded)
}

/// Decode `bytes` sent by `sender` on `chain_id`
///
/// A signed extrinsic's own signer replaces `sender`.
pub fn decode(
    chain_id: &str,
    registry: &CallRegistry,
    sender: AccountId,
    bytes: &[u8],
) -> DecoderResult<DecodedTransaction> {
    if bytes.is_empty() {
        return Err(DecoderError::Empty);
    }
    let decoder = CallDecoder { chain_id, registry };

    if let Some(header) = parse_extrinsic_header(bytes) {
        let call = &bytes[header.call_offset..];
        match decode_bare_call(&decoder, call, header.signer.unwrap_or(sender)) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => debug!("Not an extrinsic ({}), decoding as bare call", e),
        }
    }

    decode_bare_call(&decoder, bytes, sender)
}

/// [`decode`] with the chain handle's id and registry
pub fn decode_with(
    chain: &dyn ChainApi,
    sender: AccountId,
    bytes: &[u8],
) -> DecoderResult<DecodedTransaction> {
    decode(chain.chain_id(), chain.registry(), sender, bytes)
}
