//! Minimal SCALE codec
//!
//! Only the shapes the engine's calls need: compact integers, little-endian
//! fixed integers, length-prefixed vectors, `Option` and `MultiAddress::Id`.

use byteorder::{ByteOrder, LittleEndian};

use super::{CodecError, CodecResult};
use crate::types::{AccountId, CallHash, Timepoint, Weight};

const COMPACT_SINGLE_MAX: u128 = 0x40;
const COMPACT_TWO_MAX: u128 = 0x4000;
const COMPACT_FOUR_MAX: u128 = 0x4000_0000;

/// `MultiAddress` variant tag for a plain account id
pub const MULTI_ADDRESS_ID: u8 = 0x00;

/// Append a compact-encoded integer
pub fn encode_compact(value: u128, out: &mut Vec<u8>) {
    if value < COMPACT_SINGLE_MAX {
        out.push((value as u8) << 2);
    } else if value < COMPACT_TWO_MAX {
        let v = ((value as u16) << 2) | 0b01;
        out.extend_from_slice(&v.to_le_bytes());
    } else if value < COMPACT_FOUR_MAX {
        let v = ((value as u32) << 2) | 0b10;
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        let bytes_needed = ((128 - value.leading_zeros() + 7) / 8) as u8;
        out.push(((bytes_needed - 4) << 2) | 0b11);
        out.extend_from_slice(&value.to_le_bytes()[..bytes_needed as usize]);
    }
}

pub fn encode_compact_len(len: usize, out: &mut Vec<u8>) {
    encode_compact(len as u128, out);
}

/// Length-prefixed byte vector
pub fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
    encode_compact_len(data.len(), out);
    out.extend_from_slice(data);
}

pub fn encode_account_ids(ids: &[AccountId], out: &mut Vec<u8>) {
    encode_compact_len(ids.len(), out);
    for id in ids {
        out.extend_from_slice(id.as_bytes());
    }
}

pub fn encode_multi_address(id: &AccountId, out: &mut Vec<u8>) {
    out.push(MULTI_ADDRESS_ID);
    out.extend_from_slice(id.as_bytes());
}

pub fn encode_timepoint(timepoint: &Timepoint, out: &mut Vec<u8>) {
    out.extend_from_slice(&timepoint.height.to_le_bytes());
    out.extend_from_slice(&timepoint.index.to_le_bytes());
}

pub fn encode_weight(weight: &Weight, out: &mut Vec<u8>) {
    encode_compact(weight.ref_time as u128, out);
    encode_compact(weight.proof_size as u128, out);
}

/// `Option<T>`: `0x00` for none, `0x01` followed by the value
pub fn encode_option<T>(value: Option<&T>, out: &mut Vec<u8>, encode: impl FnOnce(&T, &mut Vec<u8>)) {
    match value {
        None => out.push(0),
        Some(inner) => {
            out.push(1);
            encode(inner, out);
        }
    }
}

/// Cursor over SCALE-encoded bytes
#[derive(Debug, Clone)]
pub struct ScaleReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ScaleReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes not yet consumed, without advancing
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Consume everything left
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.rest();
        self.position = self.data.len();
        rest
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_u128(&mut self) -> CodecResult<u128> {
        Ok(LittleEndian::read_u128(self.read_bytes(16)?))
    }

    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidVariant {
                what: "bool",
                value: other,
            }),
        }
    }

    pub fn read_compact(&mut self) -> CodecResult<u128> {
        let first = self.read_u8()?;
        match first & 0b11 {
            0b00 => Ok((first >> 2) as u128),
            0b01 => {
                let second = self.read_u8()?;
                Ok((LittleEndian::read_u16(&[first, second]) >> 2) as u128)
            }
            0b10 => {
                let tail = self.read_bytes(3)?;
                let raw = LittleEndian::read_u32(&[first, tail[0], tail[1], tail[2]]);
                Ok((raw >> 2) as u128)
            }
            _ => {
                let len = ((first >> 2) + 4) as usize;
                if len > 16 {
                    return Err(CodecError::InvalidCompact(first));
                }
                let bytes = self.read_bytes(len)?;
                let mut buffer = [0u8; 16];
                buffer[..len].copy_from_slice(bytes);
                Ok(LittleEndian::read_u128(&buffer))
            }
        }
    }

    pub fn read_compact_u32(&mut self) -> CodecResult<u32> {
        let value = self.read_compact()?;
        u32::try_from(value).map_err(|_| CodecError::Overflow {
            target: "u32",
            value,
        })
    }

    pub fn read_compact_u64(&mut self) -> CodecResult<u64> {
        let value = self.read_compact()?;
        u64::try_from(value).map_err(|_| CodecError::Overflow {
            target: "u64",
            value,
        })
    }

    /// Compact length prefix, never more than the bytes left
    pub fn read_len(&mut self) -> CodecResult<usize> {
        let len = self.read_compact()?;
        if len > self.remaining() as u128 {
            return Err(CodecError::UnexpectedEof {
                needed: usize::try_from(len).unwrap_or(usize::MAX),
                remaining: self.remaining(),
            });
        }
        Ok(len as usize)
    }

    pub fn read_vec_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_account_id(&mut self) -> CodecResult<AccountId> {
        let bytes = self.read_bytes(AccountId::LEN)?;
        AccountId::from_slice(bytes).ok_or(CodecError::UnexpectedEof {
            needed: AccountId::LEN,
            remaining: bytes.len(),
        })
    }

    pub fn read_call_hash(&mut self) -> CodecResult<CallHash> {
        let bytes = self.read_bytes(CallHash::LEN)?;
        CallHash::from_slice(bytes).ok_or(CodecError::UnexpectedEof {
            needed: CallHash::LEN,
            remaining: bytes.len(),
        })
    }

    pub fn read_account_ids(&mut self) -> CodecResult<Vec<AccountId>> {
        let count = self.read_compact()?;
        if count.saturating_mul(AccountId::LEN as u128) > self.remaining() as u128 {
            return Err(CodecError::UnexpectedEof {
                needed: usize::try_from(count).unwrap_or(usize::MAX),
                remaining: self.remaining(),
            });
        }
        (0..count).map(|_| self.read_account_id()).collect()
    }

    /// `MultiAddress`; only the `Id` variant is accepted
    pub fn read_multi_address(&mut self) -> CodecResult<AccountId> {
        match self.read_u8()? {
            MULTI_ADDRESS_ID => self.read_account_id(),
            other => Err(CodecError::InvalidVariant {
                what: "MultiAddress",
                value: other,
            }),
        }
    }

    pub fn read_timepoint(&mut self) -> CodecResult<Timepoint> {
        let height = self.read_u32()?;
        let index = self.read_u32()?;
        Ok(Timepoint::new(height, index))
    }

    pub fn read_weight(&mut self) -> CodecResult<Weight> {
        Ok(Weight {
            ref_time: self.read_compact_u64()?,
            proof_size: self.read_compact_u64()?,
        })
    }

    pub fn read_option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> CodecResult<T>,
    ) -> CodecResult<Option<T>> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => read(self).map(Some),
            other => Err(CodecError::InvalidVariant {
                what: "Option",
                value: other,
            }),
        }
    }
}
