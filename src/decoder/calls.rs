//! Per-call argument parsers
//!
//! Every parser reads exactly its call's arguments from the shared reader so
//! calls nested in batches, multisig and proxy wrappers line up.

use tracing::debug;

use super::{DecoderError, DecoderResult};
use crate::chain::CallRegistry;
use crate::codec::{derive_multisig_account_id, CodecError, ScaleReader};
use crate::types::{
    AccountId, CallArgs, DecodedTransaction, ProxyType, RewardDestination, TransactionType,
    TxPayload, Weight,
};

pub(super) const UNKNOWN: &str = "unknown";

/// Deepest chain of batch, multisig and proxy wrappers the decoder follows
pub(super) const MAX_NESTED_CALLS: usize = 16;

pub(super) struct CallDecoder<'r> {
    pub chain_id: &'r str,
    pub registry: &'r CallRegistry,
}

fn read_proxy_type(reader: &mut ScaleReader<'_>) -> DecoderResult<ProxyType> {
    let index = reader.read_u8()?;
    ProxyType::from_index(index).ok_or(DecoderError::Codec(
        CodecError::InvalidVariant {
            what: "ProxyType",
            value: index,
        },
    ))
}

fn read_reward_destination(reader: &mut ScaleReader<'_>) -> DecoderResult<RewardDestination> {
    let payee = match reader.read_u8()? {
        0 => RewardDestination::Staked,
        1 => RewardDestination::Stash,
        2 => RewardDestination::Controller,
        3 => RewardDestination::Account(reader.read_account_id()?),
        4 => RewardDestination::None,
        other => {
            return Err(DecoderError::Codec(CodecError::InvalidVariant {
                what: "RewardDestination",
                value: other,
            }))
        }
    };
    Ok(payee)
}

/// Sender of the call an `asMulti` dispatches: the multisig account itself
fn multisig_origin(sender: AccountId, others: &[AccountId], threshold: u16) -> AccountId {
    let mut signatories = others.to_vec();
    signatories.push(sender);
    derive_multisig_account_id(&signatories, threshold).unwrap_or(sender)
}

impl<'r> CallDecoder<'r> {
    /// Decode one call starting at the reader's position
    ///
    /// `data` is the whole buffer the reader walks, so the exact bytes of the
    /// call can be kept. A call the registry or the parsers do not know takes
    /// the rest of the buffer.
    pub fn decode_call(
        &self,
        data: &[u8],
        reader: &mut ScaleReader<'_>,
        sender: AccountId,
        depth: usize,
    ) -> DecoderResult<DecodedTransaction> {
        if depth > MAX_NESTED_CALLS {
            return Err(DecoderError::TooDeep(MAX_NESTED_CALLS));
        }
        let start = reader.position();
        let pallet_index = reader.read_u8()?;
        let call_index = reader.read_u8()?;

        let resolved = self
            .registry
            .resolve(pallet_index, call_index)
            .map(|(section, method)| (section.to_string(), method.to_string()));
        let (section, method) = match resolved {
            Some(names) => names,
            None => {
                debug!(
                    "Call index ({}, {}) not in registry for {}",
                    pallet_index, call_index, self.chain_id
                );
                (UNKNOWN.to_string(), UNKNOWN.to_string())
            }
        };

        let tx_type = TransactionType::from_call_name(&section, &method);
        let args = match tx_type {
            Some(tx_type) => Some(
                self.decode_args(tx_type, data, reader, sender, depth)
                    .map_err(|e| DecoderError::Malformed {
                        section: section.clone(),
                        method: method.clone(),
                        reason: e.to_string(),
                    })?,
            ),
            None => {
                reader.take_rest();
                None
            }
        };

        Ok(DecodedTransaction {
            tx_type,
            chain_id: self.chain_id.to_string(),
            address: sender,
            section,
            method,
            args,
            call_data: data[start..reader.position()].to_vec(),
        })
    }

    fn nested(
        &self,
        data: &[u8],
        reader: &mut ScaleReader<'_>,
        sender: AccountId,
        depth: usize,
    ) -> DecoderResult<(Box<TxPayload>, bool)> {
        let call = self.decode_call(data, reader, sender, depth + 1)?;
        let known = call.tx_type.is_some();
        Ok((Box::new(TxPayload::Decoded(call)), known))
    }

    fn decode_args(
        &self,
        tx_type: TransactionType,
        data: &[u8],
        reader: &mut ScaleReader<'_>,
        sender: AccountId,
        depth: usize,
    ) -> DecoderResult<CallArgs> {
        let args = match tx_type {
            TransactionType::Transfer => CallArgs::Transfer {
                dest: reader.read_multi_address()?,
                value: reader.read_compact()?,
            },
            TransactionType::Bond => CallArgs::Bond {
                value: reader.read_compact()?,
                payee: read_reward_destination(reader)?,
            },
            TransactionType::Unbond => CallArgs::Unbond {
                value: reader.read_compact()?,
            },
            TransactionType::Nominate => {
                let count = reader.read_len()?;
                let targets = (0..count)
                    .map(|_| reader.read_multi_address())
                    .collect::<Result<Vec<_>, _>>()?;
                CallArgs::Nominate { targets }
            }
            TransactionType::Chill => CallArgs::Chill,
            TransactionType::Batch => {
                let count = reader.read_len()?;
                let mut calls = Vec::with_capacity(count);
                for _ in 0..count {
                    if reader.is_empty() {
                        break;
                    }
                    let (call, known) = self.nested(data, reader, sender, depth)?;
                    calls.push(*call);
                    if !known {
                        break;
                    }
                }
                CallArgs::Batch { calls }
            }
            TransactionType::MultisigAsMulti => {
                let threshold = reader.read_u16()?;
                let other_signatories = reader.read_account_ids()?;
                let maybe_timepoint = reader.read_option(|r| r.read_timepoint())?;
                let origin = multisig_origin(sender, &other_signatories, threshold);
                let (call, known) = self.nested(data, reader, origin, depth)?;
                let max_weight = if known {
                    reader.read_weight()?
                } else {
                    Weight::ZERO
                };
                CallArgs::AsMulti {
                    threshold,
                    other_signatories,
                    maybe_timepoint,
                    call,
                    max_weight,
                }
            }
            TransactionType::MultisigApproveAsMulti => CallArgs::ApproveAsMulti {
                threshold: reader.read_u16()?,
                other_signatories: reader.read_account_ids()?,
                maybe_timepoint: reader.read_option(|r| r.read_timepoint())?,
                call_hash: reader.read_call_hash()?,
                max_weight: reader.read_weight()?,
            },
            TransactionType::MultisigCancelAsMulti => CallArgs::CancelAsMulti {
                threshold: reader.read_u16()?,
                other_signatories: reader.read_account_ids()?,
                timepoint: reader.read_timepoint()?,
                call_hash: reader.read_call_hash()?,
            },
            TransactionType::AddProxy => CallArgs::AddProxy {
                delegate: reader.read_multi_address()?,
                proxy_type: read_proxy_type(reader)?,
                delay: reader.read_u32()?,
            },
            TransactionType::RemoveProxy => CallArgs::RemoveProxy {
                delegate: reader.read_multi_address()?,
                proxy_type: read_proxy_type(reader)?,
                delay: reader.read_u32()?,
            },
            TransactionType::CreatePureProxy => CallArgs::CreatePureProxy {
                proxy_type: read_proxy_type(reader)?,
                delay: reader.read_u32()?,
                index: reader.read_u16()?,
            },
            TransactionType::Proxy => {
                let real = reader.read_multi_address()?;
                let force_proxy_type = match reader.read_u8()? {
                    0 => None,
                    1 => Some(read_proxy_type(reader)?),
                    other => {
                        return Err(DecoderError::Codec(
                            CodecError::InvalidVariant {
                                what: "Option",
                                value: other,
                            },
                        ))
                    }
                };
                let (call, _) = self.nested(data, reader, real, depth)?;
                CallArgs::Proxy {
                    real,
                    force_proxy_type,
                    call,
                }
            }
            TransactionType::Remark => CallArgs::Remark {
                remark: reader.read_vec_bytes()?,
            },
        };
        Ok(args)
    }
}
