//! Call encoding
//!
//! Turns typed [`CallArgs`] into call bytes: two index bytes from the
//! chain's [`CallRegistry`] followed by the SCALE-encoded arguments.
//! Decoded payloads re-encode to the exact bytes they were decoded from.

use crate::chain::CallRegistry;
use crate::codec::scale::{
    encode_account_ids, encode_bytes, encode_compact, encode_compact_len, encode_multi_address,
    encode_option, encode_timepoint, encode_weight,
};
use crate::errors::{AppError, AppResult};
use crate::types::{CallArgs, RewardDestination, Transaction, TransactionType, TxPayload};

fn unsupported(tx_type: TransactionType, reason: impl Into<String>) -> AppError {
    AppError::UnsupportedTransaction {
        tx_type,
        reason: reason.into(),
    }
}

/// Encode any payload; decoded payloads return their original bytes
pub fn encode_payload(registry: &CallRegistry, payload: &TxPayload) -> AppResult<Vec<u8>> {
    match payload {
        TxPayload::Authored(tx) => encode_transaction(registry, tx),
        TxPayload::Decoded(decoded) => Ok(decoded.call_data.clone()),
    }
}

/// Encode an authored transaction's call
pub fn encode_transaction(registry: &CallRegistry, tx: &Transaction) -> AppResult<Vec<u8>> {
    if tx.args.tx_type() != tx.tx_type {
        return Err(unsupported(
            tx.tx_type,
            format!("arguments are for {:?}", tx.args.tx_type()),
        ));
    }

    let (section, method) = tx.tx_type.call_name();
    let (pallet_index, call_index) = registry.call_index(section, method).ok_or_else(|| {
        unsupported(
            tx.tx_type,
            format!("{}.{} is not in the chain's call registry", section, method),
        )
    })?;

    let mut out = vec![pallet_index, call_index];
    encode_args(registry, &tx.args, &mut out)?;
    Ok(out)
}

fn encode_reward_destination(payee: &RewardDestination, out: &mut Vec<u8>) {
    match payee {
        RewardDestination::Staked => out.push(0),
        RewardDestination::Stash => out.push(1),
        RewardDestination::Controller => out.push(2),
        RewardDestination::Account(id) => {
            out.push(3);
            out.extend_from_slice(id.as_bytes());
        }
        RewardDestination::None => out.push(4),
    }
}

fn encode_args(registry: &CallRegistry, args: &CallArgs, out: &mut Vec<u8>) -> AppResult<()> {
    match args {
        CallArgs::Transfer { dest, value } => {
            encode_multi_address(dest, out);
            encode_compact(*value, out);
        }
        CallArgs::Bond { value, payee } => {
            encode_compact(*value, out);
            encode_reward_destination(payee, out);
        }
        CallArgs::Unbond { value } => encode_compact(*value, out),
        CallArgs::Nominate { targets } => {
            encode_compact_len(targets.len(), out);
            for target in targets {
                encode_multi_address(target, out);
            }
        }
        CallArgs::Chill => {}
        CallArgs::Batch { calls } => {
            encode_compact_len(calls.len(), out);
            for call in calls {
                out.extend(encode_payload(registry, call)?);
            }
        }
        CallArgs::AsMulti {
            threshold,
            other_signatories,
            maybe_timepoint,
            call,
            max_weight,
        } => {
            out.extend_from_slice(&threshold.to_le_bytes());
            encode_account_ids(other_signatories, out);
            encode_option(maybe_timepoint.as_ref(), out, encode_timepoint);
            out.extend(encode_payload(registry, call)?);
            encode_weight(max_weight, out);
        }
        CallArgs::ApproveAsMulti {
            threshold,
            other_signatories,
            maybe_timepoint,
            call_hash,
            max_weight,
        } => {
            out.extend_from_slice(&threshold.to_le_bytes());
            encode_account_ids(other_signatories, out);
            encode_option(maybe_timepoint.as_ref(), out, encode_timepoint);
            out.extend_from_slice(call_hash.as_bytes());
            encode_weight(max_weight, out);
        }
        CallArgs::CancelAsMulti {
            threshold,
            other_signatories,
            timepoint,
            call_hash,
        } => {
            out.extend_from_slice(&threshold.to_le_bytes());
            encode_account_ids(other_signatories, out);
            encode_timepoint(timepoint, out);
            out.extend_from_slice(call_hash.as_bytes());
        }
        CallArgs::AddProxy {
            delegate,
            proxy_type,
            delay,
        }
        | CallArgs::RemoveProxy {
            delegate,
            proxy_type,
            delay,
        } => {
            encode_multi_address(delegate, out);
            out.push(proxy_type.index());
            out.extend_from_slice(&delay.to_le_bytes());
        }
        CallArgs::CreatePureProxy {
            proxy_type,
            delay,
            index,
        } => {
            out.push(proxy_type.index());
            out.extend_from_slice(&delay.to_le_bytes());
            out.extend_from_slice(&index.to_le_bytes());
        }
        CallArgs::Proxy {
            real,
            force_proxy_type,
            call,
        } => {
            encode_multi_address(real, out);
            encode_option(force_proxy_type.as_ref(), out, |t, out| out.push(t.index()));
            out.extend(encode_payload(registry, call)?);
        }
        CallArgs::Remark { remark } => encode_bytes(remark, out),
    }
    Ok(())
}
