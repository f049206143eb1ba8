//! Follow-up transactions for signatories acting on an existing multisig call

use crate::errors::{AppError, AppResult};
use crate::types::{
    Account, AccountId, CallArgs, DecodedTransaction, MultisigDetails, MultisigTransaction,
    Transaction, TxPayload, Weight,
};

fn details_for<'a>(account: &'a Account, signatory: &AccountId) -> AppResult<&'a MultisigDetails> {
    let details = account.multisig_details().ok_or_else(|| {
        AppError::InvalidWrapper(format!("{} is not a multisig account", account.account_id))
    })?;
    if !details.has_signatory(signatory) {
        return Err(AppError::InvalidWrapper(format!(
            "{} is not a signatory of {}",
            signatory, account.account_id
        )));
    }
    Ok(details)
}

fn ensure_open(tx: &MultisigTransaction) -> AppResult<()> {
    if tx.status.is_terminal() {
        return Err(AppError::InvalidData(format!(
            "multisig transaction {} is already {}",
            tx.key,
            tx.status.as_str()
        )));
    }
    Ok(())
}

/// Call payload to dispatch, rebuilt from whatever the record knows
fn known_call(account: &Account, tx: &MultisigTransaction) -> Option<TxPayload> {
    let call_data = tx.call_data.as_ref()?;
    match &tx.transaction {
        Some(TxPayload::Decoded(decoded)) if &decoded.call_data == call_data => {
            Some(TxPayload::Decoded(decoded.clone()))
        }
        // Raw bytes re-encode verbatim
        _ => Some(TxPayload::Decoded(DecodedTransaction {
            tx_type: None,
            chain_id: tx.key.chain_id.clone(),
            address: account.account_id,
            section: "unknown".to_string(),
            method: "unknown".to_string(),
            args: None,
            call_data: call_data.clone(),
        })),
    }
}

/// Approval by `signatory`
///
/// With the call data known this is an `asMulti` that may execute the call;
/// otherwise an `approveAsMulti` over the call hash.
pub fn build_approve_tx(
    account: &Account,
    signatory: AccountId,
    tx: &MultisigTransaction,
    max_weight: Weight,
) -> AppResult<Transaction> {
    let details = details_for(account, &signatory)?;
    ensure_open(tx)?;
    if tx.signatories.contains(&signatory) {
        return Err(AppError::InvalidData(format!(
            "{} already approved {}",
            signatory, tx.key
        )));
    }

    let other_signatories = details.other_signatories(&signatory);
    let maybe_timepoint = Some(tx.key.timepoint());
    let args = match known_call(account, tx) {
        Some(call) => CallArgs::AsMulti {
            threshold: details.threshold,
            other_signatories,
            maybe_timepoint,
            call: Box::new(call),
            max_weight,
        },
        None => CallArgs::ApproveAsMulti {
            threshold: details.threshold,
            other_signatories,
            maybe_timepoint,
            call_hash: tx.key.call_hash,
            max_weight,
        },
    };
    Ok(Transaction::new(tx.key.chain_id.clone(), signatory, args))
}

/// Cancellation by `signatory`; only the depositor may cancel
pub fn build_reject_tx(
    account: &Account,
    signatory: AccountId,
    tx: &MultisigTransaction,
) -> AppResult<Transaction> {
    let details = details_for(account, &signatory)?;
    ensure_open(tx)?;
    if tx.depositor != Some(signatory) {
        return Err(AppError::InvalidData(format!(
            "only the depositor can cancel {}",
            tx.key
        )));
    }

    Ok(Transaction::new(
        tx.key.chain_id.clone(),
        signatory,
        CallArgs::CancelAsMulti {
            threshold: details.threshold,
            other_signatories: details.other_signatories(&signatory),
            timepoint: tx.key.timepoint(),
            call_hash: tx.key.call_hash,
        },
    ))
}
