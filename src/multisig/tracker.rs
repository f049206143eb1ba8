//! Persistent multisig tracking
//!
//! Every event heard for a call, whatever its source, is appended to the
//! event log and the call's record is recomputed from the log with
//! [`MultisigState`]. Replaying the same events therefore never changes the
//! stored record.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::events::{from_chain_event, from_notification};
use super::fold::MultisigState;
use crate::chain::{CallRegistry, EventRecord, ExtrinsicInclusion};
use crate::codec::call_hash;
use crate::database::{AccountOperations, Database, MultisigOperations};
use crate::decoder;
use crate::errors::{AppError, AppResult};
use crate::messaging::{ApproveAction, ApprovePayload, SecureMessenger};
use crate::types::{
    Account, AccountId, Balance, CallHash, ChainId, EventSource, MultisigEvent, MultisigTransaction,
    MultisigTxKey, Timepoint, TxPayload,
};

/// This device's own approval or cancellation, after submission
#[derive(Debug, Clone)]
pub struct LocalSubmission {
    pub account: Account,
    pub chain_id: ChainId,
    pub signatory: AccountId,
    pub call_hash: CallHash,
    pub call_data: Option<Vec<u8>>,
    /// `None` when the submission created the call
    pub call_timepoint: Option<Timepoint>,
    pub action: ApproveAction,
    pub outcome: Result<ExtrinsicInclusion, String>,
    /// Deposit reserved when the submission created the call
    pub deposit: Option<Balance>,
}

#[derive(Clone)]
pub struct MultisigTracker {
    db: Arc<Mutex<Database>>,
    messenger: Arc<dyn SecureMessenger>,
}

fn load_state(db: &Database, key: &MultisigTxKey) -> AppResult<MultisigState> {
    match db.get_multisig_transaction(key)? {
        Some(tx) => {
            let events = db.get_multisig_events(key)?;
            Ok(MultisigState::from_parts(tx, events))
        }
        None => Ok(MultisigState::new(MultisigTransaction::new(key.clone()))),
    }
}

fn check_call_data(key: &MultisigTxKey, call_data: &[u8]) -> AppResult<()> {
    let actual = call_hash(call_data);
    if actual != key.call_hash {
        return Err(AppError::CallDataMismatch {
            expected: key.call_hash,
            actual,
        });
    }
    Ok(())
}

impl MultisigTracker {
    pub fn new(db: Arc<Mutex<Database>>, messenger: Arc<dyn SecureMessenger>) -> Self {
        Self { db, messenger }
    }

    fn with_db<R>(&self, f: impl FnOnce(&mut Database) -> AppResult<R>) -> AppResult<R> {
        let mut db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut db)
    }

    fn apply_locked(db: &mut Database, event: MultisigEvent) -> AppResult<MultisigTransaction> {
        let mut state = load_state(db, &event.tx)?;
        let changed = state.apply(event.clone());

        let appended = db.save_multisig_state(&state.tx, std::slice::from_ref(&event))?;
        if changed {
            debug!(
                "{} is {} with {} approvals",
                state.tx.key,
                state.tx.status.as_str(),
                state.tx.signatories.len()
            );
        } else if appended == 0 {
            debug!("Duplicate event for {} ignored", state.tx.key);
        }
        Ok(state.tx)
    }

    /// Fold one event into its call's record and store both
    pub fn apply_event(&self, event: MultisigEvent) -> AppResult<MultisigTransaction> {
        self.with_db(|db| Self::apply_locked(db, event))
    }

    /// Fold a runtime event; `None` when it does not concern a wallet multisig
    pub fn apply_chain_event(
        &self,
        chain_id: &str,
        record: &EventRecord,
    ) -> AppResult<Option<MultisigTransaction>> {
        let Some(event) = from_chain_event(chain_id, record) else {
            return Ok(None);
        };
        self.with_db(|db| {
            let tracked = db
                .find_account(&event.tx.account_id, chain_id)?
                .is_some_and(|a| a.multisig_details().is_some());
            if !tracked {
                return Ok(None);
            }
            Self::apply_locked(db, event).map(Some)
        })
    }

    /// Fold a peer's notification received in `room_id`
    ///
    /// Notifications from rooms without a wallet multisig, or from senders
    /// outside its signatory set, are dropped. Call data carried by the
    /// notification is kept only if it hashes to the call hash.
    pub fn apply_notification(
        &self,
        room_id: &str,
        payload: &ApprovePayload,
    ) -> AppResult<Option<MultisigTransaction>> {
        self.with_db(|db| {
            let Some(account) = db.find_multisig_by_channel(room_id)? else {
                debug!("No multisig for room {}", room_id);
                return Ok(None);
            };
            let Some(details) = account.multisig_details() else {
                return Ok(None);
            };
            if !details.has_signatory(&payload.sender_account_id) {
                warn!(
                    "Dropping notification from {} who is not a signatory of {}",
                    payload.sender_account_id, account.account_id
                );
                return Ok(None);
            }
            if !account.is_on_chain(&payload.chain_id) {
                warn!(
                    "Dropping notification for {} on foreign chain {}",
                    account.account_id, payload.chain_id
                );
                return Ok(None);
            }

            let event = from_notification(account.account_id, payload);
            let key = event.tx.clone();
            let mut tx = Self::apply_locked(db, event)?;

            if let Some(call_data) = &payload.call_data {
                match check_call_data(&key, call_data) {
                    Ok(()) if tx.call_data.is_none() => {
                        tx.call_data = Some(call_data.clone());
                        db.upsert_multisig_transaction(&tx)?;
                    }
                    Ok(()) => {}
                    Err(e) => warn!("Ignoring call data from {}: {}", payload.sender_account_id, e),
                }
            }
            Ok(Some(tx))
        })
    }

    /// Attach call data to a known call hash, decoding it when a registry is given
    pub fn resolve_call_data(
        &self,
        key: &MultisigTxKey,
        call_data: &[u8],
        registry: Option<&CallRegistry>,
    ) -> AppResult<MultisigTransaction> {
        check_call_data(key, call_data)?;

        self.with_db(|db| {
            let mut tx = load_state(db, key)?.tx;
            tx.call_data = Some(call_data.to_vec());
            if let Some(registry) = registry {
                match decoder::decode(&key.chain_id, registry, key.account_id, call_data) {
                    Ok(decoded) => tx.transaction = Some(TxPayload::Decoded(decoded)),
                    Err(e) => warn!("Call data for {} did not decode: {}", key, e),
                }
            }
            db.upsert_multisig_transaction(&tx)?;
            Ok(tx)
        })
    }

    /// Record this device's own submission and tell the other signatories
    ///
    /// Chain events in the inclusion are folded as chain facts; the local
    /// event only stands in until they arrive. Returns `None` when a call
    /// that was never created failed to submit.
    pub async fn record_submission(
        &self,
        submission: LocalSubmission,
    ) -> AppResult<Option<MultisigTransaction>> {
        let account_id = submission.account.account_id;

        let (extrinsic_timepoint, extrinsic_hash, error) = match &submission.outcome {
            Ok(inclusion) => (
                Some(inclusion.timepoint()),
                inclusion.extrinsic_hash.clone(),
                !inclusion.is_success(),
            ),
            Err(_) => (None, String::new(), true),
        };
        let Some(call_timepoint) = submission.call_timepoint.or(extrinsic_timepoint) else {
            warn!(
                "Creation of {} for {} failed, nothing to record",
                submission.call_hash, account_id
            );
            return Ok(None);
        };

        let payload = ApprovePayload {
            sender_account_id: submission.signatory,
            chain_id: submission.chain_id.clone(),
            call_hash: submission.call_hash,
            call_data: submission.call_data.clone(),
            extrinsic_timepoint: extrinsic_timepoint.unwrap_or(call_timepoint),
            extrinsic_hash,
            error,
            call_timepoint,
            action: submission.action,
        };

        let tx = self.with_db(|db| {
            let mut local = from_notification(account_id, &payload);
            local.source = EventSource::Local;
            let key = local.tx.clone();
            let mut tx = Self::apply_locked(db, local)?;

            if let Ok(inclusion) = &submission.outcome {
                for record in inclusion.records() {
                    if let Some(event) = from_chain_event(&key.chain_id, &record) {
                        if event.tx == key {
                            tx = Self::apply_locked(db, event)?;
                        }
                    }
                }
            }

            let mut dirty = false;
            if let Some(call_data) = &submission.call_data {
                if tx.call_data.is_none() && check_call_data(&key, call_data).is_ok() {
                    tx.call_data = Some(call_data.clone());
                    dirty = true;
                }
            }
            // The creating submission reserved the deposit
            let included = matches!(&submission.outcome, Ok(inclusion) if inclusion.is_success());
            if submission.call_timepoint.is_none() && included {
                if tx.depositor.is_none() {
                    tx.depositor = Some(submission.signatory);
                    dirty = true;
                }
                if tx.deposit.is_none() && submission.deposit.is_some() {
                    tx.deposit = submission.deposit;
                    dirty = true;
                }
            }
            if dirty {
                db.upsert_multisig_transaction(&tx)?;
            }
            Ok(tx)
        })?;

        match submission.account.multisig_details() {
            Some(details) if details.has_channel() => {
                if let Err(e) = self.messenger.send_approve(&details.channel_id, &payload).await {
                    warn!("Could not notify signatories of {}: {}", account_id, e);
                } else {
                    info!(
                        "Notified room {} of {:?} on {}",
                        details.channel_id, payload.action, tx.key
                    );
                }
            }
            _ => debug!("{} has no channel, no notification sent", account_id),
        }
        Ok(Some(tx))
    }

    pub fn transactions(&self, account_id: &AccountId) -> AppResult<Vec<MultisigTransaction>> {
        self.with_db(|db| db.get_multisig_transactions(account_id))
    }
}
