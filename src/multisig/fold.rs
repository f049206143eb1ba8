//! Pure multisig state machine
//!
//! A transaction's status and signatory set are functions of the
//! deduplicated set of events seen for it, so applying events in any order,
//! any number of times, lands in the same state.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::types::{
    AccountId, EventSource, ExecutionOutcome, MultisigEvent, MultisigEventKey,
    MultisigTransaction, MultisigTxStatus, SigningStatus,
};

/// A transaction record together with every distinct event folded into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigState {
    pub tx: MultisigTransaction,
    pub events: BTreeMap<MultisigEventKey, MultisigEvent>,
}

/// Preference between two events sharing a dedup key: chain-sourced beats
/// off-chain, and an event carrying the execution result beats one without
fn rank(event: &MultisigEvent) -> (bool, bool, bool) {
    (
        event.source == EventSource::Chain,
        event.execution.is_some(),
        event.event_block.is_some(),
    )
}

/// Total order among equally ranked copies; the smaller one is kept
fn tie_key(
    event: &MultisigEvent,
) -> (&'static str, Option<bool>, Option<u32>, Option<u32>, Option<&str>, i64) {
    (
        event.source.as_str(),
        event.execution.map(|outcome| outcome == ExecutionOutcome::Success),
        event.event_block,
        event.event_index,
        event.extrinsic_hash.as_deref(),
        event.date_created,
    )
}

fn replaces(candidate: &MultisigEvent, existing: &MultisigEvent) -> bool {
    match rank(candidate).cmp(&rank(existing)) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => tie_key(candidate) < tie_key(existing),
    }
}

/// Whether `event` was emitted by the extrinsic that created the call
fn is_creation_event(event: &MultisigEvent) -> bool {
    event.source == EventSource::Chain
        && event.status.is_approval()
        && event.event_block == Some(event.tx.block_created)
        && event.event_index == Some(event.tx.index_created)
}

impl MultisigState {
    pub fn new(tx: MultisigTransaction) -> Self {
        Self {
            tx,
            events: BTreeMap::new(),
        }
    }

    /// Rebuild state from a stored record and its stored events
    pub fn from_parts(tx: MultisigTransaction, events: impl IntoIterator<Item = MultisigEvent>) -> Self {
        let mut state = Self::new(tx);
        for event in events {
            state.insert(event);
        }
        state.refresh();
        state
    }

    fn insert(&mut self, event: MultisigEvent) -> bool {
        let key = event.key();
        match self.events.get(&key) {
            Some(existing) if !replaces(&event, existing) => false,
            _ => {
                self.events.insert(key, event);
                true
            }
        }
    }

    fn refresh(&mut self) {
        if self.tx.depositor.is_none() {
            self.tx.depositor = self
                .events
                .values()
                .find(|e| is_creation_event(e))
                .map(|e| e.account_id);
        }
        let (status, signatories) = derive_status(self.events.values(), self.tx.depositor);
        self.tx.status = status;
        self.tx.signatories = signatories;
    }

    /// Fold one event in place; `true` when the state changed
    pub fn apply(&mut self, event: MultisigEvent) -> bool {
        if event.tx != self.tx.key {
            warn!(
                "Ignoring event for {} applied to {}",
                event.tx, self.tx.key
            );
            return false;
        }
        if !self.insert(event) {
            return false;
        }
        self.refresh();
        true
    }
}

/// Functional form of [`MultisigState::apply`]
pub fn fold(mut state: MultisigState, event: MultisigEvent) -> MultisigState {
    state.apply(event);
    state
}

/// Status and signatory set implied by a set of events
///
/// Chain execution results win; then a cancellation by the depositor (or,
/// while the depositor is unknown, one observed on chain); then any accepted
/// approval establishes the call. Off-chain execution claims never count.
pub fn derive_status<'a>(
    events: impl IntoIterator<Item = &'a MultisigEvent>,
    depositor: Option<AccountId>,
) -> (MultisigTxStatus, BTreeSet<AccountId>) {
    let mut signatories = BTreeSet::new();
    let mut executed = None;
    let mut cancelled = false;
    let mut saw_error = false;

    for event in events {
        if event.status.is_approval() {
            signatories.insert(event.account_id);
        }
        if event.status.is_error() {
            saw_error = true;
        }
        if event.source == EventSource::Chain {
            match event.execution {
                // A failed dispatch outranks a success heard for the same call
                Some(ExecutionOutcome::Failed) => executed = Some(ExecutionOutcome::Failed),
                Some(ExecutionOutcome::Success) if executed.is_none() => {
                    executed = Some(ExecutionOutcome::Success)
                }
                _ => {}
            }
        }
        if event.status == SigningStatus::Cancelled {
            let accepted = match depositor {
                Some(depositor) => event.account_id == depositor,
                None => event.source == EventSource::Chain,
            };
            cancelled |= accepted;
        }
    }

    let status = match executed {
        Some(ExecutionOutcome::Success) => MultisigTxStatus::Executed,
        Some(ExecutionOutcome::Failed) => MultisigTxStatus::Error,
        None if cancelled => MultisigTxStatus::Cancelled,
        None if !signatories.is_empty() => MultisigTxStatus::Established,
        None if saw_error => MultisigTxStatus::Error,
        None => MultisigTxStatus::Signing,
    };
    (status, signatories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallHash, MultisigTxKey, Timepoint};

    fn id(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    fn key() -> MultisigTxKey {
        MultisigTxKey::new(id(100), "polkadot", CallHash([5u8; 32]), Timepoint::new(10, 2))
    }

    fn event(account: u8, status: SigningStatus, source: EventSource) -> MultisigEvent {
        MultisigEvent::new(key(), id(account), status, source)
    }

    fn chain_event(account: u8, status: SigningStatus, block: u32, index: u32) -> MultisigEvent {
        let mut e = event(account, status, EventSource::Chain);
        e.event_block = Some(block);
        e.event_index = Some(index);
        e
    }

    fn executed(account: u8, outcome: ExecutionOutcome) -> MultisigEvent {
        let mut e = chain_event(account, SigningStatus::Signed, 12, 1);
        e.execution = Some(outcome);
        e
    }

    fn state() -> MultisigState {
        MultisigState::new(MultisigTransaction::new(key()))
    }

    #[test]
    fn test_threshold_scenario() {
        let mut s = state();
        assert_eq!(s.tx.status, MultisigTxStatus::Signing);

        s.apply(chain_event(1, SigningStatus::PendingSigned, 10, 2));
        assert_eq!(s.tx.status, MultisigTxStatus::Established);
        assert_eq!(s.tx.depositor, Some(id(1)));
        assert_eq!(s.tx.signatories, [id(1)].into_iter().collect());

        s.apply(event(2, SigningStatus::Signed, EventSource::Messenger));
        assert_eq!(s.tx.signatories.len(), 2);
        assert_eq!(s.tx.status, MultisigTxStatus::Established);

        s.apply(executed(2, ExecutionOutcome::Success));
        assert_eq!(s.tx.status, MultisigTxStatus::Executed);
        assert_eq!(s.tx.signatories.len(), 2);
    }

    #[test]
    fn test_off_chain_execution_claim_is_ignored() {
        let mut s = state();
        let mut claim = event(2, SigningStatus::Signed, EventSource::Messenger);
        claim.execution = Some(ExecutionOutcome::Success);
        s.apply(claim);
        assert_eq!(s.tx.status, MultisigTxStatus::Established);
    }

    #[test]
    fn test_duplicates_and_reordering_converge() {
        let events = vec![
            chain_event(1, SigningStatus::PendingSigned, 10, 2),
            event(2, SigningStatus::Signed, EventSource::Messenger),
            chain_event(2, SigningStatus::Signed, 11, 4),
            event(3, SigningStatus::ErrorSigned, EventSource::Messenger),
        ];

        let forward = events.iter().cloned().fold(state(), fold);
        let replayed = events.iter().cloned().fold(forward.clone(), fold);
        let reversed = events.iter().rev().cloned().fold(state(), fold);

        for other in [&replayed, &reversed] {
            assert_eq!(other.tx.status, forward.tx.status);
            assert_eq!(other.tx.signatories, forward.tx.signatories);
            assert_eq!(other.tx.depositor, forward.tx.depositor);
        }
        assert_eq!(forward.events.len(), 3);
    }

    #[test]
    fn test_chain_execution_upgrades_messenger_duplicate() {
        let mut s = state();
        s.apply(event(2, SigningStatus::Signed, EventSource::Messenger));
        assert!(s.apply(executed(2, ExecutionOutcome::Success)));
        assert_eq!(s.tx.status, MultisigTxStatus::Executed);
        // The weaker duplicate no longer changes anything
        assert!(!s.apply(event(2, SigningStatus::Signed, EventSource::Messenger)));
        assert_eq!(s.tx.status, MultisigTxStatus::Executed);
    }

    #[test]
    fn test_only_depositor_can_cancel() {
        let mut s = state();
        s.apply(chain_event(1, SigningStatus::PendingSigned, 10, 2));
        s.apply(event(2, SigningStatus::Cancelled, EventSource::Messenger));
        assert_eq!(s.tx.status, MultisigTxStatus::Established);

        s.apply(chain_event(1, SigningStatus::Cancelled, 13, 1));
        assert_eq!(s.tx.status, MultisigTxStatus::Cancelled);
    }

    #[test]
    fn test_failed_execution_is_error() {
        let mut s = state();
        s.apply(chain_event(1, SigningStatus::PendingSigned, 10, 2));
        s.apply(executed(2, ExecutionOutcome::Failed));
        assert_eq!(s.tx.status, MultisigTxStatus::Error);
    }

    #[test]
    fn test_only_errors_is_error() {
        let mut s = state();
        s.apply(event(1, SigningStatus::ErrorSigned, EventSource::Local));
        assert_eq!(s.tx.status, MultisigTxStatus::Error);
        assert!(s.tx.signatories.is_empty());
    }

    #[test]
    fn test_foreign_event_is_ignored() {
        let mut s = state();
        let mut foreign = event(1, SigningStatus::Signed, EventSource::Chain);
        foreign.tx.block_created = 99;
        assert!(!s.apply(foreign));
        assert!(s.events.is_empty());
    }
}
