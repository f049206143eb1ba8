//! Order independence and idempotence of the multisig fold

use delegation_engine::multisig::{fold, MultisigState};
use delegation_engine::types::{
    CallHash, EventSource, ExecutionOutcome, MultisigEvent, MultisigTransaction, MultisigTxKey,
    MultisigTxStatus, SigningStatus, Timepoint,
};

use crate::common::fixtures::{id, CHAIN};

fn key() -> MultisigTxKey {
    MultisigTxKey::new(id(100), CHAIN, CallHash([9u8; 32]), Timepoint::new(20, 1))
}

fn event(account: u8, status: SigningStatus, source: EventSource) -> MultisigEvent {
    let mut e = MultisigEvent::new(key(), id(account), status, source);
    e.date_created = 0;
    e
}

fn on_chain(account: u8, status: SigningStatus, block: u32, index: u32) -> MultisigEvent {
    let mut e = event(account, status, EventSource::Chain);
    e.event_block = Some(block);
    e.event_index = Some(index);
    e
}

fn base() -> MultisigState {
    let mut tx = MultisigTransaction::new(key());
    tx.date_created = 0;
    MultisigState::new(tx)
}

fn fold_all(events: &[MultisigEvent]) -> MultisigState {
    events.iter().cloned().fold(base(), fold)
}

/// Every ordering of `0..n`
fn orderings(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for smaller in orderings(n - 1) {
        for slot in 0..=smaller.len() {
            let mut next = smaller.clone();
            next.insert(slot, n - 1);
            out.push(next);
        }
    }
    out
}

fn assert_order_independent(events: &[MultisigEvent]) -> MultisigState {
    let expected = fold_all(events);
    for ordering in orderings(events.len()) {
        let shuffled: Vec<_> = ordering.iter().map(|i| events[*i].clone()).collect();
        let state = fold_all(&shuffled);
        assert_eq!(state.tx, expected.tx, "ordering {:?}", ordering);
        assert_eq!(state.events, expected.events, "ordering {:?}", ordering);
    }
    expected
}

#[test]
fn test_execution_is_order_independent() {
    let mut executed = on_chain(2, SigningStatus::Signed, 25, 4);
    executed.execution = Some(ExecutionOutcome::Success);

    let events = vec![
        on_chain(1, SigningStatus::Signed, 20, 1),
        event(1, SigningStatus::Signed, EventSource::Local),
        event(2, SigningStatus::Signed, EventSource::Messenger),
        executed,
    ];
    let state = assert_order_independent(&events);

    assert_eq!(state.tx.status, MultisigTxStatus::Executed);
    assert_eq!(state.tx.depositor, Some(id(1)));
    assert_eq!(state.tx.signatories.len(), 2);
    // Chain copies win over the off-chain ones
    assert_eq!(state.events.len(), 2);
    assert!(state
        .events
        .values()
        .all(|e| e.source == EventSource::Chain));
}

#[test]
fn test_cancellation_is_order_independent() {
    let events = vec![
        on_chain(1, SigningStatus::Signed, 20, 1),
        event(2, SigningStatus::Signed, EventSource::Messenger),
        // Not the depositor, never counts
        event(3, SigningStatus::Cancelled, EventSource::Messenger),
        on_chain(1, SigningStatus::Cancelled, 30, 2),
    ];
    let state = assert_order_independent(&events);
    assert_eq!(state.tx.status, MultisigTxStatus::Cancelled);
}

#[test]
fn test_off_chain_execution_claims_do_not_count() {
    let mut claim = event(2, SigningStatus::Signed, EventSource::Messenger);
    claim.execution = Some(ExecutionOutcome::Success);
    let events = vec![on_chain(1, SigningStatus::Signed, 20, 1), claim];
    let state = assert_order_independent(&events);
    assert_eq!(state.tx.status, MultisigTxStatus::Established);
}

#[test]
fn test_equally_ranked_copies_settle_the_same_way() {
    // Same approval relayed twice by peers who saw it in different blocks
    let mut early = event(2, SigningStatus::Signed, EventSource::Messenger);
    early.event_block = Some(21);
    early.event_index = Some(0);
    let mut late = early.clone();
    late.event_block = Some(22);

    let events = vec![on_chain(1, SigningStatus::Signed, 20, 1), late, early.clone()];
    let state = assert_order_independent(&events);
    assert_eq!(state.events.len(), 2);
    assert!(state.events.values().any(|e| e == &early));
}

#[test]
fn test_refolding_is_idempotent() {
    let events = vec![
        on_chain(1, SigningStatus::Signed, 20, 1),
        event(2, SigningStatus::ErrorSigned, EventSource::Local),
        event(3, SigningStatus::Signed, EventSource::Messenger),
    ];
    let once = fold_all(&events);

    let mut again = once.clone();
    for e in &events {
        assert!(!again.apply(e.clone()));
    }
    assert_eq!(again, once);

    let twice: Vec<_> = events.iter().chain(events.iter()).cloned().collect();
    assert_eq!(fold_all(&twice), once);

    let rebuilt = MultisigState::from_parts(base().tx, once.events.values().cloned());
    assert_eq!(rebuilt, once);
}

#[test]
fn test_events_for_other_transactions_are_ignored() {
    let mut foreign = event(1, SigningStatus::Signed, EventSource::Chain);
    foreign.tx.block_created = 99;
    let mut state = base();
    assert!(!state.apply(foreign));
    assert!(state.events.is_empty());
    assert_eq!(state.tx.status, MultisigTxStatus::Signing);
}
