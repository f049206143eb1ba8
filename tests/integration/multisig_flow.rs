//! Multisig lifecycle: A creates a 2-of-3 call, B approves through the shared
//! room and the chain reports execution

use delegation_engine::chain::{
    submit_all, CallRegistry, ChainApi, ChainEvent, EventRecord, SignedExtrinsic,
};
use delegation_engine::composer::{compose, encode_payload, encode_transaction, get_tx_wrappers};
use delegation_engine::database::{AccountOperations, Database};
use delegation_engine::fees::{multisig_deposit, validate_funds};
use delegation_engine::messaging::{ApproveAction, ApprovePayload, InMemoryMessenger};
use delegation_engine::multisig::{build_approve_tx, LocalSubmission, MultisigTracker};
use delegation_engine::types::{
    CallArgs, ExecutionOutcome, MultisigTxStatus, Timepoint, Transaction, Weight,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::common::fixtures::{
    base_account, id, multisig_account, snapshot_chain, CHAIN, MULTISIG_CONSTANTS,
};

const ROOM: &str = "!signers:matrix.org";

#[tokio::test]
async fn test_two_of_three_lifecycle() {
    let (a, b, c) = (id(1), id(2), id(3));

    let mut db = Database::new(":memory:").unwrap();
    let wallet = db.create_wallet("alice").unwrap();
    let signer = base_account(wallet, "alice", a);
    let multisig = multisig_account(wallet, &[a, b, c], 2, ROOM);
    db.insert_account(&signer).unwrap();
    db.insert_account(&multisig).unwrap();

    let messenger = Arc::new(InMemoryMessenger::new());
    let tracker = MultisigTracker::new(Arc::new(Mutex::new(db)), messenger.clone());
    let registry = CallRegistry::default();
    let chain = snapshot_chain();

    // A composes a transfer from the multisig
    let core = Transaction::new(
        CHAIN,
        multisig.account_id,
        CallArgs::Transfer {
            dest: id(99),
            value: 5_000_000_000,
        },
    );
    let wrappers = get_tx_wrappers(&multisig, &[signer.clone(), multisig.clone()], CHAIN, None).unwrap();
    let wrapped = compose(core, &wrappers).unwrap();
    assert_eq!(wrapped.wrapped_tx.address, a);

    let call_hash = wrapped.multisig_call_hash(&registry).unwrap().unwrap();
    let call_data = encode_payload(&registry, wrapped.unwrap_multisig_call().unwrap()).unwrap();
    let deposit = multisig_deposit(2, &MULTISIG_CONSTANTS);

    let fee = chain.estimate_fee(&call_data, &a, 0).await.unwrap();
    let balances = HashMap::from([(a, deposit + fee)]);
    validate_funds(&wrapped, fee, Some(deposit), &balances).unwrap();
    let short = HashMap::from([(a, deposit + fee - 1)]);
    assert!(validate_funds(&wrapped, fee, Some(deposit), &short).is_err());

    // Submit A's asMulti; the chain emits NewMultisig for it
    chain.queue_events(vec![ChainEvent::NewMultisig {
        approving: a,
        multisig: multisig.account_id,
        call_hash,
    }]);
    let summary = submit_all(
        chain.clone(),
        vec![SignedExtrinsic {
            label: "alice".to_string(),
            bytes: encode_transaction(&registry, &wrapped.wrapped_tx).unwrap(),
        }],
        4,
    )
    .await;
    assert!(summary.all_succeeded());
    assert_eq!(summary.to_string(), "1 of 1 succeeded");

    let created = tracker
        .record_submission(LocalSubmission {
            account: multisig.clone(),
            chain_id: CHAIN.to_string(),
            signatory: a,
            call_hash,
            call_data: Some(call_data.clone()),
            call_timepoint: None,
            action: ApproveAction::Approve,
            outcome: summary.outcomes[0].result.clone(),
            deposit: Some(deposit),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.status, MultisigTxStatus::Established);
    assert_eq!(created.depositor, Some(a));
    assert_eq!(created.deposit, Some(deposit));
    assert_eq!(created.approvals_remaining(2), 1);

    let sent = messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ROOM);
    assert_eq!(sent[0].1.call_timepoint, created.key.timepoint());

    // B builds the follow-up approval from the stored record
    let approve = build_approve_tx(&multisig, b, &created, Weight::ZERO).unwrap();
    assert!(matches!(approve.args, CallArgs::AsMulti { maybe_timepoint: Some(tp), .. } if tp == created.key.timepoint()));

    // B's notification reaches A's device
    let notified = tracker
        .apply_notification(
            ROOM,
            &ApprovePayload {
                sender_account_id: b,
                chain_id: CHAIN.to_string(),
                call_hash,
                call_data: None,
                extrinsic_timepoint: Timepoint::new(created.key.block_created + 1, 2),
                extrinsic_hash: "0xb0b".to_string(),
                error: false,
                call_timepoint: created.key.timepoint(),
                action: ApproveAction::Approve,
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(notified.status, MultisigTxStatus::Established);
    assert_eq!(notified.signatories.len(), 2);

    // The chain confirms execution
    let executed_event = EventRecord {
        block_number: created.key.block_created + 1,
        extrinsic_index: 2,
        extrinsic_hash: Some("0xb0b".to_string()),
        event: ChainEvent::MultisigExecuted {
            approving: b,
            timepoint: created.key.timepoint(),
            multisig: multisig.account_id,
            call_hash,
            result: ExecutionOutcome::Success,
        },
    };
    let executed = tracker.apply_chain_event(CHAIN, &executed_event).unwrap().unwrap();
    assert_eq!(executed.status, MultisigTxStatus::Executed);

    // Replays and late contradicting claims change nothing
    let replayed = tracker.apply_chain_event(CHAIN, &executed_event).unwrap().unwrap();
    assert_eq!(replayed.status, MultisigTxStatus::Executed);
    assert_eq!(replayed.signatories, executed.signatories);

    let late_cancel = ApprovePayload {
        sender_account_id: c,
        chain_id: CHAIN.to_string(),
        call_hash,
        call_data: None,
        extrinsic_timepoint: Timepoint::new(created.key.block_created + 2, 0),
        extrinsic_hash: String::new(),
        error: false,
        call_timepoint: created.key.timepoint(),
        action: ApproveAction::Cancel,
    };
    let after = tracker.apply_notification(ROOM, &late_cancel).unwrap().unwrap();
    assert_eq!(after.status, MultisigTxStatus::Executed);

    let stored = tracker.transactions(&multisig.account_id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].call_data.as_deref(), Some(call_data.as_slice()));
}

#[tokio::test]
async fn test_rejected_submission_is_recorded_as_error() {
    let (a, b) = (id(1), id(2));
    let mut db = Database::new(":memory:").unwrap();
    let wallet = db.create_wallet("alice").unwrap();
    let multisig = multisig_account(wallet, &[a, b], 2, "");
    db.insert_account(&multisig).unwrap();
    let messenger = Arc::new(InMemoryMessenger::new());
    let tracker = MultisigTracker::new(Arc::new(Mutex::new(db)), messenger.clone());

    let call_timepoint = Timepoint::new(10, 1);
    let tx = tracker
        .record_submission(LocalSubmission {
            account: multisig.clone(),
            chain_id: CHAIN.to_string(),
            signatory: b,
            call_hash: delegation_engine::codec::call_hash(b"call"),
            call_data: None,
            call_timepoint: Some(call_timepoint),
            action: ApproveAction::Approve,
            outcome: Err("Transaction is outdated".to_string()),
            deposit: None,
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(tx.status, MultisigTxStatus::Error);
    assert!(tx.signatories.is_empty());
    // No channel, so nothing is posted
    assert!(messenger.sent().is_empty());
}
