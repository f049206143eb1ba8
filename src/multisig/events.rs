//! Event intake: chain events and messenger notifications become
//! [`MultisigEvent`]s keyed to the transaction they act on

use crate::chain::{ChainEvent, EventRecord};
use crate::messaging::{ApproveAction, ApprovePayload};
use crate::types::{AccountId, EventSource, MultisigEvent, MultisigTxKey, SigningStatus};

/// Translate a runtime event, `None` for events unrelated to multisig calls
///
/// `NewMultisig` carries no timepoint of its own: the call is created by the
/// extrinsic that emitted it.
pub fn from_chain_event(chain_id: &str, record: &EventRecord) -> Option<MultisigEvent> {
    let (multisig, call_hash, timepoint, account, status, execution) = match &record.event {
        ChainEvent::NewMultisig {
            approving,
            multisig,
            call_hash,
        } => (
            *multisig,
            *call_hash,
            record.timepoint(),
            *approving,
            SigningStatus::PendingSigned,
            None,
        ),
        ChainEvent::MultisigApproval {
            approving,
            timepoint,
            multisig,
            call_hash,
        } => (
            *multisig,
            *call_hash,
            *timepoint,
            *approving,
            SigningStatus::Signed,
            None,
        ),
        ChainEvent::MultisigExecuted {
            approving,
            timepoint,
            multisig,
            call_hash,
            result,
        } => (
            *multisig,
            *call_hash,
            *timepoint,
            *approving,
            SigningStatus::Signed,
            Some(*result),
        ),
        ChainEvent::MultisigCancelled {
            cancelling,
            timepoint,
            multisig,
            call_hash,
        } => (
            *multisig,
            *call_hash,
            *timepoint,
            *cancelling,
            SigningStatus::Cancelled,
            None,
        ),
        _ => return None,
    };

    let key = MultisigTxKey::new(multisig, chain_id, call_hash, timepoint);
    let mut event = MultisigEvent::new(key, account, status, EventSource::Chain);
    event.execution = execution;
    event.extrinsic_hash = record.extrinsic_hash.clone();
    event.event_block = Some(record.block_number);
    event.event_index = Some(record.extrinsic_index);
    Some(event)
}

/// Translate a peer's notification for the multisig account `multisig`
///
/// Execution is never inferred from a notification.
pub fn from_notification(multisig: AccountId, payload: &ApprovePayload) -> MultisigEvent {
    let creates_call = payload.extrinsic_timepoint == payload.call_timepoint;
    let status = match (payload.action, payload.error) {
        (ApproveAction::Approve, false) if creates_call => SigningStatus::PendingSigned,
        (ApproveAction::Approve, false) => SigningStatus::Signed,
        (ApproveAction::Approve, true) => SigningStatus::ErrorSigned,
        (ApproveAction::Cancel, false) => SigningStatus::Cancelled,
        (ApproveAction::Cancel, true) => SigningStatus::ErrorCancelled,
    };

    let key = MultisigTxKey::new(
        multisig,
        payload.chain_id.clone(),
        payload.call_hash,
        payload.call_timepoint,
    );
    let mut event = MultisigEvent::new(key, payload.sender_account_id, status, EventSource::Messenger);
    if !payload.extrinsic_hash.is_empty() {
        event.extrinsic_hash = Some(payload.extrinsic_hash.clone());
    }
    event.event_block = Some(payload.extrinsic_timepoint.height);
    event.event_index = Some(payload.extrinsic_timepoint.index);
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallHash, ExecutionOutcome, Timepoint};

    fn id(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    fn record(event: ChainEvent) -> EventRecord {
        EventRecord {
            block_number: 20,
            extrinsic_index: 3,
            extrinsic_hash: Some("0xfeed".to_string()),
            event,
        }
    }

    #[test]
    fn test_new_multisig_is_keyed_by_its_own_extrinsic() {
        let event = from_chain_event(
            "polkadot",
            &record(ChainEvent::NewMultisig {
                approving: id(1),
                multisig: id(9),
                call_hash: CallHash([4u8; 32]),
            }),
        )
        .unwrap();
        assert_eq!(event.tx.timepoint(), Timepoint::new(20, 3));
        assert_eq!(event.status, SigningStatus::PendingSigned);
        assert_eq!(event.account_id, id(1));
        assert_eq!(event.extrinsic_hash.as_deref(), Some("0xfeed"));
    }

    #[test]
    fn test_executed_carries_outcome() {
        let event = from_chain_event(
            "polkadot",
            &record(ChainEvent::MultisigExecuted {
                approving: id(2),
                timepoint: Timepoint::new(15, 1),
                multisig: id(9),
                call_hash: CallHash([4u8; 32]),
                result: ExecutionOutcome::Failed,
            }),
        )
        .unwrap();
        assert_eq!(event.tx.timepoint(), Timepoint::new(15, 1));
        assert_eq!(event.execution, Some(ExecutionOutcome::Failed));
    }

    #[test]
    fn test_unrelated_events_are_skipped() {
        assert!(from_chain_event(
            "polkadot",
            &record(ChainEvent::Other {
                section: "balances".to_string(),
                method: "Transfer".to_string(),
            }),
        )
        .is_none());
    }

    #[test]
    fn test_notification_statuses() {
        let mut payload = ApprovePayload {
            sender_account_id: id(3),
            chain_id: "polkadot".to_string(),
            call_hash: CallHash([4u8; 32]),
            call_data: None,
            extrinsic_timepoint: Timepoint::new(16, 0),
            extrinsic_hash: "0x01".to_string(),
            error: false,
            call_timepoint: Timepoint::new(15, 1),
            action: ApproveAction::Approve,
        };
        let event = from_notification(id(9), &payload);
        assert_eq!(event.status, SigningStatus::Signed);
        assert_eq!(event.source, EventSource::Messenger);
        assert_eq!(event.execution, None);

        payload.error = true;
        assert_eq!(from_notification(id(9), &payload).status, SigningStatus::ErrorSigned);

        payload.action = ApproveAction::Cancel;
        payload.error = false;
        assert_eq!(from_notification(id(9), &payload).status, SigningStatus::Cancelled);

        payload.action = ApproveAction::Approve;
        payload.extrinsic_timepoint = payload.call_timepoint;
        assert_eq!(from_notification(id(9), &payload).status, SigningStatus::PendingSigned);
    }
}
