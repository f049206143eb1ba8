//! Multisig transaction records and the events folded into them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::common::{opt_hex_bytes, AccountId, Balance, CallHash, ChainId, Timepoint};
use super::transaction::TxPayload;

/// Unique identity of a multisig transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MultisigTxKey {
    pub account_id: AccountId,
    pub chain_id: ChainId,
    pub call_hash: CallHash,
    pub block_created: u32,
    pub index_created: u32,
}

impl MultisigTxKey {
    pub fn new(
        account_id: AccountId,
        chain_id: impl Into<ChainId>,
        call_hash: CallHash,
        timepoint: Timepoint,
    ) -> Self {
        Self {
            account_id,
            chain_id: chain_id.into(),
            call_hash,
            block_created: timepoint.height,
            index_created: timepoint.index,
        }
    }

    pub fn timepoint(&self) -> Timepoint {
        Timepoint::new(self.block_created, self.index_created)
    }
}

impl fmt::Display for MultisigTxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}@{}",
            self.chain_id,
            self.account_id,
            self.call_hash,
            self.timepoint()
        )
    }
}

/// Lifecycle of a multisig transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MultisigTxStatus {
    Signing,
    Established,
    Executed,
    Cancelled,
    Error,
}

impl MultisigTxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MultisigTxStatus::Executed | MultisigTxStatus::Cancelled | MultisigTxStatus::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MultisigTxStatus::Signing => "SIGNING",
            MultisigTxStatus::Established => "ESTABLISHED",
            MultisigTxStatus::Executed => "EXECUTED",
            MultisigTxStatus::Cancelled => "CANCELLED",
            MultisigTxStatus::Error => "ERROR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SIGNING" => Some(MultisigTxStatus::Signing),
            "ESTABLISHED" => Some(MultisigTxStatus::Established),
            "EXECUTED" => Some(MultisigTxStatus::Executed),
            "CANCELLED" => Some(MultisigTxStatus::Cancelled),
            "ERROR" => Some(MultisigTxStatus::Error),
            _ => None,
        }
    }
}

/// One signatory's action on a multisig transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigningStatus {
    PendingSigned,
    Signed,
    ErrorSigned,
    Cancelled,
    ErrorCancelled,
}

impl SigningStatus {
    /// Approvals that count towards the signatory set
    pub fn is_approval(&self) -> bool {
        matches!(self, SigningStatus::PendingSigned | SigningStatus::Signed)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SigningStatus::ErrorSigned | SigningStatus::ErrorCancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SigningStatus::PendingSigned => "PENDING_SIGNED",
            SigningStatus::Signed => "SIGNED",
            SigningStatus::ErrorSigned => "ERROR_SIGNED",
            SigningStatus::Cancelled => "CANCELLED",
            SigningStatus::ErrorCancelled => "ERROR_CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING_SIGNED" => Some(SigningStatus::PendingSigned),
            "SIGNED" => Some(SigningStatus::Signed),
            "ERROR_SIGNED" => Some(SigningStatus::ErrorSigned),
            "CANCELLED" => Some(SigningStatus::Cancelled),
            "ERROR_CANCELLED" => Some(SigningStatus::ErrorCancelled),
            _ => None,
        }
    }
}

/// Channel an event was learned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Chain,
    Messenger,
    /// This device's own submission
    Local,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Chain => "chain",
            EventSource::Messenger => "messenger",
            EventSource::Local => "local",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chain" => Some(EventSource::Chain),
            "messenger" => Some(EventSource::Messenger),
            "local" => Some(EventSource::Local),
            _ => None,
        }
    }
}

/// Result of the call dispatched by a final approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Failed,
}

/// Immutable fact: one signatory's action at a given timepoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigEvent {
    pub tx: MultisigTxKey,
    pub account_id: AccountId,
    pub status: SigningStatus,
    pub source: EventSource,
    /// Set when the approval dispatched the call
    #[serde(default)]
    pub execution: Option<ExecutionOutcome>,
    #[serde(default)]
    pub extrinsic_hash: Option<String>,
    #[serde(default)]
    pub event_block: Option<u32>,
    #[serde(default)]
    pub event_index: Option<u32>,
    pub date_created: i64,
}

/// Deduplication key of a [`MultisigEvent`]
pub type MultisigEventKey = (MultisigTxKey, AccountId, SigningStatus);

impl MultisigEvent {
    pub fn new(
        tx: MultisigTxKey,
        account_id: AccountId,
        status: SigningStatus,
        source: EventSource,
    ) -> Self {
        Self {
            tx,
            account_id,
            status,
            source,
            execution: None,
            extrinsic_hash: None,
            event_block: None,
            event_index: None,
            date_created: super::common::now_millis(),
        }
    }

    pub fn key(&self) -> MultisigEventKey {
        (self.tx.clone(), self.account_id, self.status)
    }
}

/// Canonical multisig transaction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigTransaction {
    pub key: MultisigTxKey,
    pub status: MultisigTxStatus,
    /// Accounts with an accepted approval
    pub signatories: BTreeSet<AccountId>,
    #[serde(default, with = "opt_hex_bytes")]
    pub call_data: Option<Vec<u8>>,
    pub deposit: Option<Balance>,
    pub depositor: Option<AccountId>,
    pub transaction: Option<TxPayload>,
    pub description: Option<String>,
    pub date_created: i64,
}

impl MultisigTransaction {
    pub fn new(key: MultisigTxKey) -> Self {
        Self {
            key,
            status: MultisigTxStatus::Signing,
            signatories: BTreeSet::new(),
            call_data: None,
            deposit: None,
            depositor: None,
            transaction: None,
            description: None,
            date_created: super::common::now_millis(),
        }
    }

    pub fn approvals_remaining(&self, threshold: u16) -> usize {
        (threshold as usize).saturating_sub(self.signatories.len())
    }
}
