//! Chain data-access capability
//!
//! The engine never talks to a node directly. Everything it needs from a
//! chain goes through [`ChainApi`], so any client satisfying the trait is
//! interchangeable:
//! - **registry** - call index lookups used by the composer and decoder
//! - **snapshot** - `ChainApi` backed by a JSON snapshot file
//! - **retry** - exponential backoff for transient chain calls
//! - **verification** - light-client vs relay-chain balance cross-check
//! - **submission** - concurrent submission with per-extrinsic outcomes

pub mod registry;
pub mod retry;
pub mod snapshot;
pub mod submission;
pub mod verification;

pub use registry::{CallRegistry, PalletCalls};
pub use retry::{calculate_next_backoff, execute_with_timeout, with_retry};
pub use snapshot::{ChainSnapshot, FeeSchedule, SnapshotChain, SnapshotConnector, SnapshotProxies};
pub use submission::{submit_all, SignedExtrinsic, SubmissionOutcome, SubmissionSummary};
pub use verification::{verify_balance, VerificationOutcome};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::ChainConfig;
use crate::errors::ChainResult;
use crate::types::{
    hex_bytes, AccountBalance, AccountId, Balance, CallHash, ExecutionOutcome, ProxyType,
    Timepoint,
};

/// Raw key/value pair from a storage map scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

/// 32-byte prefix shared by every key of a storage item
pub fn storage_prefix(pallet: &str, item: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(32);
    prefix.extend_from_slice(&Sha256::digest(pallet.as_bytes())[..16]);
    prefix.extend_from_slice(&Sha256::digest(item.as_bytes())[..16]);
    prefix
}

/// Key of an account-keyed storage map entry; the account id is the last 32 bytes
pub fn account_storage_key(pallet: &str, item: &str, account_id: &AccountId) -> Vec<u8> {
    let mut key = storage_prefix(pallet, item);
    key.extend_from_slice(&Sha256::digest(account_id.as_bytes())[..8]);
    key.extend_from_slice(account_id.as_bytes());
    key
}

/// Runtime events the engine reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ChainEvent {
    NewMultisig {
        approving: AccountId,
        multisig: AccountId,
        call_hash: CallHash,
    },
    MultisigApproval {
        approving: AccountId,
        timepoint: Timepoint,
        multisig: AccountId,
        call_hash: CallHash,
    },
    MultisigExecuted {
        approving: AccountId,
        timepoint: Timepoint,
        multisig: AccountId,
        call_hash: CallHash,
        result: ExecutionOutcome,
    },
    MultisigCancelled {
        cancelling: AccountId,
        timepoint: Timepoint,
        multisig: AccountId,
        call_hash: CallHash,
    },
    PureCreated {
        pure: AccountId,
        who: AccountId,
        proxy_type: ProxyType,
        disambiguation_index: u16,
    },
    ExtrinsicFailed {
        reason: String,
    },
    Other {
        section: String,
        method: String,
    },
}

/// Event together with the extrinsic that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub block_number: u32,
    pub extrinsic_index: u32,
    #[serde(default)]
    pub extrinsic_hash: Option<String>,
    pub event: ChainEvent,
}

impl EventRecord {
    pub fn timepoint(&self) -> Timepoint {
        Timepoint::new(self.block_number, self.extrinsic_index)
    }
}

/// Where an included extrinsic landed and what it emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrinsicInclusion {
    pub extrinsic_hash: String,
    pub block_number: u32,
    pub extrinsic_index: u32,
    pub events: Vec<ChainEvent>,
}

impl ExtrinsicInclusion {
    pub fn timepoint(&self) -> Timepoint {
        Timepoint::new(self.block_number, self.extrinsic_index)
    }

    /// Included without a dispatch failure
    pub fn is_success(&self) -> bool {
        !self
            .events
            .iter()
            .any(|e| matches!(e, ChainEvent::ExtrinsicFailed { .. }))
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            ChainEvent::ExtrinsicFailed { reason } => Some(reason.as_str()),
            _ => None,
        })
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.events
            .iter()
            .cloned()
            .map(|event| EventRecord {
                block_number: self.block_number,
                extrinsic_index: self.extrinsic_index,
                extrinsic_hash: Some(self.extrinsic_hash.clone()),
                event,
            })
            .collect()
    }
}

/// Progress of a submitted extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtrinsicStatus {
    Ready,
    InBlock(ExtrinsicInclusion),
    Finalized(ExtrinsicInclusion),
    /// Rejected by the pool or dropped before inclusion
    Invalid(String),
}

/// Chain data-access capability
#[async_trait]
pub trait ChainApi: Send + Sync {
    fn chain_id(&self) -> &str;

    fn registry(&self) -> &CallRegistry;

    async fn is_connected(&self) -> bool;

    async fn query(&self, key: &[u8]) -> ChainResult<Option<Vec<u8>>>;

    async fn query_storage_at(&self, keys: &[Vec<u8>]) -> ChainResult<Vec<Option<Vec<u8>>>>;

    /// Full scan of one storage map
    async fn storage_entries(&self, pallet: &str, item: &str) -> ChainResult<Vec<StorageEntry>>;

    /// SCALE-encoded runtime constant, `None` when the runtime lacks it
    async fn constant(&self, pallet: &str, name: &str) -> ChainResult<Option<Vec<u8>>>;

    async fn account_balance(
        &self,
        account_id: &AccountId,
        asset_id: u32,
    ) -> ChainResult<Option<AccountBalance>>;

    async fn estimate_fee(
        &self,
        call_data: &[u8],
        sender: &AccountId,
        asset_id: u32,
    ) -> ChainResult<Balance>;

    async fn submit_and_watch(
        &self,
        extrinsic: Vec<u8>,
    ) -> ChainResult<mpsc::Receiver<ExtrinsicStatus>>;
}

/// Opens chain handles from plain configuration
#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, chain: &ChainConfig) -> ChainResult<Arc<dyn ChainApi>>;
}
