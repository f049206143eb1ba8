//! Secure messaging capability
//!
//! Signatories of a multisig share a room. After submitting its own approval
//! or cancellation a device posts an [`ApprovePayload`] there; peers feed the
//! payloads they receive into the multisig tracker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::types::{opt_hex_bytes, AccountId, CallHash, ChainId, Timepoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApproveAction {
    #[default]
    Approve,
    Cancel,
}

/// Notification a signatory posts after acting on a multisig call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayload {
    pub sender_account_id: AccountId,
    pub chain_id: ChainId,
    pub call_hash: CallHash,
    #[serde(default, with = "opt_hex_bytes")]
    pub call_data: Option<Vec<u8>>,
    /// Where the sender's own extrinsic landed
    pub extrinsic_timepoint: Timepoint,
    pub extrinsic_hash: String,
    /// The sender's extrinsic failed
    #[serde(default)]
    pub error: bool,
    /// Creation timepoint of the multisig call
    pub call_timepoint: Timepoint,
    #[serde(default)]
    pub action: ApproveAction,
}

#[async_trait]
pub trait SecureMessenger: Send + Sync {
    async fn send_approve(&self, room_id: &str, payload: &ApprovePayload) -> AppResult<()>;
}

/// Messenger that keeps every sent payload in memory
#[derive(Debug, Default)]
pub struct InMemoryMessenger {
    sent: Mutex<Vec<(String, ApprovePayload)>>,
    failing: AtomicBool,
}

impl InMemoryMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, ApprovePayload)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SecureMessenger for InMemoryMessenger {
    async fn send_approve(&self, room_id: &str, payload: &ApprovePayload) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Messaging(format!("room {} unreachable", room_id)));
        }
        debug!("Posting {:?} for {} to room {}", payload.action, payload.call_hash, room_id);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((room_id.to_string(), payload.clone()));
        Ok(())
    }
}
