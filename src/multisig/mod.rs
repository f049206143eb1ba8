//! Multisig consensus tracking
//!
//! - **fold** - pure state machine over deduplicated signing events
//! - **events** - chain events and peer notifications as signing events
//! - **tracker** - persists folded state and posts this device's actions
//! - **builders** - approve/cancel transactions for follow-up signatories

pub mod builders;
pub mod events;
pub mod fold;
pub mod tracker;

pub use builders::{build_approve_tx, build_reject_tx};
pub use events::{from_chain_event, from_notification};
pub use fold::{derive_status, fold, MultisigState};
pub use tracker::{LocalSubmission, MultisigTracker};

use crate::codec::derive_multisig_account_id;
use crate::errors::AppResult;
use crate::types::{AccountId, MultisigDetails};

/// Account id the signatory set and threshold of `details` derive to
pub fn multisig_account_id(details: &MultisigDetails) -> AppResult<AccountId> {
    derive_multisig_account_id(&details.signatory_ids(), details.threshold)
}
