//! Concurrent extrinsic submission with per-extrinsic outcomes

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ChainApi, ExtrinsicInclusion, ExtrinsicStatus};

/// Signed extrinsic ready for broadcast
#[derive(Debug, Clone)]
pub struct SignedExtrinsic {
    /// Caller-side label (signatory, shard, ...)
    pub label: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub label: String,
    pub result: Result<ExtrinsicInclusion, String>,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    pub outcomes: Vec<SubmissionOutcome>,
}

impl SubmissionSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubmissionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.total()
    }
}

impl fmt::Display for SubmissionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} succeeded", self.succeeded(), self.total())
    }
}

/// Follow one extrinsic until it is finalized or rejected
async fn submit_one(chain: Arc<dyn ChainApi>, extrinsic: SignedExtrinsic) -> SubmissionOutcome {
    let label = extrinsic.label.clone();
    let mut statuses = match chain.submit_and_watch(extrinsic.bytes).await {
        Ok(statuses) => statuses,
        Err(e) => {
            warn!("Submission of {} failed: {}", label, e);
            return SubmissionOutcome {
                label,
                result: Err(e.to_string()),
            };
        }
    };

    let mut last_inclusion = None;
    while let Some(status) = statuses.recv().await {
        match status {
            ExtrinsicStatus::Ready => debug!("{} ready", label),
            ExtrinsicStatus::InBlock(inclusion) => {
                debug!("{} in block {}", label, inclusion.block_number);
                last_inclusion = Some(inclusion);
            }
            ExtrinsicStatus::Finalized(inclusion) => {
                last_inclusion = Some(inclusion);
                break;
            }
            ExtrinsicStatus::Invalid(reason) => {
                warn!("{} rejected: {}", label, reason);
                return SubmissionOutcome {
                    label,
                    result: Err(reason),
                };
            }
        }
    }

    let result = match last_inclusion {
        Some(inclusion) => match inclusion.failure_reason() {
            Some(reason) => Err(reason.to_string()),
            None => Ok(inclusion),
        },
        None => Err("status stream closed before inclusion".to_string()),
    };
    SubmissionOutcome { label, result }
}

/// Submit every extrinsic with at most `concurrency` in flight
///
/// Outcomes are returned in input order; one failure never affects the others.
pub async fn submit_all(
    chain: Arc<dyn ChainApi>,
    extrinsics: Vec<SignedExtrinsic>,
    concurrency: usize,
) -> SubmissionSummary {
    let outcomes: Vec<SubmissionOutcome> = stream::iter(extrinsics)
        .map(|extrinsic| submit_one(chain.clone(), extrinsic))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let summary = SubmissionSummary { outcomes };
    info!("Submission on {}: {}", chain.chain_id(), summary);
    summary
}
