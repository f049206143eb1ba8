//! Balance cross-check between a light-client handle and a trusted relay handle

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::ChainApi;
use crate::types::{AccountBalance, AccountId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Both sides agree; the balance is marked verified
    Verified(AccountBalance),
    /// Both sides answered with different values
    Mismatch {
        light: Option<AccountBalance>,
        relay: Option<AccountBalance>,
    },
    /// Stopped before both sides answered, or a read failed
    NotVerified,
}

fn same_amounts(a: &AccountBalance, b: &AccountBalance) -> bool {
    a.free == b.free && a.reserved == b.reserved && a.frozen == b.frozen
}

/// Cross-check `account_id`'s balance on both handles
///
/// Waits on a fixed `retry_delay` until both handles report connected. A
/// `true` on `stop` (or a dropped sender) ends the wait with `NotVerified`.
/// A failed read is reported as `NotVerified`, never as an error.
pub async fn verify_balance(
    light: Arc<dyn ChainApi>,
    relay: Arc<dyn ChainApi>,
    account_id: AccountId,
    asset_id: u32,
    retry_delay: Duration,
    mut stop: watch::Receiver<bool>,
) -> VerificationOutcome {
    loop {
        if *stop.borrow() {
            info!("Verification for {} stopped", light.chain_id());
            return VerificationOutcome::NotVerified;
        }

        if light.is_connected().await && relay.is_connected().await {
            break;
        }

        debug!(
            "Waiting {:?} for {} and {} to connect",
            retry_delay,
            light.chain_id(),
            relay.chain_id()
        );
        tokio::select! {
            _ = sleep(retry_delay) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    return VerificationOutcome::NotVerified;
                }
            }
        }
    }

    let light_balance = match light.account_balance(&account_id, asset_id).await {
        Ok(balance) => balance,
        Err(e) => {
            warn!("Light client balance read failed for {}: {}", account_id, e);
            return VerificationOutcome::NotVerified;
        }
    };
    let relay_balance = match relay.account_balance(&account_id, asset_id).await {
        Ok(balance) => balance,
        Err(e) => {
            warn!("Relay balance read failed for {}: {}", account_id, e);
            return VerificationOutcome::NotVerified;
        }
    };

    match (light_balance, relay_balance) {
        (Some(light), Some(relay)) if same_amounts(&light, &relay) => {
            VerificationOutcome::Verified(AccountBalance {
                verified: true,
                ..light
            })
        }
        (light, relay) => {
            warn!("Balance mismatch for {} on {}", account_id, balance_chain(&light, &relay));
            VerificationOutcome::Mismatch { light, relay }
        }
    }
}

fn balance_chain(light: &Option<AccountBalance>, relay: &Option<AccountBalance>) -> String {
    light
        .as_ref()
        .or(relay.as_ref())
        .map(|b| b.chain_id.clone())
        .unwrap_or_default()
}
