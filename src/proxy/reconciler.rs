//! Applies worker diffs to the database
//!
//! A pass for one chain holds that chain's proxy scope lock from reading the
//! stored view until the diff is written, so two passes never interleave.
//! The database mutex itself is only held for the synchronous reads and
//! writes, never while waiting on the worker.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::reconcile::{GetProxiesRequest, ProxiesDiff};
use super::worker::ProxyWorkerHandle;
use crate::chain::{ChainEvent, EventRecord};
use crate::database::{AccountOperations, Database, ProxyOperations, ScopeLocks};
use crate::errors::AppResult;
use crate::types::{AccountKind, ProxiedAccount, ProxyAccount, ProxyVariant};

fn proxy_scope(chain_id: &str) -> String {
    format!("proxies:{}", chain_id)
}

/// Current stored view of `chain_id`, as a worker request
///
/// Base and multisig accounts count on both sides. Proxied accounts are
/// themselves products of reconciliation and are left out.
pub fn build_request(db: &Database, chain_id: &str) -> AppResult<GetProxiesRequest> {
    let own: BTreeSet<_> = db
        .get_accounts_for_chain(chain_id)?
        .into_iter()
        .filter(|a| !matches!(a.kind, AccountKind::Proxied(_)))
        .map(|a| a.account_id)
        .collect();

    Ok(GetProxiesRequest {
        chain_id: chain_id.to_string(),
        accounts_for_proxy: own.clone(),
        accounts_for_proxied: own,
        proxied_accounts: db.get_proxied_accounts(chain_id)?,
        proxies: db.get_proxies(chain_id)?,
    })
}

#[derive(Clone)]
pub struct ProxyReconciler {
    db: Arc<Mutex<Database>>,
    worker: ProxyWorkerHandle,
    locks: ScopeLocks,
}

impl ProxyReconciler {
    pub fn new(db: Arc<Mutex<Database>>, worker: ProxyWorkerHandle, locks: ScopeLocks) -> Self {
        Self { db, worker, locks }
    }

    pub fn worker(&self) -> &ProxyWorkerHandle {
        &self.worker
    }

    /// Run one reconciliation pass for `chain_id` and store its result
    pub async fn sync_chain(&self, chain_id: &str) -> AppResult<ProxiesDiff> {
        let _scope = self.locks.acquire(&proxy_scope(chain_id)).await;

        let request = {
            let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
            build_request(&db, chain_id)?
        };
        let diff = self.worker.get_proxies(request).await?;

        {
            let mut db = self.db.lock().unwrap_or_else(|e| e.into_inner());
            db.apply_proxies_diff(&diff)?;
        }

        if diff.is_empty() {
            debug!("Proxies on {} unchanged", chain_id);
        } else {
            info!(
                "Reconciled proxies on {}: +{} -{} proxies, +{} -{} proxied accounts",
                chain_id,
                diff.proxies_to_add.len(),
                diff.proxies_to_remove.len(),
                diff.proxied_to_add.len(),
                diff.proxied_to_remove.len()
            );
        }
        Ok(diff)
    }

    /// Register the pure proxy announced by a `PureCreated` event
    ///
    /// Only pure proxies spawned by a wallet account are stored. Returns
    /// whether anything was added.
    pub async fn apply_pure_created(&self, chain_id: &str, record: &EventRecord) -> AppResult<bool> {
        let (pure, who, proxy_type) = match &record.event {
            ChainEvent::PureCreated {
                pure,
                who,
                proxy_type,
                ..
            } => (*pure, *who, *proxy_type),
            _ => return Ok(false),
        };

        let _scope = self.locks.acquire(&proxy_scope(chain_id)).await;
        let mut db = self.db.lock().unwrap_or_else(|e| e.into_inner());

        let spawner_is_ours = db
            .find_account(&who, chain_id)?
            .is_some_and(|a| !matches!(a.kind, AccountKind::Proxied(_)));
        if !spawner_is_ours {
            debug!("Ignoring pure proxy {} spawned by foreign {}", pure, who);
            return Ok(false);
        }

        let proxy = ProxyAccount {
            chain_id: chain_id.to_string(),
            proxied_account_id: pure,
            account_id: who,
            proxy_type,
            delay: 0,
        };
        let proxied = ProxiedAccount::from_proxy(&proxy, ProxyVariant::Pure);
        if db
            .get_proxied_accounts(chain_id)?
            .iter()
            .any(|p| p.is_same_proxied(&proxied))
        {
            return Ok(false);
        }

        let diff = ProxiesDiff {
            proxies_to_add: vec![proxy],
            proxied_to_add: vec![proxied],
            deposits: db.get_proxy_deposits(chain_id)?,
            ..ProxiesDiff::empty(chain_id)
        };
        db.apply_proxies_diff(&diff)?;
        info!(
            "Registered pure proxy {} controlled by {} at block {}",
            pure, who, record.block_number
        );
        Ok(true)
    }
}
