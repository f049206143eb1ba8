//! Pure diff between on-chain proxy storage and the locally stored view
//!
//! Only relationships touching a wallet account are kept: the wallet either
//! controls the delegate (and so gains a proxied account) or is itself the
//! proxied side. Re-running the diff against its own applied output yields
//! no changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::storage::OnChainProxies;
use crate::types::{
    AccountId, ChainId, ProxiedAccount, ProxyAccount, ProxyDeposits, ProxyVariant,
};

/// Everything one reconciliation pass needs, as plain data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProxiesRequest {
    pub chain_id: ChainId,
    /// Wallet accounts that can act as a delegate
    pub accounts_for_proxy: BTreeSet<AccountId>,
    /// Wallet accounts whose own proxies are tracked
    pub accounts_for_proxied: BTreeSet<AccountId>,
    /// Proxied accounts currently stored for the chain
    pub proxied_accounts: Vec<ProxiedAccount>,
    /// Proxies currently stored for the chain
    pub proxies: Vec<ProxyAccount>,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxiesDiff {
    pub proxies_to_add: Vec<ProxyAccount>,
    pub proxies_to_remove: Vec<ProxyAccount>,
    pub proxied_to_add: Vec<ProxiedAccount>,
    pub proxied_to_remove: Vec<ProxiedAccount>,
    /// Current deposit of every wallet-relevant proxied account
    pub deposits: ProxyDeposits,
    /// Proxied accounts whose storage could not be read this pass; their
    /// stored relationships and deposits stay as they are
    #[serde(default)]
    pub unresolved: BTreeSet<AccountId>,
}

impl ProxiesDiff {
    pub fn empty(chain_id: impl Into<ChainId>) -> Self {
        Self {
            proxies_to_add: Vec::new(),
            proxies_to_remove: Vec::new(),
            proxied_to_add: Vec::new(),
            proxied_to_remove: Vec::new(),
            deposits: ProxyDeposits::new(chain_id),
            unresolved: BTreeSet::new(),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.deposits.chain_id
    }

    /// No relationship changes (deposits aside)
    pub fn is_empty(&self) -> bool {
        self.proxies_to_add.is_empty()
            && self.proxies_to_remove.is_empty()
            && self.proxied_to_add.is_empty()
            && self.proxied_to_remove.is_empty()
    }
}

pub fn reconcile(request: &GetProxiesRequest, on_chain: &[OnChainProxies]) -> ProxiesDiff {
    reconcile_partial(request, on_chain, &BTreeSet::new())
}

/// [`reconcile`] over a scan that could not decode the entries of `unresolved`
///
/// Nothing belonging to an unresolved proxied account is removed, since its
/// absence from `on_chain` says nothing about the chain.
pub fn reconcile_partial(
    request: &GetProxiesRequest,
    on_chain: &[OnChainProxies],
    unresolved: &BTreeSet<AccountId>,
) -> ProxiesDiff {
    let chain_id = &request.chain_id;
    let mut diff = ProxiesDiff::empty(chain_id.clone());
    diff.unresolved = unresolved.clone();

    let known_proxies: Vec<&ProxyAccount> = request
        .proxies
        .iter()
        .filter(|p| &p.chain_id == chain_id)
        .collect();
    let known_proxied: Vec<&ProxiedAccount> = request
        .proxied_accounts
        .iter()
        .filter(|p| &p.chain_id == chain_id)
        .collect();

    let mut seen_proxies: Vec<ProxyAccount> = Vec::new();
    let mut seen_proxied: Vec<ProxiedAccount> = Vec::new();

    for entry in on_chain {
        let proxied_is_ours = request.accounts_for_proxied.contains(&entry.proxied);
        let mut relevant = false;

        for definition in &entry.delegates {
            let delegate_is_ours = request.accounts_for_proxy.contains(&definition.delegate);
            if !delegate_is_ours && !proxied_is_ours {
                continue;
            }
            relevant = true;

            let proxy = ProxyAccount {
                chain_id: chain_id.clone(),
                proxied_account_id: entry.proxied,
                account_id: definition.delegate,
                proxy_type: definition.proxy_type,
                delay: definition.delay,
            };

            let already_known = known_proxies.iter().any(|p| p.is_same_proxy(&proxy));
            let already_added = diff.proxies_to_add.iter().any(|p| p.is_same_proxy(&proxy));
            if !already_known && !already_added {
                diff.proxies_to_add.push(proxy.clone());
            }

            if delegate_is_ours {
                let proxied = ProxiedAccount::from_proxy(&proxy, ProxyVariant::Regular);
                let known = known_proxied.iter().any(|p| p.is_same_proxied(&proxied));
                let added = diff.proxied_to_add.iter().any(|p| p.is_same_proxied(&proxied));
                if !known && !added {
                    diff.proxied_to_add.push(proxied.clone());
                }
                seen_proxied.push(proxied);
            }
            seen_proxies.push(proxy);
        }

        if relevant {
            diff.deposits.deposits.insert(entry.proxied, entry.deposit);
        }
    }

    // Stale rows for accounts no longer in the wallet are left alone
    diff.proxies_to_remove = known_proxies
        .into_iter()
        .filter(|p| !seen_proxies.iter().any(|seen| seen.is_same_proxy(p)))
        .filter(|p| !unresolved.contains(&p.proxied_account_id))
        .filter(|p| {
            request.accounts_for_proxy.contains(&p.account_id)
                || request.accounts_for_proxied.contains(&p.proxied_account_id)
        })
        .cloned()
        .collect();

    diff.proxied_to_remove = known_proxied
        .into_iter()
        .filter(|p| !seen_proxied.iter().any(|seen| seen.is_same_proxied(p)))
        .filter(|p| !unresolved.contains(&p.account_id))
        .filter(|p| request.accounts_for_proxy.contains(&p.proxy_account_id))
        .cloned()
        .collect();

    diff
}

/// `request` as it would look after `diff` was applied
pub fn apply_to_request(request: &GetProxiesRequest, diff: &ProxiesDiff) -> GetProxiesRequest {
    let mut next = request.clone();
    next.proxies
        .retain(|p| !diff.proxies_to_remove.iter().any(|r| r.is_same_proxy(p)));
    next.proxies.extend(diff.proxies_to_add.iter().cloned());
    next.proxied_accounts
        .retain(|p| !diff.proxied_to_remove.iter().any(|r| r.is_same_proxied(p)));
    next.proxied_accounts
        .extend(diff.proxied_to_add.iter().cloned());
    next
}
