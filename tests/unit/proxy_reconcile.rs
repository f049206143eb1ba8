//! Reconciliation reaches a fixed point

use delegation_engine::proxy::{
    apply_to_request, reconcile, GetProxiesRequest, OnChainProxies, ProxyDefinition,
};
use delegation_engine::types::{ProxiedAccount, ProxyAccount, ProxyType, ProxyVariant};

use crate::common::fixtures::{id, CHAIN};

fn request(own: &[u8]) -> GetProxiesRequest {
    let own: std::collections::BTreeSet<_> = own.iter().map(|b| id(*b)).collect();
    GetProxiesRequest {
        chain_id: CHAIN.to_string(),
        accounts_for_proxy: own.clone(),
        accounts_for_proxied: own,
        proxied_accounts: Vec::new(),
        proxies: Vec::new(),
    }
}

fn on_chain(proxied: u8, delegates: &[(u8, ProxyType, u32)], deposit: u128) -> OnChainProxies {
    OnChainProxies {
        proxied: id(proxied),
        delegates: delegates
            .iter()
            .map(|(delegate, proxy_type, delay)| ProxyDefinition {
                delegate: id(*delegate),
                proxy_type: *proxy_type,
                delay: *delay,
            })
            .collect(),
        deposit,
    }
}

fn proxy(proxied: u8, delegate: u8, proxy_type: ProxyType) -> ProxyAccount {
    ProxyAccount {
        chain_id: CHAIN.to_string(),
        proxied_account_id: id(proxied),
        account_id: id(delegate),
        proxy_type,
        delay: 0,
    }
}

/// Chain states a wallet holding accounts 1, 2 and 3 may observe
fn scenarios() -> Vec<Vec<OnChainProxies>> {
    vec![
        Vec::new(),
        vec![on_chain(50, &[(1, ProxyType::Any, 0)], 100)],
        vec![
            on_chain(50, &[(1, ProxyType::Any, 0), (2, ProxyType::Staking, 10)], 200),
            on_chain(2, &[(60, ProxyType::Governance, 0)], 150),
            on_chain(70, &[(71, ProxyType::Any, 0)], 300),
        ],
        vec![
            // Same relationship reported twice
            on_chain(51, &[(3, ProxyType::NonTransfer, 0)], 120),
            on_chain(51, &[(3, ProxyType::NonTransfer, 0)], 120),
            on_chain(1, &[(2, ProxyType::Any, 0), (3, ProxyType::Any, 5)], 250),
        ],
    ]
}

#[test]
fn test_second_pass_is_empty() {
    for chain in scenarios() {
        let first_request = request(&[1, 2, 3]);
        let first = reconcile(&first_request, &chain);

        let second_request = apply_to_request(&first_request, &first);
        let second = reconcile(&second_request, &chain);
        assert!(second.is_empty(), "not a fixed point: {:?}", second);
        assert_eq!(second.deposits, first.deposits);
    }
}

#[test]
fn test_every_transition_settles_in_one_pass() {
    let states = scenarios();
    for from in &states {
        for to in &states {
            let start = request(&[1, 2, 3]);
            let settled = apply_to_request(&start, &reconcile(&start, from));

            let moved = apply_to_request(&settled, &reconcile(&settled, to));
            assert!(reconcile(&moved, to).is_empty());

            // Landing in `to` from anywhere gives the same stored view
            let direct = apply_to_request(&start, &reconcile(&start, to));
            let mut moved_proxies = moved.proxies.clone();
            let mut direct_proxies = direct.proxies.clone();
            moved_proxies.sort();
            direct_proxies.sort();
            assert_eq!(moved_proxies, direct_proxies);
            assert_eq!(moved.proxied_accounts.len(), direct.proxied_accounts.len());
        }
    }
}

#[test]
fn test_relationships_outside_the_wallet_are_untouched() {
    let mut stored = request(&[1]);
    // Left behind by an account that has since been removed from the wallet
    stored.proxies.push(proxy(80, 9, ProxyType::Any));
    stored.proxied_accounts.push(ProxiedAccount::from_proxy(
        &proxy(80, 9, ProxyType::Any),
        ProxyVariant::Regular,
    ));

    let diff = reconcile(&stored, &[]);
    assert!(diff.is_empty());
    assert!(diff.deposits.deposits.is_empty());
}

#[test]
fn test_pure_and_regular_views_agree() {
    let mut stored = request(&[1]);
    let pure = proxy(90, 1, ProxyType::Any);
    stored.proxies.push(pure.clone());
    stored
        .proxied_accounts
        .push(ProxiedAccount::from_proxy(&pure, ProxyVariant::Pure));

    let diff = reconcile(&stored, &[on_chain(90, &[(1, ProxyType::Any, 0)], 100)]);
    assert!(diff.is_empty());
    assert_eq!(diff.deposits.deposits[&id(90)], 100);
}
