//! Proxy reconciliation against a snapshot chain through the worker

use delegation_engine::chain::{
    account_storage_key, ChainEvent, ChainSnapshot, EventRecord, SnapshotChain,
    SnapshotConnector, SnapshotProxies, StorageEntry,
};
use delegation_engine::config::{ChainConfig, ConnectionConfig};
use delegation_engine::database::{AccountOperations, Database, ProxyOperations, ScopeLocks};
use delegation_engine::proxy::{ProxyDefinition, ProxyPoller, ProxyReconciler, ProxyWorkerHandle};
use delegation_engine::types::{AccountKind, ProxyType, ProxyVariant};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::common::fixtures::{base_account, chain_config, id, snapshot_chain, CHAIN};

fn fast_connection() -> ConnectionConfig {
    ConnectionConfig {
        max_retries: 1,
        initial_backoff_ms: 1,
        ..ConnectionConfig::default()
    }
}

fn entry(proxied: u8, delegate: u8, proxy_type: ProxyType, deposit: u128) -> SnapshotProxies {
    SnapshotProxies {
        proxied: id(proxied),
        delegates: vec![ProxyDefinition {
            delegate: id(delegate),
            proxy_type,
            delay: 0,
        }],
        deposit,
    }
}

/// Wallet with base accounts A = 1 and D = 4
fn wallet_db() -> Arc<Mutex<Database>> {
    let mut db = Database::new(":memory:").unwrap();
    let wallet = db.create_wallet("main").unwrap();
    db.insert_account(&base_account(wallet, "A", id(1))).unwrap();
    db.insert_account(&base_account(wallet, "D", id(4))).unwrap();
    Arc::new(Mutex::new(db))
}

async fn reconciler_for(chain: Arc<SnapshotChain>, db: Arc<Mutex<Database>>) -> ProxyReconciler {
    let worker = ProxyWorkerHandle::spawn(
        Arc::new(SnapshotConnector::new().with_chain(chain)),
        fast_connection(),
        4,
    );
    assert!(worker.init_connection(chain_config()).await.unwrap());
    ProxyReconciler::new(db, worker, ScopeLocks::new())
}

#[tokio::test]
async fn test_sync_reaches_fixed_point_and_follows_removals() {
    let chain = snapshot_chain();
    chain.set_proxies(vec![
        // A may act for X
        entry(50, 1, ProxyType::Any, 1_000),
        // Z may act for D
        entry(4, 60, ProxyType::Staking, 500),
        // Nothing to do with the wallet
        entry(70, 71, ProxyType::Governance, 900),
    ]);
    let db = wallet_db();
    let reconciler = reconciler_for(chain.clone(), db.clone()).await;

    let first = reconciler.sync_chain(CHAIN).await.unwrap();
    assert_eq!(first.proxies_to_add.len(), 2);
    assert_eq!(first.proxied_to_add.len(), 1);
    assert_eq!(first.proxied_to_add[0].account_id, id(50));
    assert_eq!(first.proxied_to_add[0].proxy_account_id, id(1));
    assert_eq!(first.deposits.deposits.len(), 2);
    assert_eq!(first.deposits.deposits[&id(50)], 1_000);
    assert_eq!(first.deposits.deposits[&id(4)], 500);

    {
        let db = db.lock().unwrap();
        assert_eq!(db.get_proxies(CHAIN).unwrap().len(), 2);
        let proxied = db.find_account(&id(50), CHAIN).unwrap().unwrap();
        match &proxied.kind {
            AccountKind::Proxied(details) => {
                assert_eq!(details.proxy_account_id, id(1));
                assert_eq!(details.proxy_type, ProxyType::Any);
                assert_eq!(details.proxy_variant, ProxyVariant::Regular);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(db.find_account(&id(70), CHAIN).unwrap().is_none());
    }

    // Nothing changed on chain, nothing to do
    let second = reconciler.sync_chain(CHAIN).await.unwrap();
    assert!(second.is_empty());

    // X drops A
    chain.set_proxies(vec![entry(4, 60, ProxyType::Staking, 500)]);
    let third = reconciler.sync_chain(CHAIN).await.unwrap();
    assert_eq!(third.proxies_to_remove.len(), 1);
    assert_eq!(third.proxies_to_remove[0].proxied_account_id, id(50));
    assert_eq!(third.proxied_to_remove.len(), 1);
    assert!(third.proxies_to_add.is_empty());

    let db = db.lock().unwrap();
    assert!(db.find_account(&id(50), CHAIN).unwrap().is_none());
    assert_eq!(db.get_proxies(CHAIN).unwrap().len(), 1);
    assert_eq!(db.get_accounts().unwrap().len(), 2);
    let deposits = db.get_proxy_deposits(CHAIN).unwrap();
    assert_eq!(deposits.deposits.len(), 1);
    assert_eq!(deposits.deposits[&id(4)], 500);
}

#[tokio::test]
async fn test_unreadable_entry_keeps_wallet_relationships() {
    let chain = snapshot_chain();
    chain.set_proxies(vec![
        entry(50, 1, ProxyType::Any, 1_000),
        entry(4, 60, ProxyType::Staking, 500),
    ]);
    let db = wallet_db();
    let reconciler = reconciler_for(chain.clone(), db.clone()).await;
    reconciler.sync_chain(CHAIN).await.unwrap();

    // X's entry turns into something the engine cannot decode, D's is gone
    chain.set_proxies(Vec::new());
    chain.set_raw_storage(vec![StorageEntry {
        key: account_storage_key("Proxy", "Proxies", &id(50)),
        value: vec![4, 1, 2],
    }]);
    let diff = reconciler.sync_chain(CHAIN).await.unwrap();
    assert!(diff.unresolved.contains(&id(50)));
    assert!(diff.proxied_to_remove.is_empty());
    assert_eq!(diff.proxies_to_remove.len(), 1);
    assert_eq!(diff.proxies_to_remove[0].proxied_account_id, id(4));

    let db = db.lock().unwrap();
    assert!(db.find_account(&id(50), CHAIN).unwrap().is_some());
    let proxies = db.get_proxies(CHAIN).unwrap();
    assert_eq!(proxies.len(), 1);
    assert_eq!(proxies[0].proxied_account_id, id(50));
    let deposits = db.get_proxy_deposits(CHAIN).unwrap();
    assert_eq!(deposits.deposits.len(), 1);
    assert_eq!(deposits.deposits[&id(50)], 1_000);
}

#[tokio::test]
async fn test_pure_proxy_registration() {
    let chain = snapshot_chain();
    let db = wallet_db();
    let reconciler = reconciler_for(chain.clone(), db.clone()).await;

    let created = EventRecord {
        block_number: 12,
        extrinsic_index: 3,
        extrinsic_hash: None,
        event: ChainEvent::PureCreated {
            pure: id(80),
            who: id(1),
            proxy_type: ProxyType::Any,
            disambiguation_index: 0,
        },
    };
    assert!(reconciler.apply_pure_created(CHAIN, &created).await.unwrap());
    // Replaying the event adds nothing
    assert!(!reconciler.apply_pure_created(CHAIN, &created).await.unwrap());

    let foreign = EventRecord {
        event: ChainEvent::PureCreated {
            pure: id(81),
            who: id(99),
            proxy_type: ProxyType::Any,
            disambiguation_index: 0,
        },
        ..created.clone()
    };
    assert!(!reconciler.apply_pure_created(CHAIN, &foreign).await.unwrap());

    {
        let db = db.lock().unwrap();
        let pure = db.find_account(&id(80), CHAIN).unwrap().unwrap();
        assert_eq!(
            pure.proxied_details().unwrap().proxy_variant,
            ProxyVariant::Pure
        );
        assert!(db.find_account(&id(81), CHAIN).unwrap().is_none());
    }

    // Once the chain reports the pure proxy the next pass has nothing to add
    chain.set_proxies(vec![entry(80, 1, ProxyType::Any, 1_000)]);
    let diff = reconciler.sync_chain(CHAIN).await.unwrap();
    assert!(diff.is_empty());
    assert_eq!(diff.deposits.deposits[&id(80)], 1_000);
}

#[tokio::test]
async fn test_poller_skips_unreachable_chains() {
    let chain = snapshot_chain();
    chain.set_proxies(vec![entry(50, 1, ProxyType::Any, 1_000)]);
    let db = wallet_db();
    let worker = ProxyWorkerHandle::spawn(
        Arc::new(SnapshotConnector::new().with_chain(chain)),
        fast_connection(),
        4,
    );
    let reconciler = ProxyReconciler::new(db.clone(), worker, ScopeLocks::new());

    let unreachable = ChainConfig::new("0xdead", "Nowhere");
    let mut poller = ProxyPoller::new(
        reconciler,
        vec![chain_config(), unreachable],
        Duration::from_millis(10),
    );
    assert_eq!(poller.poll_once().await, 1);
    assert!(db
        .lock()
        .unwrap()
        .find_account(&id(50), CHAIN)
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_poller_stops_on_signal() {
    let snapshot = ChainSnapshot::new(CHAIN);
    let chain = Arc::new(SnapshotChain::new(snapshot));
    let db = wallet_db();
    let worker = ProxyWorkerHandle::spawn(
        Arc::new(SnapshotConnector::new().with_chain(chain)),
        fast_connection(),
        4,
    );
    let reconciler = ProxyReconciler::new(db, worker, ScopeLocks::new());
    let poller = ProxyPoller::new(reconciler, vec![chain_config()], Duration::from_millis(10));

    let (stop, stop_rx) = watch::channel(false);
    let running = tokio::spawn(poller.run(stop_rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.send(true).unwrap();

    let passes = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert!(passes >= 1);
}
