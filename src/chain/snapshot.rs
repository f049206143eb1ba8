//! Snapshot-backed chain
//!
//! [`SnapshotChain`] serves the [`ChainApi`] from a JSON document describing
//! chain state: runtime constants, proxy storage, balances and a flat fee
//! schedule. The CLI uses it for offline runs; tests mutate it to simulate
//! chain changes between polls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    account_storage_key, storage_prefix, CallRegistry, ChainApi, ChainConnector, ChainEvent,
    ExtrinsicInclusion, ExtrinsicStatus, StorageEntry,
};
use crate::config::ChainConfig;
use crate::errors::{AppError, AppResult, ChainError, ChainResult};
use crate::proxy::storage::{encode_proxies_value, ProxyDefinition};
use crate::types::{AccountBalance, AccountId, Balance, ChainId};

/// Proxy storage of one proxied account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotProxies {
    pub proxied: AccountId,
    pub delegates: Vec<ProxyDefinition>,
    #[serde(default)]
    pub deposit: Balance,
}

/// Fee charged as `base + per_byte * call_len`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub base: Balance,
    #[serde(default)]
    pub per_byte: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain_id: ChainId,
    #[serde(default)]
    pub block_number: u32,
    /// Call layout; relay-chain default when absent
    #[serde(default)]
    pub registry: Option<CallRegistry>,
    /// Runtime constants keyed `pallet.name`
    #[serde(default)]
    pub constants: BTreeMap<String, Balance>,
    #[serde(default)]
    pub proxies: Vec<SnapshotProxies>,
    /// Extra storage served verbatim (e.g. entries the engine cannot decode)
    #[serde(default)]
    pub raw_storage: Vec<StorageEntry>,
    #[serde(default)]
    pub balances: Vec<AccountBalance>,
    #[serde(default)]
    pub fees: FeeSchedule,
}

impl ChainSnapshot {
    pub fn new(chain_id: impl Into<ChainId>) -> Self {
        Self {
            chain_id: chain_id.into(),
            ..Self::default()
        }
    }

    pub fn with_constant(mut self, pallet: &str, name: &str, value: Balance) -> Self {
        self.constants.insert(format!("{}.{}", pallet, name), value);
        self
    }

    fn storage(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        let mut storage: BTreeMap<Vec<u8>, Vec<u8>> = self
            .proxies
            .iter()
            .map(|entry| {
                (
                    account_storage_key("Proxy", "Proxies", &entry.proxied),
                    encode_proxies_value(&entry.delegates, entry.deposit),
                )
            })
            .collect();
        for raw in &self.raw_storage {
            storage.insert(raw.key.clone(), raw.value.clone());
        }
        storage
    }
}

pub struct SnapshotChain {
    chain_id: ChainId,
    registry: CallRegistry,
    state: RwLock<ChainSnapshot>,
    connected: AtomicBool,
    rejected: Mutex<HashSet<Vec<u8>>>,
    submitted: Mutex<Vec<Vec<u8>>>,
    queued_events: Mutex<VecDeque<Vec<ChainEvent>>>,
    next_extrinsic_index: AtomicU32,
}

impl SnapshotChain {
    pub fn new(snapshot: ChainSnapshot) -> Self {
        Self {
            chain_id: snapshot.chain_id.clone(),
            registry: snapshot.registry.clone().unwrap_or_default(),
            state: RwLock::new(snapshot),
            connected: AtomicBool::new(true),
            rejected: Mutex::new(HashSet::new()),
            submitted: Mutex::new(Vec::new()),
            queued_events: Mutex::new(VecDeque::new()),
            next_extrinsic_index: AtomicU32::new(1),
        }
    }

    /// Read a snapshot document from disk
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: ChainSnapshot = serde_json::from_str(&raw)?;
        info!(
            "Loaded chain snapshot {} ({} proxied accounts) from {}",
            snapshot.chain_id,
            snapshot.proxies.len(),
            path.display()
        );
        Ok(Self::new(snapshot))
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Replace the chain's proxy storage
    pub fn set_proxies(&self, proxies: Vec<SnapshotProxies>) {
        self.write_state().proxies = proxies;
    }

    pub fn set_raw_storage(&self, entries: Vec<StorageEntry>) {
        self.write_state().raw_storage = entries;
    }

    pub fn set_balance(&self, balance: AccountBalance) {
        let mut state = self.write_state();
        state.balances.retain(|b| {
            !(b.account_id == balance.account_id && b.asset_id == balance.asset_id)
        });
        state.balances.push(balance);
    }

    /// Events attached to the next submitted extrinsic
    pub fn queue_events(&self, events: Vec<ChainEvent>) {
        self.queued_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(events);
    }

    /// Make the pool reject this exact extrinsic
    pub fn reject_extrinsic(&self, extrinsic: Vec<u8>) {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(extrinsic);
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ChainSnapshot> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ChainSnapshot> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_connected(&self, operation: &str) -> ChainResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChainError::ConnectionFailed(format!(
                "{} on disconnected chain {}",
                operation, self.chain_id
            )))
        }
    }
}

#[async_trait]
impl ChainApi for SnapshotChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn query(&self, key: &[u8]) -> ChainResult<Option<Vec<u8>>> {
        self.ensure_connected("query")?;
        Ok(self.read_state().storage().get(key).cloned())
    }

    async fn query_storage_at(&self, keys: &[Vec<u8>]) -> ChainResult<Vec<Option<Vec<u8>>>> {
        self.ensure_connected("query_storage_at")?;
        let storage = self.read_state().storage();
        Ok(keys.iter().map(|k| storage.get(k).cloned()).collect())
    }

    async fn storage_entries(&self, pallet: &str, item: &str) -> ChainResult<Vec<StorageEntry>> {
        self.ensure_connected("storage_entries")?;
        let prefix = storage_prefix(pallet, item);
        let entries: Vec<StorageEntry> = self
            .read_state()
            .storage()
            .into_iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, value)| StorageEntry { key, value })
            .collect();
        debug!(
            "Scanned {}.{} on {}: {} entries",
            pallet,
            item,
            self.chain_id,
            entries.len()
        );
        Ok(entries)
    }

    async fn constant(&self, pallet: &str, name: &str) -> ChainResult<Option<Vec<u8>>> {
        self.ensure_connected("constant")?;
        Ok(self
            .read_state()
            .constants
            .get(&format!("{}.{}", pallet, name))
            .map(|value| value.to_le_bytes().to_vec()))
    }

    async fn account_balance(
        &self,
        account_id: &AccountId,
        asset_id: u32,
    ) -> ChainResult<Option<AccountBalance>> {
        self.ensure_connected("account_balance")?;
        Ok(self
            .read_state()
            .balances
            .iter()
            .find(|b| &b.account_id == account_id && b.asset_id == asset_id)
            .cloned())
    }

    async fn estimate_fee(
        &self,
        call_data: &[u8],
        _sender: &AccountId,
        _asset_id: u32,
    ) -> ChainResult<Balance> {
        self.ensure_connected("estimate_fee")?;
        let fees = self.read_state().fees;
        Ok(fees
            .base
            .saturating_add(fees.per_byte.saturating_mul(call_data.len() as Balance)))
    }

    async fn submit_and_watch(
        &self,
        extrinsic: Vec<u8>,
    ) -> ChainResult<mpsc::Receiver<ExtrinsicStatus>> {
        self.ensure_connected("submit_and_watch")?;
        let (tx, rx) = mpsc::channel(4);

        let rejected = self
            .rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&extrinsic);
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(extrinsic.clone());

        if rejected {
            let _ = tx.try_send(ExtrinsicStatus::Invalid(
                "Transaction is outdated".to_string(),
            ));
            return Ok(rx);
        }

        let events = self
            .queued_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default();
        let inclusion = ExtrinsicInclusion {
            extrinsic_hash: format!("0x{}", hex::encode(Sha256::digest(&extrinsic))),
            block_number: self.read_state().block_number,
            extrinsic_index: self.next_extrinsic_index.fetch_add(1, Ordering::SeqCst),
            events,
        };

        let _ = tx.try_send(ExtrinsicStatus::Ready);
        let _ = tx.try_send(ExtrinsicStatus::InBlock(inclusion.clone()));
        let _ = tx.try_send(ExtrinsicStatus::Finalized(inclusion));
        Ok(rx)
    }
}

/// Connector resolving chains to snapshot files or preloaded handles
#[derive(Default, Clone)]
pub struct SnapshotConnector {
    preloaded: HashMap<ChainId, Arc<SnapshotChain>>,
}

impl SnapshotConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `chain` for its chain id instead of reading a file
    pub fn with_chain(mut self, chain: Arc<SnapshotChain>) -> Self {
        self.preloaded.insert(chain.chain_id.clone(), chain);
        self
    }
}

#[async_trait]
impl ChainConnector for SnapshotConnector {
    async fn connect(&self, chain: &ChainConfig) -> ChainResult<Arc<dyn ChainApi>> {
        if let Some(handle) = self.preloaded.get(&chain.chain_id) {
            return Ok(handle.clone() as Arc<dyn ChainApi>);
        }

        let path = chain.snapshot_path.as_ref().ok_or_else(|| {
            ChainError::ConnectionFailed(format!(
                "No snapshot configured for chain {} ({})",
                chain.name, chain.chain_id
            ))
        })?;

        let loaded = SnapshotChain::load(path).map_err(|e| match e {
            AppError::Chain(inner) => inner,
            other => ChainError::ConnectionFailed(other.to_string()),
        })?;

        if loaded.chain_id != chain.chain_id {
            return Err(ChainError::ConnectionFailed(format!(
                "Snapshot {} is for chain {}, expected {}",
                path.display(),
                loaded.chain_id,
                chain.chain_id
            )));
        }

        Ok(Arc::new(loaded))
    }
}
