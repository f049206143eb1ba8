//! `Proxy.Proxies` storage layout
//!
//! Keys end with the proxied account id. Values are
//! `(Vec<(delegate, proxy_type, delay)>, deposit)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::chain::{with_retry, ChainApi, StorageEntry};
use crate::codec::scale::encode_compact_len;
use crate::codec::ScaleReader;
use crate::config::ConnectionConfig;
use crate::errors::{AppError, AppResult};
use crate::types::{AccountId, Balance, ProxyType};

pub const PROXY_PALLET: &str = "Proxy";
pub const PROXIES_ITEM: &str = "Proxies";

/// One delegate entry of a proxied account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDefinition {
    pub delegate: AccountId,
    pub proxy_type: ProxyType,
    #[serde(default)]
    pub delay: u32,
}

/// Decoded storage of one proxied account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainProxies {
    pub proxied: AccountId,
    pub delegates: Vec<ProxyDefinition>,
    pub deposit: Balance,
}

/// Outcome of a full `Proxy.Proxies` scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyScan {
    pub entries: Vec<OnChainProxies>,
    /// Proxied accounts whose value failed to decode
    pub skipped: BTreeSet<AccountId>,
}

/// Proxied account a storage key belongs to
fn proxied_from_key(key: &[u8]) -> AppResult<AccountId> {
    let suffix = key
        .len()
        .checked_sub(AccountId::LEN)
        .map(|start| &key[start..])
        .ok_or_else(|| {
            AppError::InvalidData(format!("storage key too short: {} bytes", key.len()))
        })?;
    AccountId::from_slice(suffix)
        .ok_or_else(|| AppError::InvalidData("storage key suffix is not an account id".to_string()))
}

pub fn encode_proxies_value(delegates: &[ProxyDefinition], deposit: Balance) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + delegates.len() * 37 + 16);
    encode_compact_len(delegates.len(), &mut out);
    for definition in delegates {
        out.extend_from_slice(definition.delegate.as_bytes());
        out.push(definition.proxy_type.index());
        out.extend_from_slice(&definition.delay.to_le_bytes());
    }
    out.extend_from_slice(&deposit.to_le_bytes());
    out
}

pub fn decode_proxies_entry(entry: &StorageEntry) -> AppResult<OnChainProxies> {
    let proxied = proxied_from_key(&entry.key)?;

    let mut reader = ScaleReader::new(&entry.value);
    let count = reader.read_len()?;
    let mut delegates = Vec::with_capacity(count.min(32));
    for _ in 0..count {
        let delegate = reader.read_account_id()?;
        let raw_type = reader.read_u8()?;
        let proxy_type = ProxyType::from_index(raw_type).ok_or_else(|| {
            AppError::InvalidData(format!("unknown proxy type {} for {}", raw_type, proxied))
        })?;
        let delay = reader.read_u32()?;
        delegates.push(ProxyDefinition {
            delegate,
            proxy_type,
            delay,
        });
    }
    let deposit = reader.read_u128()?;
    if !reader.is_empty() {
        return Err(AppError::InvalidData(format!(
            "{} trailing bytes in proxies of {}",
            reader.remaining(),
            proxied
        )));
    }

    Ok(OnChainProxies {
        proxied,
        delegates,
        deposit,
    })
}

/// Every proxied account on the chain, from one storage scan
///
/// Entries that fail to decode are logged and skipped; the proxied account
/// of each one is reported in [`ProxyScan::skipped`] when its key is readable.
pub async fn fetch_all_proxies(
    chain: &dyn ChainApi,
    connection: &ConnectionConfig,
) -> AppResult<ProxyScan> {
    let entries = with_retry(connection, "Proxy.Proxies scan", || {
        chain.storage_entries(PROXY_PALLET, PROXIES_ITEM)
    })
    .await?;

    let total = entries.len();
    let mut scan = ProxyScan::default();
    for entry in &entries {
        match decode_proxies_entry(entry) {
            Ok(proxies) => scan.entries.push(proxies),
            Err(e) => {
                warn!(
                    "Skipping proxy storage key 0x{} on {}: {}",
                    hex::encode(&entry.key),
                    chain.chain_id(),
                    e
                );
                if let Ok(proxied) = proxied_from_key(&entry.key) {
                    scan.skipped.insert(proxied);
                }
            }
        }
    }

    debug!(
        "Decoded {} of {} proxy entries on {}",
        scan.entries.len(),
        total,
        chain.chain_id()
    );
    Ok(scan)
}
