//! Deposit & fee calculator
//!
//! Deposits are pure functions of chain constants. Fees come from the chain's
//! fee estimation and are memoised per `(chain, call hash, asset)` until the
//! chain reconnects.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::chain::ChainApi;
use crate::codec::{call_hash, ScaleReader};
use crate::composer::WrappedTransaction;
use crate::errors::{AppError, AppResult, ChainError};
use crate::types::{AccountId, Balance, CallHash, ChainId};

/// Runtime constants behind the multisig deposit formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigConstants {
    pub deposit_base: Balance,
    pub deposit_factor: Balance,
}

/// Runtime constants behind the proxy deposit formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConstants {
    pub deposit_base: Balance,
    pub deposit_factor: Balance,
}

/// Deposit reserved from the depositor while a multisig call is pending:
/// `deposit_base + deposit_factor * threshold`
pub fn multisig_deposit(threshold: u16, constants: &MultisigConstants) -> Balance {
    constants
        .deposit_base
        .saturating_add(constants.deposit_factor.saturating_mul(threshold as Balance))
}

/// Deposit reserved for holding `proxy_count` proxy definitions
pub fn proxy_deposit(proxy_count: u32, constants: &ProxyConstants) -> Balance {
    constants
        .deposit_base
        .saturating_add(constants.deposit_factor.saturating_mul(proxy_count as Balance))
}

/// Deposit for a freshly created pure proxy (one definition)
pub fn pure_proxy_deposit(constants: &ProxyConstants) -> Balance {
    proxy_deposit(1, constants)
}

async fn read_balance_constant(chain: &dyn ChainApi, pallet: &str, name: &str) -> AppResult<Balance> {
    let raw = chain.constant(pallet, name).await?.ok_or_else(|| {
        AppError::Chain(ChainError::InvalidResponse(format!(
            "Runtime constant {}.{} missing on {}",
            pallet,
            name,
            chain.chain_id()
        )))
    })?;
    let mut reader = ScaleReader::new(&raw);
    Ok(reader.read_u128()?)
}

/// Multisig constants from the runtime unless `overrides` are configured
pub async fn fetch_multisig_constants(
    chain: &dyn ChainApi,
    overrides: Option<&MultisigConstants>,
) -> AppResult<MultisigConstants> {
    if let Some(constants) = overrides {
        return Ok(*constants);
    }
    Ok(MultisigConstants {
        deposit_base: read_balance_constant(chain, "multisig", "depositBase").await?,
        deposit_factor: read_balance_constant(chain, "multisig", "depositFactor").await?,
    })
}

/// Proxy constants from the runtime unless `overrides` are configured
pub async fn fetch_proxy_constants(
    chain: &dyn ChainApi,
    overrides: Option<&ProxyConstants>,
) -> AppResult<ProxyConstants> {
    if let Some(constants) = overrides {
        return Ok(*constants);
    }
    Ok(ProxyConstants {
        deposit_base: read_balance_constant(chain, "proxy", "proxyDepositBase").await?,
        deposit_factor: read_balance_constant(chain, "proxy", "proxyDepositFactor").await?,
    })
}

type FeeKey = (ChainId, CallHash, u32);

/// Memoised fee estimation
#[derive(Clone, Default)]
pub struct FeeEstimator {
    cache: Arc<Mutex<HashMap<FeeKey, Balance>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl FeeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, key: &FeeKey) -> Option<Balance> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }

    /// Fee for submitting `call_data`, from the memo when available
    pub async fn estimate(
        &self,
        chain: &dyn ChainApi,
        call_data: &[u8],
        sender: &AccountId,
        asset_id: u32,
    ) -> AppResult<Balance> {
        let key = (chain.chain_id().to_string(), call_hash(call_data), asset_id);
        if let Some(fee) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Fee cache hit for {} on {}", key.1, key.0);
            return Ok(fee);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fee = chain.estimate_fee(call_data, sender, asset_id).await?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, fee);
        Ok(fee)
    }

    /// Drop every memoised fee for `chain_id`
    pub fn invalidate(&self, chain_id: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let before = cache.len();
        cache.retain(|(chain, _, _), _| chain != chain_id);
        debug!(
            "Invalidated {} cached fees for {}",
            before - cache.len(),
            chain_id
        );
    }

    pub fn get_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache performance statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64 / (self.hits + self.misses) as f64) * 100.0
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Check that every payer can cover its share before submission
///
/// The fee is charged to the outermost sender (who signs the broadcast
/// extrinsic); the multisig deposit to the sender of the multisig layer.
/// When both are the same account the amounts add up.
pub fn validate_funds(
    wrapped: &WrappedTransaction,
    fee: Balance,
    deposit: Option<Balance>,
    available: &HashMap<AccountId, Balance>,
) -> AppResult<()> {
    let mut required: BTreeMap<AccountId, Balance> = BTreeMap::new();
    *required.entry(wrapped.wrapped_tx.address).or_default() += fee;

    if let (Some(deposit), Some(multisig_tx)) = (deposit, wrapped.multisig_tx.as_ref()) {
        let entry = required.entry(multisig_tx.address).or_default();
        *entry = entry.saturating_add(deposit);
    }

    for (account, required) in required {
        let available = available.get(&account).copied().unwrap_or(0);
        if available < required {
            return Err(AppError::InsufficientBalance {
                account,
                required,
                available,
            });
        }
    }
    Ok(())
}
