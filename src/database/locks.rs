//! Per-scope exclusive sections
//!
//! Read-modify-write passes over one scope's records (all proxies of a chain,
//! all balances of a chain) hold that scope's lock for the whole pass, so two
//! passes for the same chain never interleave. Different scopes run freely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Clone, Default)]
pub struct ScopeLocks {
    scopes: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self, scope: &str) -> Arc<AsyncMutex<()>> {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        // Holders and waiters keep a clone; anything else is idle
        scopes.retain(|name, lock| name == scope || Arc::strong_count(lock) > 1);
        scopes.entry(scope.to_string()).or_default().clone()
    }

    /// Wait for exclusive access to `scope`; released when the guard drops
    pub async fn acquire(&self, scope: &str) -> OwnedMutexGuard<()> {
        let lock = self.scope(scope);
        let guard = lock.lock_owned().await;
        debug!("Acquired scope lock {}", scope);
        guard
    }

    /// Non-blocking variant, `None` while another pass holds the scope
    pub fn try_acquire(&self, scope: &str) -> Option<OwnedMutexGuard<()>> {
        self.scope(scope).try_lock_owned().ok()
    }
}
