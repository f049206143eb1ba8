//! Proxy relationship reconciliation
//!
//! - **storage** - decoding of the chain's `Proxy.Proxies` map
//! - **reconcile** - pure diff of chain state against the stored view
//! - **worker** - actor owning chain handles, driven by request messages
//! - **reconciler** - applies diffs to the database under the chain's lock
//! - **poller** - periodic sync until told to stop

pub mod poller;
pub mod reconcile;
pub mod reconciler;
pub mod storage;
pub mod worker;

pub use poller::ProxyPoller;
pub use reconcile::{
    apply_to_request, reconcile, reconcile_partial, GetProxiesRequest, ProxiesDiff,
};
pub use reconciler::{build_request, ProxyReconciler};
pub use storage::{
    decode_proxies_entry, fetch_all_proxies, OnChainProxies, ProxyDefinition, ProxyScan,
};
pub use worker::{ProxyWorkerHandle, ProxyWorkerRequest};
