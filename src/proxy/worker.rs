//! Proxy worker actor
//!
//! The worker task owns every chain handle it opens. Callers talk to it only
//! through [`ProxyWorkerRequest`] messages carrying plain data, each with a
//! oneshot reply; no handle or shared state crosses the channel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::reconcile::{reconcile_partial, GetProxiesRequest, ProxiesDiff};
use super::storage::fetch_all_proxies;
use crate::chain::{with_retry, ChainApi, ChainConnector};
use crate::config::{ChainConfig, ConnectionConfig};
use crate::errors::{AppError, AppResult, ChainError};
use crate::types::ChainId;

pub enum ProxyWorkerRequest {
    /// Open a handle for the chain; replies whether it is connected
    InitConnection {
        chain: ChainConfig,
        reply: oneshot::Sender<bool>,
    },
    GetProxies {
        request: GetProxiesRequest,
        reply: oneshot::Sender<AppResult<ProxiesDiff>>,
    },
    /// Drop the chain's handle; a no-op when none is open
    Disconnect {
        chain_id: ChainId,
        reply: oneshot::Sender<()>,
    },
}

struct ProxyWorker {
    connector: Arc<dyn ChainConnector>,
    connection: ConnectionConfig,
    chains: HashMap<ChainId, Arc<dyn ChainApi>>,
}

impl ProxyWorker {
    async fn run(mut self, mut requests: mpsc::Receiver<ProxyWorkerRequest>) {
        info!("Proxy worker started");
        while let Some(request) = requests.recv().await {
            match request {
                ProxyWorkerRequest::InitConnection { chain, reply } => {
                    let connected = self.init_connection(&chain).await;
                    let _ = reply.send(connected);
                }
                ProxyWorkerRequest::GetProxies { request, reply } => {
                    let result = self.get_proxies(&request).await;
                    let _ = reply.send(result);
                }
                ProxyWorkerRequest::Disconnect { chain_id, reply } => {
                    if self.chains.remove(&chain_id).is_some() {
                        info!("Disconnected proxy worker from {}", chain_id);
                    }
                    let _ = reply.send(());
                }
            }
        }
        info!("Proxy worker stopped ({} chains open)", self.chains.len());
    }

    async fn init_connection(&mut self, chain: &ChainConfig) -> bool {
        if let Some(handle) = self.chains.get(&chain.chain_id) {
            if handle.is_connected().await {
                return true;
            }
        }

        let connector = self.connector.clone();
        match with_retry(&self.connection, "connect", || connector.connect(chain)).await {
            Ok(handle) => {
                info!("Proxy worker connected to {} ({})", chain.name, chain.chain_id);
                self.chains.insert(chain.chain_id.clone(), handle);
                true
            }
            Err(e) => {
                warn!("Proxy worker could not connect to {}: {}", chain.name, e);
                false
            }
        }
    }

    async fn get_proxies(&self, request: &GetProxiesRequest) -> AppResult<ProxiesDiff> {
        let chain = self.chains.get(&request.chain_id).ok_or_else(|| {
            AppError::Chain(ChainError::NotConnected {
                chain_id: request.chain_id.clone(),
            })
        })?;

        let scan = fetch_all_proxies(chain.as_ref(), &self.connection).await?;
        let diff = reconcile_partial(request, &scan.entries, &scan.skipped);
        debug!(
            "Proxy diff for {}: +{} -{} proxies, +{} -{} proxied",
            request.chain_id,
            diff.proxies_to_add.len(),
            diff.proxies_to_remove.len(),
            diff.proxied_to_add.len(),
            diff.proxied_to_remove.len()
        );
        Ok(diff)
    }
}

/// Client side of the proxy worker; cloning shares the same worker
#[derive(Clone)]
pub struct ProxyWorkerHandle {
    requests: mpsc::Sender<ProxyWorkerRequest>,
}

impl ProxyWorkerHandle {
    /// Start the worker task; it stops once every handle is dropped
    pub fn spawn(
        connector: Arc<dyn ChainConnector>,
        connection: ConnectionConfig,
        capacity: usize,
    ) -> Self {
        let (requests, receiver) = mpsc::channel(capacity.max(1));
        let worker = ProxyWorker {
            connector,
            connection,
            chains: HashMap::new(),
        };
        tokio::spawn(worker.run(receiver));
        Self { requests }
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ProxyWorkerRequest,
        what: &str,
    ) -> AppResult<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| AppError::WorkerUnavailable(format!("{}: worker stopped", what)))?;
        response
            .await
            .map_err(|_| AppError::WorkerUnavailable(format!("{}: no reply", what)))
    }

    /// `Ok(false)` when the chain could not be reached; callers may retry later
    pub async fn init_connection(&self, chain: ChainConfig) -> AppResult<bool> {
        self.call(
            |reply| ProxyWorkerRequest::InitConnection { chain, reply },
            "init_connection",
        )
        .await
    }

    pub async fn get_proxies(&self, request: GetProxiesRequest) -> AppResult<ProxiesDiff> {
        self.call(
            |reply| ProxyWorkerRequest::GetProxies { request, reply },
            "get_proxies",
        )
        .await?
    }

    pub async fn disconnect(&self, chain_id: impl Into<ChainId>) -> AppResult<()> {
        let chain_id = chain_id.into();
        self.call(
            |reply| ProxyWorkerRequest::Disconnect { chain_id, reply },
            "disconnect",
        )
        .await
    }
}
