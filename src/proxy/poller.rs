//! Periodic proxy sync
//!
//! Every tick, each configured chain is connected (if it is not yet) and
//! reconciled. A stop signal is only observed between passes; a pass that
//! has started always runs to completion.

use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use super::reconciler::ProxyReconciler;
use crate::config::ChainConfig;
use crate::types::ChainId;

pub struct ProxyPoller {
    reconciler: ProxyReconciler,
    chains: Vec<ChainConfig>,
    poll_interval: Duration,
    connected: HashSet<ChainId>,
}

impl ProxyPoller {
    pub fn new(reconciler: ProxyReconciler, chains: Vec<ChainConfig>, poll_interval: Duration) -> Self {
        Self {
            reconciler,
            chains,
            poll_interval,
            connected: HashSet::new(),
        }
    }

    /// One pass over every chain; returns how many chains were reconciled
    pub async fn poll_once(&mut self) -> usize {
        let mut synced = 0;
        for chain in &self.chains {
            if !self.connected.contains(&chain.chain_id) {
                match self.reconciler.worker().init_connection(chain.clone()).await {
                    Ok(true) => {
                        self.connected.insert(chain.chain_id.clone());
                    }
                    Ok(false) => {
                        warn!("{} not connected yet, skipping this pass", chain.name);
                        continue;
                    }
                    Err(e) => {
                        warn!("Proxy worker unavailable: {}", e);
                        return synced;
                    }
                }
            }

            match self.reconciler.sync_chain(&chain.chain_id).await {
                Ok(_) => synced += 1,
                Err(e) => {
                    warn!("Proxy sync for {} failed: {}", chain.name, e);
                    // Reconnect on the next pass
                    self.connected.remove(&chain.chain_id);
                }
            }
        }
        synced
    }

    /// Poll until `stop` turns `true` or its sender is dropped; returns passes run
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> usize {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0;

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.poll_once().await;
            passes += 1;
        }

        for chain in &self.chains {
            if let Err(e) = self.reconciler.worker().disconnect(chain.chain_id.clone()).await {
                warn!("Disconnect of {} failed: {}", chain.name, e);
            }
        }
        info!("Proxy poller stopped after {} passes", passes);
        passes
    }
}
