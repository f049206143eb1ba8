use super::{database_path, load_config};
use crate::chain::SnapshotConnector;
use crate::database::{Database, ScopeLocks};
use crate::errors::{AppError, AppResult};
use crate::proxy::{ProxyPoller, ProxyReconciler, ProxyWorkerHandle};
use clap::Args;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Args)]
pub struct SyncProxiesCommand {
    /// Only this chain (default: every configured chain)
    #[arg(long)]
    chain: Option<String>,

    /// Database path (overrides config.toml and env vars)
    #[arg(long)]
    database_path: Option<PathBuf>,

    /// Configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep polling until interrupted
    #[arg(long)]
    watch: bool,

    /// Poll interval in seconds (overrides config.toml)
    #[arg(long)]
    interval: Option<u64>,
}

impl SyncProxiesCommand {
    pub async fn run(&self) -> AppResult<()> {
        let config = load_config(self.config.as_deref())?;
        let chains: Vec<_> = config
            .chains
            .iter()
            .filter(|c| self.chain.as_deref().map_or(true, |id| c.chain_id == id))
            .cloned()
            .collect();
        if chains.is_empty() {
            return Err(AppError::Config(match &self.chain {
                Some(id) => format!("Chain {} is not configured", id),
                None => "No chains configured".to_string(),
            }));
        }

        let db = Database::new(&database_path(&config, self.database_path.as_ref()))?;
        let worker = ProxyWorkerHandle::spawn(
            Arc::new(SnapshotConnector::new()),
            config.connection.clone(),
            config.reconciliation.worker_channel_capacity,
        );
        let reconciler = ProxyReconciler::new(Arc::new(Mutex::new(db)), worker, ScopeLocks::new());
        let interval = Duration::from_secs(
            self.interval
                .unwrap_or(config.reconciliation.poll_interval_seconds),
        );
        let mut poller = ProxyPoller::new(reconciler.clone(), chains.clone(), interval);

        if !self.watch {
            let synced = poller.poll_once().await;
            println!("Reconciled {} of {} chains", synced, chains.len());
            for chain in &chains {
                reconciler.worker().disconnect(chain.chain_id.clone()).await?;
            }
            return Ok(());
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for interrupt: {}", e);
                return;
            }
            info!("Interrupt received, finishing current pass");
            let _ = stop_tx.send(true);
        });

        let passes = poller.run(stop_rx).await;
        println!("Stopped after {} passes", passes);
        Ok(())
    }
}
