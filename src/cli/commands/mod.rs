pub mod address;
pub mod decode;
pub mod deposit;
pub mod migrate;
pub mod multisig;
pub mod proxies;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::chain::{ChainApi, ChainConnector, SnapshotConnector};
use crate::config::{AppConfig, ChainConfig};
use crate::errors::{AppError, AppResult};

pub(crate) fn load_config(config_path: Option<&Path>) -> AppResult<AppConfig> {
    AppConfig::load_from(config_path)
        .map_err(|e| AppError::Config(format!("Failed to load configuration: {}", e)))
}

/// CLI flag first, then configuration
pub(crate) fn database_path(config: &AppConfig, flag: Option<&PathBuf>) -> String {
    flag.unwrap_or(&config.database.default_path)
        .to_string_lossy()
        .into_owned()
}

pub(crate) fn chain_config(
    config: &AppConfig,
    chain_id: &str,
    snapshot: Option<&PathBuf>,
) -> AppResult<ChainConfig> {
    let mut chain = match config.chain(chain_id) {
        Some(chain) => chain.clone(),
        None if snapshot.is_some() => ChainConfig::new(chain_id, chain_id),
        None => {
            return Err(AppError::Config(format!(
                "Chain {} is not configured and no --snapshot was given",
                chain_id
            )))
        }
    };
    if let Some(path) = snapshot {
        chain.snapshot_path = Some(path.clone());
    }
    Ok(chain)
}

pub(crate) async fn connect(chain: &ChainConfig) -> AppResult<Arc<dyn ChainApi>> {
    let handle = SnapshotConnector::new().connect(chain).await?;
    info!("Connected to {} ({})", chain.name, chain.chain_id);
    Ok(handle)
}
