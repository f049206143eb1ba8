use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::fees::{MultisigConstants, ProxyConstants};
use crate::types::ChainId;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub connection: ConnectionConfig,
    pub reconciliation: ReconciliationConfig,
    pub verification: VerificationConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub default_path: PathBuf,
}

/// Timeouts and retry policy for chain calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
    /// Extrinsics in flight at once during submission
    pub submission_concurrency: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_retries: 5,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_seconds: 30,
            submission_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub poll_interval_seconds: u64,
    pub worker_channel_capacity: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
            worker_channel_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Fixed delay between connection checks while verifying a balance
    pub retry_delay_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 2_000,
        }
    }
}

/// One chain the engine may connect to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    /// JSON snapshot served instead of a live node
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// Overrides for the runtime's multisig deposit constants
    #[serde(default)]
    pub multisig: Option<MultisigConstants>,
    /// Overrides for the runtime's proxy deposit constants
    #[serde(default)]
    pub proxy: Option<ProxyConstants>,
}

impl ChainConfig {
    pub fn new(chain_id: impl Into<ChainId>, name: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            name: name.into(),
            snapshot_path: None,
            multisig: None,
            proxy: None,
        }
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables
    /// Environment variables take precedence over file configuration
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], reading `path` instead of `./config.toml`
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let connection = ConnectionConfig::default();
        let reconciliation = ReconciliationConfig::default();
        let verification = VerificationConfig::default();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config").required(false),
        };

        let config = Config::builder()
            .set_default("database.default_path", "./delegation.db")?
            .set_default("connection.timeout_seconds", connection.timeout_seconds)?
            .set_default("connection.max_retries", connection.max_retries as i64)?
            .set_default("connection.initial_backoff_ms", connection.initial_backoff_ms)?
            .set_default("connection.backoff_multiplier", connection.backoff_multiplier)?
            .set_default(
                "connection.max_backoff_seconds",
                connection.max_backoff_seconds,
            )?
            .set_default(
                "connection.submission_concurrency",
                connection.submission_concurrency as i64,
            )?
            .set_default(
                "reconciliation.poll_interval_seconds",
                reconciliation.poll_interval_seconds,
            )?
            .set_default(
                "reconciliation.worker_channel_capacity",
                reconciliation.worker_channel_capacity as i64,
            )?
            .set_default("verification.retry_delay_ms", verification.retry_delay_ms)?
            .add_source(file)
            // DELEGATION_CONNECTION__MAX_RETRIES=3 style overrides
            .add_source(config::Environment::with_prefix("DELEGATION").separator("__"))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(db_path) = env::var("DELEGATION_DATABASE_PATH") {
            app_config.database.default_path = PathBuf::from(db_path);
        }

        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(_) => Ok(Self {
                database: DatabaseConfig {
                    default_path: PathBuf::from("./delegation.db"),
                },
                connection: ConnectionConfig::default(),
                reconciliation: ReconciliationConfig::default(),
                verification: VerificationConfig::default(),
                chains: Vec::new(),
            }),
        }
    }

    pub fn chain(&self, chain_id: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}
