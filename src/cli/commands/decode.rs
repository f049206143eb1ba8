use super::{chain_config, connect, load_config};
use crate::chain::CallRegistry;
use crate::decoder;
use crate::errors::{AppError, AppResult};
use crate::types::AccountId;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct DecodeCallCommand {
    /// Call data or extrinsic as hex (with or without 0x)
    call_data: String,

    /// Sender of the call (0x hex); ignored for signed extrinsics
    #[arg(long)]
    sender: String,

    /// Chain id; the relay-chain call layout is used when omitted
    #[arg(long)]
    chain: Option<String>,

    /// Chain snapshot file (overrides config.toml)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl DecodeCallCommand {
    pub async fn run(&self) -> AppResult<()> {
        let sender: AccountId = self.sender.parse()?;
        let raw = self.call_data.trim_start_matches("0x");
        let bytes = hex::decode(raw)
            .map_err(|e| AppError::InvalidData(format!("call data is not hex: {}", e)))?;

        let decoded = match &self.chain {
            Some(chain_id) => {
                let config = load_config(self.config.as_deref())?;
                let chain = chain_config(&config, chain_id, self.snapshot.as_ref())?;
                let handle = connect(&chain).await?;
                decoder::decode_with(handle.as_ref(), sender, &bytes)?
            }
            None => decoder::decode("", &CallRegistry::default(), sender, &bytes)?,
        };

        info!(
            "Decoded {}.{} ({} bytes)",
            decoded.section,
            decoded.method,
            decoded.call_data.len()
        );
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        Ok(())
    }
}
