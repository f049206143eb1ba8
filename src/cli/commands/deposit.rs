use super::{chain_config, connect, load_config};
use crate::errors::AppResult;
use crate::fees::{
    fetch_multisig_constants, fetch_proxy_constants, multisig_deposit, proxy_deposit,
    pure_proxy_deposit,
};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct DepositCommand {
    /// Chain id as configured
    #[arg(long)]
    chain: String,

    /// Chain snapshot file (overrides config.toml)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Multisig threshold to price
    #[arg(long)]
    threshold: Option<u16>,

    /// Number of proxy definitions to price
    #[arg(long)]
    proxies: Option<u32>,
}

impl DepositCommand {
    pub async fn run(&self) -> AppResult<()> {
        let config = load_config(self.config.as_deref())?;
        let chain = chain_config(&config, &self.chain, self.snapshot.as_ref())?;
        let handle = connect(&chain).await?;

        let multisig = fetch_multisig_constants(handle.as_ref(), chain.multisig.as_ref()).await?;
        let proxy = fetch_proxy_constants(handle.as_ref(), chain.proxy.as_ref()).await?;

        println!("Chain: {} ({})", chain.name, chain.chain_id);
        println!(
            "Multisig deposit: base {} + factor {} x threshold",
            multisig.deposit_base, multisig.deposit_factor
        );
        if let Some(threshold) = self.threshold {
            println!(
                "  threshold {}: {}",
                threshold,
                multisig_deposit(threshold, &multisig)
            );
        }
        println!(
            "Proxy deposit: base {} + factor {} x proxies",
            proxy.deposit_base, proxy.deposit_factor
        );
        if let Some(count) = self.proxies {
            println!("  {} proxies: {}", count, proxy_deposit(count, &proxy));
        }
        println!("Pure proxy deposit: {}", pure_proxy_deposit(&proxy));
        Ok(())
    }
}
