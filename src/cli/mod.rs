use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Multisig and proxy delegation engine
#[derive(Parser)]
#[command(name = "delegation-engine")]
#[command(about = "Multisig and proxy delegation engine for a multi-account wallet")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Derive the multisig account id of a signatory set and threshold
    DeriveAddress(commands::address::DeriveAddressCommand),
    /// Show multisig and proxy deposits for a chain
    Deposit(commands::deposit::DepositCommand),
    /// Decode hex call data into a transaction
    DecodeCall(commands::decode::DecodeCallCommand),
    /// Reconcile stored proxies against chain state
    SyncProxies(commands::proxies::SyncProxiesCommand),
    /// Bring a database to the latest schema
    Migrate(commands::migrate::MigrateCommand),
    /// List tracked multisig transactions of an account
    MultisigStatus(commands::multisig::MultisigStatusCommand),
}

pub async fn run() -> AppResult<()> {
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DeriveAddress(command) => command.run(),
        Commands::Deposit(command) => command.run().await,
        Commands::DecodeCall(command) => command.run().await,
        Commands::SyncProxies(command) => command.run().await,
        Commands::Migrate(command) => command.run(),
        Commands::MultisigStatus(command) => command.run(),
    }
}
