use super::{database_path, load_config};
use crate::database::{AccountOperations, Database, MultisigOperations};
use crate::errors::{AppError, AppResult};
use crate::types::AccountId;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct MultisigStatusCommand {
    /// Multisig account id (0x hex)
    account: String,

    /// Chain the account lives on
    #[arg(long)]
    chain: String,

    /// Database path (overrides config.toml and env vars)
    #[arg(long)]
    database_path: Option<PathBuf>,

    /// Configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Include executed, cancelled and failed transactions
    #[arg(long)]
    all: bool,
}

impl MultisigStatusCommand {
    pub fn run(&self) -> AppResult<()> {
        let config = load_config(self.config.as_deref())?;
        let db = Database::new(&database_path(&config, self.database_path.as_ref()))?;
        let account_id: AccountId = self.account.parse()?;

        let account = db
            .find_account(&account_id, &self.chain)?
            .ok_or_else(|| AppError::InvalidData(format!("unknown account {}", account_id)))?;
        let details = account.multisig_details().ok_or_else(|| {
            AppError::InvalidData(format!("{} is not a multisig account", account_id))
        })?;

        println!(
            "{} ({}): {} of {} signatories",
            account.name,
            account_id,
            details.threshold,
            details.signatories.len()
        );

        let transactions: Vec<_> = db
            .get_multisig_transactions(&account_id)?
            .into_iter()
            .filter(|tx| tx.key.chain_id == self.chain)
            .filter(|tx| self.all || !tx.status.is_terminal())
            .collect();
        if transactions.is_empty() {
            println!("No transactions");
            return Ok(());
        }

        for tx in transactions {
            println!(
                "  {} @ {}  {:<11}  {}/{} approvals{}",
                tx.key.call_hash,
                tx.key.timepoint(),
                tx.status.as_str(),
                tx.signatories.len(),
                details.threshold,
                match &tx.description {
                    Some(description) => format!("  {}", description),
                    None => String::new(),
                }
            );
        }
        Ok(())
    }
}
