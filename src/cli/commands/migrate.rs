use super::{database_path, load_config};
use crate::database::{migrations, Database};
use crate::errors::AppResult;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct MigrateCommand {
    /// Database path (overrides config.toml and env vars)
    #[arg(long)]
    database_path: Option<PathBuf>,

    /// Stop at this schema version instead of the latest
    #[arg(long)]
    target: Option<u32>,

    /// Configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl MigrateCommand {
    pub fn run(&self) -> AppResult<()> {
        let config = load_config(self.config.as_deref())?;
        let path = database_path(&config, self.database_path.as_ref());

        // Open without migrating to report the starting version
        let before = Database::with_schema_version(&path, 0)?.schema_version()?;
        let target = self.target.unwrap_or_else(migrations::latest_version);
        let after = Database::with_schema_version(&path, target)?.schema_version()?;

        info!("Migrated {} from v{} to v{}", path, before, after);
        if before == after {
            println!("{} already at schema v{}", path, after);
        } else {
            println!("{}: schema v{} -> v{}", path, before, after);
        }
        Ok(())
    }
}
