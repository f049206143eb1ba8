//! SQLite persistence for wallets, accounts and delegation state
//!
//! ## Architecture
//!
//! The `Database` struct directly implements the operation traits:
//! - `AccountOperations` - wallets and the account taxonomy
//! - `MultisigOperations` - multisig transactions and their append-only events
//! - `ProxyOperations` - proxy relationships, proxied accounts and deposits
//! - `BalanceOperations` - per-chain balances
//!
//! The schema is owned by the versioned pipeline in [`migrations`]; opening a
//! database brings it to the latest version.

mod accounts;
mod balances;
pub mod helpers;
pub mod locks;
pub mod migrations;
mod multisig;
mod proxies;
pub mod traits;

pub use balances::BalanceUpdater;
pub use locks::ScopeLocks;
pub use traits::*;

use crate::errors::AppResult;
use rusqlite::Connection;
use tracing::info;

/// The main database interface that implements all operation traits
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Open (or create) a database and migrate it to the latest schema
    pub fn new(database_path: &str) -> AppResult<Self> {
        Self::with_schema_version(database_path, migrations::latest_version())
    }

    /// Open a database migrated no further than `target`
    ///
    /// Used by the `migrate` command and by tests that need a legacy schema.
    pub fn with_schema_version(database_path: &str, target: u32) -> AppResult<Self> {
        let mut connection = Connection::open(database_path)?;
        let version = migrations::migrate_to(&mut connection, target)?;

        info!(
            "Database initialised at: {} (schema v{})",
            database_path, version
        );
        Ok(Self { connection })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn schema_version(&self) -> AppResult<u32> {
        migrations::current_version(&self.connection)
    }

    /// Bring an already open database to the latest schema
    pub fn migrate(&mut self) -> AppResult<u32> {
        migrations::run_migrations(&mut self.connection)
    }

    /// Execute a function within a database transaction
    pub fn execute_transaction<F, R>(&mut self, f: F) -> AppResult<R>
    where
        F: FnOnce(&rusqlite::Transaction) -> AppResult<R>,
    {
        let tx = self.connection.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}
