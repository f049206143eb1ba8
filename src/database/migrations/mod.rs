//! Versioned schema migrations
//!
//! Migrations run in version order, each inside its own transaction that also
//! bumps `PRAGMA user_version`, so a failed step leaves the database at the
//! previous version.

mod v1;
mod v2;
mod v3;

pub use v2::{reclassify_account, LegacyAccountRow};

use rusqlite::{Connection, Transaction};
use tracing::info;

use crate::errors::{AppError, AppResult};

/// One schema step
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&Transaction) -> AppResult<()>,
}

pub const MIGRATIONS: &[Migration] = &[v1::MIGRATION, v2::MIGRATION, v3::MIGRATION];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

pub fn current_version(connection: &Connection) -> AppResult<u32> {
    let version: u32 = connection.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Apply every pending migration up to and including `target`
///
/// Returns the version the database ends at.
pub fn migrate_to(connection: &mut Connection, target: u32) -> AppResult<u32> {
    let mut version = current_version(connection)?;
    if version > latest_version() {
        return Err(AppError::Migration {
            version,
            reason: format!(
                "database is newer than this build (latest known version {})",
                latest_version()
            ),
        });
    }

    let start = version;
    for migration in MIGRATIONS
        .iter()
        .filter(move |m| m.version > start && m.version <= target)
    {
        let tx = connection.transaction()?;
        (migration.apply)(&tx).map_err(|e| AppError::Migration {
            version: migration.version,
            reason: e.to_string(),
        })?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;

        info!(
            "Applied migration v{}: {}",
            migration.version, migration.description
        );
        version = migration.version;
    }
    Ok(version)
}

pub fn run_migrations(connection: &mut Connection) -> AppResult<u32> {
    migrate_to(connection, latest_version())
}
