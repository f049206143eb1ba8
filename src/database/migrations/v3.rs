//! v3: proxy relationships, proxy deposits and balances

use rusqlite::Transaction;

use super::Migration;
use crate::errors::AppResult;

pub const MIGRATION: Migration = Migration {
    version: 3,
    description: "proxies, proxy deposits and balances",
    apply,
};

fn apply(tx: &Transaction) -> AppResult<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS proxies (
            chain_id TEXT NOT NULL,
            proxied_account_id TEXT NOT NULL,
            account_id TEXT NOT NULL,
            proxy_type TEXT NOT NULL,
            delay INTEGER NOT NULL,
            PRIMARY KEY (chain_id, proxied_account_id, account_id, proxy_type, delay)
        );

        CREATE TABLE IF NOT EXISTS proxy_deposits (
            chain_id TEXT NOT NULL,
            proxied_account_id TEXT NOT NULL,
            deposit TEXT NOT NULL,
            PRIMARY KEY (chain_id, proxied_account_id)
        );

        CREATE TABLE IF NOT EXISTS balances (
            chain_id TEXT NOT NULL,
            account_id TEXT NOT NULL,
            asset_id INTEGER NOT NULL,
            free TEXT NOT NULL,
            reserved TEXT NOT NULL,
            frozen TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (chain_id, account_id, asset_id)
        );
        "#,
    )?;
    Ok(())
}
