//! v1: original schema with flat account columns and a free-form type string

use rusqlite::Transaction;

use super::Migration;
use crate::errors::AppResult;

pub const MIGRATION: Migration = Migration {
    version: 1,
    description: "wallets, flat accounts, multisig transactions and events",
    apply,
};

fn apply(tx: &Transaction) -> AppResult<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS wallets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wallet_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            account_id TEXT NOT NULL,
            chain_id TEXT NOT NULL DEFAULT '',
            crypto_type TEXT,
            chain_type TEXT,
            account_type TEXT,
            signatories TEXT,
            threshold INTEGER,
            creator_account_id TEXT,
            matrix_room_id TEXT,
            proxy_account_id TEXT,
            proxy_type TEXT,
            proxy_variant TEXT,
            delay INTEGER
        );

        CREATE TABLE IF NOT EXISTS multisig_transactions (
            account_id TEXT NOT NULL,
            chain_id TEXT NOT NULL,
            call_hash TEXT NOT NULL,
            block_created INTEGER NOT NULL,
            index_created INTEGER NOT NULL,
            status TEXT NOT NULL,
            signatories TEXT NOT NULL DEFAULT '[]',
            call_data TEXT,
            deposit TEXT,
            depositor TEXT,
            transaction_json TEXT,
            description TEXT,
            date_created INTEGER NOT NULL,
            PRIMARY KEY (account_id, chain_id, call_hash, block_created, index_created)
        );

        CREATE TABLE IF NOT EXISTS multisig_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_account_id TEXT NOT NULL,
            tx_chain_id TEXT NOT NULL,
            tx_call_hash TEXT NOT NULL,
            tx_block INTEGER NOT NULL,
            tx_index INTEGER NOT NULL,
            account_id TEXT NOT NULL,
            status TEXT NOT NULL,
            source TEXT NOT NULL,
            execution TEXT NOT NULL DEFAULT '',
            extrinsic_hash TEXT,
            event_block INTEGER,
            event_index INTEGER,
            date_created INTEGER NOT NULL,
            UNIQUE (tx_account_id, tx_chain_id, tx_call_hash, tx_block, tx_index,
                    account_id, status, source, execution)
        );

        CREATE INDEX IF NOT EXISTS idx_multisig_events_tx
            ON multisig_events (tx_account_id, tx_chain_id, tx_call_hash, tx_block, tx_index);
        "#,
    )?;
    Ok(())
}
