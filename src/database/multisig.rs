//! Multisig transaction and event operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

use crate::database::helpers::{
    account_id_from_sql, balance_from_sql, balance_to_sql, call_hash_from_sql, conversion_error,
    enum_from_sql, enum_to_sql, json_from_sql,
};
use crate::database::traits::MultisigOperations;
use crate::database::Database;
use crate::errors::AppResult;
use crate::types::{
    AccountId, EventSource, ExecutionOutcome, MultisigEvent, MultisigTransaction, MultisigTxKey,
    MultisigTxStatus, SigningStatus, TxPayload,
};

const TX_COLUMNS: &str = "account_id, chain_id, call_hash, block_created, index_created, \
     status, signatories, call_data, deposit, depositor, transaction_json, description, \
     date_created";

const EVENT_COLUMNS: &str = "tx_account_id, tx_chain_id, tx_call_hash, tx_block, tx_index, \
     account_id, status, source, execution, extrinsic_hash, event_block, event_index, \
     date_created";

fn key_from_row(row: &Row, offset: usize) -> rusqlite::Result<MultisigTxKey> {
    Ok(MultisigTxKey {
        account_id: account_id_from_sql(offset, &row.get::<_, String>(offset)?)?,
        chain_id: row.get(offset + 1)?,
        call_hash: call_hash_from_sql(offset + 2, &row.get::<_, String>(offset + 2)?)?,
        block_created: row.get(offset + 3)?,
        index_created: row.get(offset + 4)?,
    })
}

fn multisig_tx_from_row(row: &Row) -> rusqlite::Result<MultisigTransaction> {
    let status: String = row.get(5)?;
    let call_data = row
        .get::<_, Option<String>>(7)?
        .map(|raw| {
            hex::decode(raw.strip_prefix("0x").unwrap_or(&raw))
                .map_err(|e| conversion_error(7, format!("call data: {}", e)))
        })
        .transpose()?;

    Ok(MultisigTransaction {
        key: key_from_row(row, 0)?,
        status: MultisigTxStatus::parse(&status)
            .ok_or_else(|| conversion_error(5, format!("unknown status '{}'", status)))?,
        signatories: json_from_sql::<BTreeSet<AccountId>>(6, &row.get::<_, String>(6)?)?,
        call_data,
        deposit: row
            .get::<_, Option<String>>(8)?
            .map(|raw| balance_from_sql(8, &raw))
            .transpose()?,
        depositor: row
            .get::<_, Option<String>>(9)?
            .map(|raw| account_id_from_sql(9, &raw))
            .transpose()?,
        transaction: row
            .get::<_, Option<String>>(10)?
            .map(|raw| json_from_sql::<TxPayload>(10, &raw))
            .transpose()?,
        description: row.get(11)?,
        date_created: row.get(12)?,
    })
}

fn multisig_event_from_row(row: &Row) -> rusqlite::Result<MultisigEvent> {
    let status: String = row.get(6)?;
    let source: String = row.get(7)?;
    let execution: String = row.get(8)?;

    Ok(MultisigEvent {
        tx: key_from_row(row, 0)?,
        account_id: account_id_from_sql(5, &row.get::<_, String>(5)?)?,
        status: SigningStatus::parse(&status)
            .ok_or_else(|| conversion_error(6, format!("unknown signing status '{}'", status)))?,
        source: EventSource::parse(&source)
            .ok_or_else(|| conversion_error(7, format!("unknown source '{}'", source)))?,
        execution: if execution.is_empty() {
            None
        } else {
            Some(enum_from_sql::<ExecutionOutcome>(8, &execution)?)
        },
        extrinsic_hash: row.get(9)?,
        event_block: row.get(10)?,
        event_index: row.get(11)?,
        date_created: row.get(12)?,
    })
}

fn upsert_tx(connection: &Connection, tx: &MultisigTransaction) -> AppResult<()> {
    let mut stmt = connection.prepare_cached(
        r#"INSERT INTO multisig_transactions
           (account_id, chain_id, call_hash, block_created, index_created, status, signatories,
            call_data, deposit, depositor, transaction_json, description, date_created)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
           ON CONFLICT (account_id, chain_id, call_hash, block_created, index_created)
           DO UPDATE SET
               status = excluded.status,
               signatories = excluded.signatories,
               call_data = COALESCE(excluded.call_data, call_data),
               deposit = COALESCE(excluded.deposit, deposit),
               depositor = COALESCE(excluded.depositor, depositor),
               transaction_json = COALESCE(excluded.transaction_json, transaction_json),
               description = COALESCE(excluded.description, description)"#,
    )?;
    let transaction_json = tx
        .transaction
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    stmt.execute(params![
        tx.key.account_id.to_hex(),
        tx.key.chain_id,
        tx.key.call_hash.to_hex(),
        tx.key.block_created,
        tx.key.index_created,
        tx.status.as_str(),
        serde_json::to_string(&tx.signatories)?,
        tx.call_data
            .as_ref()
            .map(|data| format!("0x{}", hex::encode(data))),
        tx.deposit.map(balance_to_sql),
        tx.depositor.map(|id| id.to_hex()),
        transaction_json,
        tx.description,
        tx.date_created,
    ])?;
    Ok(())
}

fn insert_event(connection: &Connection, event: &MultisigEvent) -> AppResult<bool> {
    let mut stmt = connection.prepare_cached(
        r#"INSERT OR IGNORE INTO multisig_events
           (tx_account_id, tx_chain_id, tx_call_hash, tx_block, tx_index, account_id, status,
            source, execution, extrinsic_hash, event_block, event_index, date_created)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
    )?;
    let execution = match &event.execution {
        Some(outcome) => enum_to_sql(outcome)?,
        None => String::new(),
    };
    let inserted = stmt.execute(params![
        event.tx.account_id.to_hex(),
        event.tx.chain_id,
        event.tx.call_hash.to_hex(),
        event.tx.block_created,
        event.tx.index_created,
        event.account_id.to_hex(),
        event.status.as_str(),
        event.source.as_str(),
        execution,
        event.extrinsic_hash,
        event.event_block,
        event.event_index,
        event.date_created,
    ])?;
    Ok(inserted > 0)
}

impl MultisigOperations for Database {
    fn upsert_multisig_transaction(&mut self, tx: &MultisigTransaction) -> AppResult<()> {
        upsert_tx(self.connection(), tx)
    }

    fn get_multisig_transaction(
        &self,
        key: &MultisigTxKey,
    ) -> AppResult<Option<MultisigTransaction>> {
        let tx = self
            .connection()
            .query_row(
                &format!(
                    r#"SELECT {} FROM multisig_transactions
                       WHERE account_id = ?1 AND chain_id = ?2 AND call_hash = ?3
                         AND block_created = ?4 AND index_created = ?5"#,
                    TX_COLUMNS
                ),
                params![
                    key.account_id.to_hex(),
                    key.chain_id,
                    key.call_hash.to_hex(),
                    key.block_created,
                    key.index_created
                ],
                multisig_tx_from_row,
            )
            .optional()?;
        Ok(tx)
    }

    fn get_multisig_transactions(
        &self,
        account_id: &AccountId,
    ) -> AppResult<Vec<MultisigTransaction>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            r#"SELECT {} FROM multisig_transactions WHERE account_id = ?1
               ORDER BY block_created DESC, index_created DESC"#,
            TX_COLUMNS
        ))?;
        let txs = stmt
            .query_map(params![account_id.to_hex()], multisig_tx_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(txs)
    }

    fn insert_multisig_event(&mut self, event: &MultisigEvent) -> AppResult<bool> {
        insert_event(self.connection(), event)
    }

    fn get_multisig_events(&self, key: &MultisigTxKey) -> AppResult<Vec<MultisigEvent>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            r#"SELECT {} FROM multisig_events
               WHERE tx_account_id = ?1 AND tx_chain_id = ?2 AND tx_call_hash = ?3
                 AND tx_block = ?4 AND tx_index = ?5
               ORDER BY id"#,
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map(
                params![
                    key.account_id.to_hex(),
                    key.chain_id,
                    key.call_hash.to_hex(),
                    key.block_created,
                    key.index_created
                ],
                multisig_event_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn save_multisig_state(
        &mut self,
        tx: &MultisigTransaction,
        events: &[MultisigEvent],
    ) -> AppResult<usize> {
        self.execute_transaction(|db_tx| {
            let mut appended = 0;
            for event in events {
                if insert_event(db_tx, event)? {
                    appended += 1;
                }
            }
            upsert_tx(db_tx, tx)?;
            Ok(appended)
        })
    }
}
