//! Balance operations and the locked balance merge

use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::database::helpers::{account_id_from_sql, balance_from_sql, balance_to_sql};
use crate::database::locks::ScopeLocks;
use crate::database::traits::BalanceOperations;
use crate::database::Database;
use crate::errors::AppResult;
use crate::types::{now_millis, AccountBalance, AccountId};

const BALANCE_COLUMNS: &str = "chain_id, account_id, asset_id, free, reserved, frozen, verified";

fn balance_from_row(row: &Row) -> rusqlite::Result<AccountBalance> {
    Ok(AccountBalance {
        chain_id: row.get(0)?,
        account_id: account_id_from_sql(1, &row.get::<_, String>(1)?)?,
        asset_id: row.get(2)?,
        free: balance_from_sql(3, &row.get::<_, String>(3)?)?,
        reserved: balance_from_sql(4, &row.get::<_, String>(4)?)?,
        frozen: balance_from_sql(5, &row.get::<_, String>(5)?)?,
        verified: row.get(6)?,
    })
}

impl BalanceOperations for Database {
    fn upsert_balances(&mut self, balances: &[AccountBalance]) -> AppResult<usize> {
        self.execute_transaction(|tx| {
            let mut stmt = tx.prepare_cached(
                r#"INSERT INTO balances
                   (chain_id, account_id, asset_id, free, reserved, frozen, verified, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                   ON CONFLICT (chain_id, account_id, asset_id) DO UPDATE SET
                       free = excluded.free,
                       reserved = excluded.reserved,
                       frozen = excluded.frozen,
                       verified = excluded.verified,
                       updated_at = excluded.updated_at"#,
            )?;
            let now = now_millis();
            for balance in balances {
                stmt.execute(params![
                    balance.chain_id,
                    balance.account_id.to_hex(),
                    balance.asset_id,
                    balance_to_sql(balance.free),
                    balance_to_sql(balance.reserved),
                    balance_to_sql(balance.frozen),
                    balance.verified,
                    now,
                ])?;
            }
            Ok(balances.len())
        })
    }

    fn get_balances(&self, chain_id: &str) -> AppResult<Vec<AccountBalance>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM balances WHERE chain_id = ?1 ORDER BY account_id, asset_id",
            BALANCE_COLUMNS
        ))?;
        let balances = stmt
            .query_map(params![chain_id], balance_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(balances)
    }

    fn get_balance(
        &self,
        chain_id: &str,
        account_id: &AccountId,
        asset_id: u32,
    ) -> AppResult<Option<AccountBalance>> {
        let balance = self
            .connection()
            .query_row(
                &format!(
                    "SELECT {} FROM balances WHERE chain_id = ?1 AND account_id = ?2 AND asset_id = ?3",
                    BALANCE_COLUMNS
                ),
                params![chain_id, account_id.to_hex(), asset_id],
                balance_from_row,
            )
            .optional()?;
        Ok(balance)
    }
}

/// Merges freshly read balances into storage, one chain at a time
///
/// Each merge reads the chain's stored balances, keeps a `verified` flag
/// when the amounts did not move, and writes only rows that changed. The
/// whole read-modify-write runs under the chain's scope lock.
#[derive(Clone)]
pub struct BalanceUpdater {
    db: Arc<Mutex<Database>>,
    locks: ScopeLocks,
}

impl BalanceUpdater {
    pub fn new(db: Arc<Mutex<Database>>, locks: ScopeLocks) -> Self {
        Self { db, locks }
    }

    /// Merge `incoming` balances of `chain_id`; returns the number of rows written
    pub async fn merge(&self, chain_id: &str, incoming: Vec<AccountBalance>) -> AppResult<usize> {
        let _scope = self.locks.acquire(&format!("balances:{}", chain_id)).await;
        let mut db = self.db.lock().unwrap_or_else(|e| e.into_inner());

        let stored: HashMap<(AccountId, u32), AccountBalance> = db
            .get_balances(chain_id)?
            .into_iter()
            .map(|b| ((b.account_id, b.asset_id), b))
            .collect();

        let changed: Vec<AccountBalance> = incoming
            .into_iter()
            .filter(|b| b.chain_id == chain_id)
            .filter_map(|mut balance| {
                match stored.get(&(balance.account_id, balance.asset_id)) {
                    Some(existing)
                        if existing.free == balance.free
                            && existing.reserved == balance.reserved
                            && existing.frozen == balance.frozen =>
                    {
                        balance.verified |= existing.verified;
                        (balance.verified != existing.verified).then_some(balance)
                    }
                    _ => Some(balance),
                }
            })
            .collect();

        if changed.is_empty() {
            debug!("Balances for {} unchanged", chain_id);
            return Ok(0);
        }
        db.upsert_balances(&changed)
    }
}
