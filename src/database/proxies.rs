//! Proxy relationship, proxied account and deposit operations
//!
//! Proxied accounts live in the `accounts` table like every other account.
//! Each one discovered by reconciliation gets a wallet of its own, which is
//! deleted again once its last account is removed.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::database::accounts::{create_wallet_row, insert_account_row};
use crate::database::helpers::{
    account_from_row, account_id_from_sql, balance_from_sql, balance_to_sql, conversion_error,
    ACCOUNT_COLUMNS,
};
use crate::database::traits::ProxyOperations;
use crate::database::Database;
use crate::errors::AppResult;
use crate::proxy::ProxiesDiff;
use crate::types::{
    Account, AccountId, AccountKind, ProxiedAccount, ProxiedDetails, ProxyAccount, ProxyDeposits,
    ProxyType,
};

fn proxy_from_row(row: &Row) -> rusqlite::Result<ProxyAccount> {
    let proxy_type: String = row.get(3)?;
    Ok(ProxyAccount {
        chain_id: row.get(0)?,
        proxied_account_id: account_id_from_sql(1, &row.get::<_, String>(1)?)?,
        account_id: account_id_from_sql(2, &row.get::<_, String>(2)?)?,
        proxy_type: ProxyType::parse(&proxy_type)
            .ok_or_else(|| conversion_error(3, format!("unknown proxy type '{}'", proxy_type)))?,
        delay: row.get(4)?,
    })
}

fn proxied_from_account(account: Account) -> Option<ProxiedAccount> {
    let chain_id = account.chain_id?;
    match account.kind {
        AccountKind::Proxied(details) => Some(ProxiedAccount {
            chain_id,
            account_id: account.account_id,
            proxy_account_id: details.proxy_account_id,
            proxy_type: details.proxy_type,
            delay: details.delay,
            proxy_variant: details.proxy_variant,
        }),
        _ => None,
    }
}

fn insert_proxies(connection: &Connection, proxies: &[ProxyAccount]) -> AppResult<usize> {
    let mut stmt = connection.prepare_cached(
        r#"INSERT OR IGNORE INTO proxies
           (chain_id, proxied_account_id, account_id, proxy_type, delay)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
    )?;
    let mut added = 0;
    for proxy in proxies {
        added += stmt.execute(params![
            proxy.chain_id,
            proxy.proxied_account_id.to_hex(),
            proxy.account_id.to_hex(),
            proxy.proxy_type.as_str(),
            proxy.delay,
        ])?;
    }
    Ok(added)
}

fn delete_proxies(connection: &Connection, proxies: &[ProxyAccount]) -> AppResult<usize> {
    let mut stmt = connection.prepare_cached(
        r#"DELETE FROM proxies
           WHERE chain_id = ?1 AND proxied_account_id = ?2 AND account_id = ?3
             AND proxy_type = ?4 AND delay = ?5"#,
    )?;
    let mut removed = 0;
    for proxy in proxies {
        removed += stmt.execute(params![
            proxy.chain_id,
            proxy.proxied_account_id.to_hex(),
            proxy.account_id.to_hex(),
            proxy.proxy_type.as_str(),
            proxy.delay,
        ])?;
    }
    Ok(removed)
}

/// `deposits` plus the stored deposit of every unresolved account it lacks
fn with_unresolved_deposits(
    connection: &Connection,
    deposits: &ProxyDeposits,
    unresolved: &BTreeSet<AccountId>,
) -> AppResult<ProxyDeposits> {
    let mut merged = deposits.clone();
    let mut stmt = connection.prepare_cached(
        "SELECT deposit FROM proxy_deposits WHERE chain_id = ?1 AND proxied_account_id = ?2",
    )?;
    for proxied in unresolved {
        if merged.deposits.contains_key(proxied) {
            continue;
        }
        let stored = stmt
            .query_row(params![deposits.chain_id, proxied.to_hex()], |row| {
                balance_from_sql(0, &row.get::<_, String>(0)?)
            })
            .optional()?;
        if let Some(deposit) = stored {
            merged.deposits.insert(*proxied, deposit);
        }
    }
    Ok(merged)
}

fn write_deposits(connection: &Connection, deposits: &ProxyDeposits) -> AppResult<()> {
    connection.execute(
        "DELETE FROM proxy_deposits WHERE chain_id = ?1",
        params![deposits.chain_id],
    )?;
    let mut stmt = connection.prepare_cached(
        "INSERT INTO proxy_deposits (chain_id, proxied_account_id, deposit) VALUES (?1, ?2, ?3)",
    )?;
    for (proxied, deposit) in &deposits.deposits {
        stmt.execute(params![
            deposits.chain_id,
            proxied.to_hex(),
            balance_to_sql(*deposit)
        ])?;
    }
    Ok(())
}

/// Store `proxied` as an account in a wallet created for it
fn add_proxied_account(connection: &Connection, proxied: &ProxiedAccount) -> AppResult<()> {
    let short = proxied.account_id.to_hex();
    let name = format!("Proxied {}", &short[..10.min(short.len())]);
    let wallet_id = create_wallet_row(connection, &name)?;
    insert_account_row(
        connection,
        &Account::proxied(
            wallet_id,
            name,
            proxied.account_id,
            proxied.chain_id.clone(),
            ProxiedDetails {
                proxy_account_id: proxied.proxy_account_id,
                proxy_type: proxied.proxy_type,
                proxy_variant: proxied.proxy_variant,
                delay: proxied.delay,
                block_number: None,
                extrinsic_index: None,
            },
        ),
    )
}

/// Remove the stored account for `proxied` and any wallet it leaves empty
fn remove_proxied_account(connection: &Connection, proxied: &ProxiedAccount) -> AppResult<usize> {
    let filter = r#"kind = 'proxied' AND account_id = ?1 AND chain_id = ?2
        AND json_extract(details, '$.proxy_account_id') = ?3
        AND json_extract(details, '$.proxy_type') = ?4
        AND json_extract(details, '$.delay') = ?5"#;
    let account_id = proxied.account_id.to_hex();
    let proxy_account_id = proxied.proxy_account_id.to_hex();
    let proxy_type = proxied.proxy_type.as_str();
    let args = params![
        account_id,
        proxied.chain_id,
        proxy_account_id,
        proxy_type,
        proxied.delay,
    ];

    let wallet_ids = {
        let mut stmt =
            connection.prepare(&format!("SELECT DISTINCT wallet_id FROM accounts WHERE {}", filter))?;
        let ids = stmt
            .query_map(args, |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    let removed = connection.execute(&format!("DELETE FROM accounts WHERE {}", filter), args)?;

    for wallet_id in wallet_ids {
        let remaining: i64 = connection.query_row(
            "SELECT COUNT(*) FROM accounts WHERE wallet_id = ?1",
            params![wallet_id],
            |row| row.get(0),
        )?;
        if remaining == 0 {
            connection.execute("DELETE FROM wallets WHERE id = ?1", params![wallet_id])?;
            debug!("Deleted empty wallet {}", wallet_id);
        }
    }
    Ok(removed)
}

impl ProxyOperations for Database {
    fn get_proxies(&self, chain_id: &str) -> AppResult<Vec<ProxyAccount>> {
        let mut stmt = self.connection().prepare_cached(
            r#"SELECT chain_id, proxied_account_id, account_id, proxy_type, delay
               FROM proxies WHERE chain_id = ?1
               ORDER BY proxied_account_id, account_id, proxy_type, delay"#,
        )?;
        let proxies = stmt
            .query_map(params![chain_id], proxy_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(proxies)
    }

    fn add_proxies(&mut self, proxies: &[ProxyAccount]) -> AppResult<usize> {
        self.execute_transaction(|tx| insert_proxies(tx, proxies))
    }

    fn remove_proxies(&mut self, proxies: &[ProxyAccount]) -> AppResult<usize> {
        self.execute_transaction(|tx| delete_proxies(tx, proxies))
    }

    fn get_proxied_accounts(&self, chain_id: &str) -> AppResult<Vec<ProxiedAccount>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM accounts WHERE kind = 'proxied' AND chain_id = ?1 ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![chain_id], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts.into_iter().filter_map(proxied_from_account).collect())
    }

    fn replace_proxy_deposits(&mut self, deposits: &ProxyDeposits) -> AppResult<()> {
        self.execute_transaction(|tx| write_deposits(tx, deposits))
    }

    fn get_proxy_deposits(&self, chain_id: &str) -> AppResult<ProxyDeposits> {
        let mut stmt = self.connection().prepare_cached(
            "SELECT proxied_account_id, deposit FROM proxy_deposits WHERE chain_id = ?1",
        )?;
        let deposits = stmt
            .query_map(params![chain_id], |row| {
                Ok((
                    account_id_from_sql(0, &row.get::<_, String>(0)?)?,
                    balance_from_sql(1, &row.get::<_, String>(1)?)?,
                ))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(ProxyDeposits {
            chain_id: chain_id.to_string(),
            deposits,
        })
    }

    fn apply_proxies_diff(&mut self, diff: &ProxiesDiff) -> AppResult<()> {
        self.execute_transaction(|tx| {
            let added = insert_proxies(tx, &diff.proxies_to_add)?;
            let removed = delete_proxies(tx, &diff.proxies_to_remove)?;
            for proxied in &diff.proxied_to_add {
                add_proxied_account(tx, proxied)?;
            }
            let mut proxied_removed = 0;
            for proxied in &diff.proxied_to_remove {
                proxied_removed += remove_proxied_account(tx, proxied)?;
            }
            let deposits = with_unresolved_deposits(tx, &diff.deposits, &diff.unresolved)?;
            write_deposits(tx, &deposits)?;

            info!(
                "Applied proxy diff for {}: +{} -{} proxies, +{} -{} proxied accounts",
                diff.deposits.chain_id,
                added,
                removed,
                diff.proxied_to_add.len(),
                proxied_removed
            );
            Ok(())
        })
    }
}
