//! Wallet and account operations
//!
//! Accounts keep their [`AccountKind`] as JSON in `details`, with the variant
//! label copied into `kind` so queries can filter without parsing.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::helpers::{account_from_row, enum_to_sql, ACCOUNT_COLUMNS};
use crate::database::traits::AccountOperations;
use crate::database::Database;
use crate::errors::AppResult;
use crate::types::{now_millis, Account, AccountId};

/// Insert or update `account` on an open connection or transaction
pub(crate) fn insert_account_row(
    connection: &rusqlite::Connection,
    account: &Account,
) -> AppResult<()> {
    let mut stmt = connection.prepare_cached(
        r#"INSERT INTO accounts
           (wallet_id, name, account_id, chain_id, crypto_type, chain_type, kind, details)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (wallet_id, account_id, chain_id) DO UPDATE SET
               name = excluded.name,
               kind = excluded.kind,
               details = excluded.details"#,
    )?;
    stmt.execute(params![
        account.wallet_id,
        account.name,
        account.account_id.to_hex(),
        account.chain_id.as_deref().unwrap_or(""),
        enum_to_sql(&account.crypto_type)?,
        enum_to_sql(&account.chain_type)?,
        account.kind.label(),
        serde_json::to_string(&account.kind)?,
    ])?;
    Ok(())
}

pub(crate) fn create_wallet_row(connection: &rusqlite::Connection, name: &str) -> AppResult<i64> {
    connection.execute(
        "INSERT INTO wallets (name, created_at) VALUES (?1, ?2)",
        params![name, now_millis()],
    )?;
    Ok(connection.last_insert_rowid())
}

impl AccountOperations for Database {
    fn create_wallet(&mut self, name: &str) -> AppResult<i64> {
        let id = create_wallet_row(self.connection(), name)?;
        debug!("Created wallet {} ({})", id, name);
        Ok(id)
    }

    fn delete_wallet(&mut self, wallet_id: i64) -> AppResult<()> {
        self.execute_transaction(|tx| {
            tx.execute("DELETE FROM accounts WHERE wallet_id = ?1", params![wallet_id])?;
            tx.execute("DELETE FROM wallets WHERE id = ?1", params![wallet_id])?;
            Ok(())
        })
    }

    fn insert_account(&mut self, account: &Account) -> AppResult<()> {
        insert_account_row(self.connection(), account)
    }

    fn get_accounts(&self) -> AppResult<Vec<Account>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM accounts ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    fn get_accounts_for_chain(&self, chain_id: &str) -> AppResult<Vec<Account>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM accounts WHERE chain_id = ?1 OR chain_id = '' ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let accounts = stmt
            .query_map(params![chain_id], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    fn find_account(&self, account_id: &AccountId, chain_id: &str) -> AppResult<Option<Account>> {
        let account = self
            .connection()
            .query_row(
                &format!(
                    r#"SELECT {} FROM accounts
                       WHERE account_id = ?1 AND (chain_id = ?2 OR chain_id = '')
                       ORDER BY chain_id DESC, id LIMIT 1"#,
                    ACCOUNT_COLUMNS
                ),
                params![account_id.to_hex(), chain_id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn find_multisig_by_channel(&self, channel_id: &str) -> AppResult<Option<Account>> {
        if channel_id.is_empty() {
            return Ok(None);
        }
        let account = self
            .connection()
            .query_row(
                &format!(
                    r#"SELECT {} FROM accounts
                       WHERE kind = 'multisig' AND json_extract(details, '$.channel_id') = ?1
                       ORDER BY id LIMIT 1"#,
                    ACCOUNT_COLUMNS
                ),
                params![channel_id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn delete_account(&mut self, account_id: &AccountId, chain_id: Option<&str>) -> AppResult<usize> {
        let removed = match chain_id {
            Some(chain_id) => self.connection().execute(
                "DELETE FROM accounts WHERE account_id = ?1 AND chain_id = ?2",
                params![account_id.to_hex(), chain_id],
            )?,
            None => self.connection().execute(
                "DELETE FROM accounts WHERE account_id = ?1",
                params![account_id.to_hex()],
            )?,
        };
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MultisigDetails, Signatory};

    fn id(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    #[test]
    fn test_accounts_keep_their_kind() {
        let mut db = Database::new(":memory:").unwrap();
        let wallet = db.create_wallet("main").unwrap();

        db.insert_account(&Account::base(wallet, "alice", id(1), None))
            .unwrap();
        db.insert_account(&Account::multisig(
            wallet,
            "team",
            id(9),
            Some("polkadot".to_string()),
            MultisigDetails {
                signatories: vec![Signatory::new(id(1)), Signatory::new(id(2))],
                threshold: 2,
                creator_account_id: id(1),
                channel_id: "!room".to_string(),
            },
        ))
        .unwrap();

        let accounts = db.get_accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].chain_id, None);
        assert_eq!(accounts[1].multisig_details().unwrap().threshold, 2);

        let found = db.find_multisig_by_channel("!room").unwrap().unwrap();
        assert_eq!(found.account_id, id(9));
        assert!(db.find_multisig_by_channel("!other").unwrap().is_none());
    }

    #[test]
    fn test_chain_scoping() {
        let mut db = Database::new(":memory:").unwrap();
        let wallet = db.create_wallet("main").unwrap();
        db.insert_account(&Account::base(wallet, "any", id(1), None))
            .unwrap();
        db.insert_account(&Account::base(
            wallet,
            "kusama only",
            id(2),
            Some("kusama".to_string()),
        ))
        .unwrap();

        assert_eq!(db.get_accounts_for_chain("polkadot").unwrap().len(), 1);
        assert_eq!(db.get_accounts_for_chain("kusama").unwrap().len(), 2);
        assert!(db.find_account(&id(2), "polkadot").unwrap().is_none());
        assert!(db.find_account(&id(1), "polkadot").unwrap().is_some());
    }

    #[test]
    fn test_upsert_and_delete_wallet() {
        let mut db = Database::new(":memory:").unwrap();
        let wallet = db.create_wallet("main").unwrap();
        db.insert_account(&Account::base(wallet, "old", id(1), None))
            .unwrap();
        db.insert_account(&Account::base(wallet, "renamed", id(1), None))
            .unwrap();

        let accounts = db.get_accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "renamed");

        db.delete_wallet(wallet).unwrap();
        assert!(db.get_accounts().unwrap().is_empty());
    }
}
