//! v2: accounts carry an explicit kind discriminant
//!
//! v1 rows said what they were through a free-form `account_type` string,
//! and older rows only through which optional columns happened to be filled.
//! Every row is run through [`reclassify_account`] and rewritten into a table
//! holding `kind` plus the serialised [`AccountKind`].

use rusqlite::{params, Transaction};
use serde::Deserialize;
use tracing::{debug, warn};

use super::Migration;
use crate::database::helpers::enum_to_sql;
use crate::errors::{AppError, AppResult};
use crate::types::{
    AccountId, AccountKind, ChainType, CryptoType, MultisigDetails, ProxiedDetails, ProxyType,
    ProxyVariant, Signatory,
};

pub const MIGRATION: Migration = Migration {
    version: 2,
    description: "reclassify accounts into explicit kinds",
    apply,
};

/// Account row as stored by v1
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyAccountRow {
    pub id: i64,
    pub wallet_id: i64,
    pub name: String,
    pub account_id: String,
    pub chain_id: String,
    pub crypto_type: Option<String>,
    pub chain_type: Option<String>,
    pub account_type: Option<String>,
    pub signatories: Option<String>,
    pub threshold: Option<i64>,
    pub creator_account_id: Option<String>,
    pub matrix_room_id: Option<String>,
    pub proxy_account_id: Option<String>,
    pub proxy_type: Option<String>,
    pub proxy_variant: Option<String>,
    pub delay: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySignatory {
    account_id: AccountId,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn invalid(row: &LegacyAccountRow, reason: impl Into<String>) -> AppError {
    AppError::InvalidData(format!("legacy account row {}: {}", row.id, reason.into()))
}

fn multisig_kind(row: &LegacyAccountRow) -> AppResult<AccountKind> {
    let raw = row
        .signatories
        .as_deref()
        .ok_or_else(|| invalid(row, "multisig without signatories"))?;
    let legacy: Vec<LegacySignatory> = serde_json::from_str(raw)?;
    let signatories: Vec<Signatory> = legacy
        .into_iter()
        .map(|s| Signatory {
            address: s.address.unwrap_or_else(|| s.account_id.to_address()),
            account_id: s.account_id,
            name: s.name,
        })
        .collect();

    let threshold = row
        .threshold
        .and_then(|t| u16::try_from(t).ok())
        .filter(|t| *t > 0)
        .ok_or_else(|| invalid(row, format!("bad threshold {:?}", row.threshold)))?;

    let creator_account_id = match row.creator_account_id.as_deref() {
        Some(raw) => raw.parse()?,
        None => signatories
            .first()
            .map(|s| s.account_id)
            .ok_or_else(|| invalid(row, "empty signatory list"))?,
    };

    Ok(AccountKind::Multisig(MultisigDetails {
        signatories,
        threshold,
        creator_account_id,
        channel_id: row.matrix_room_id.clone().unwrap_or_default(),
    }))
}

fn proxied_kind(row: &LegacyAccountRow) -> AppResult<AccountKind> {
    let proxy_account_id: AccountId = row
        .proxy_account_id
        .as_deref()
        .ok_or_else(|| invalid(row, "proxied without proxy account"))?
        .parse()?;
    let proxy_type = row
        .proxy_type
        .as_deref()
        .and_then(ProxyType::parse)
        .ok_or_else(|| invalid(row, format!("bad proxy type {:?}", row.proxy_type)))?;
    let proxy_variant = match row.proxy_variant.as_deref() {
        Some("pure") | Some("anonymous") => ProxyVariant::Pure,
        _ => ProxyVariant::Regular,
    };
    let delay = row
        .delay
        .map(|d| u32::try_from(d).map_err(|_| invalid(row, format!("bad delay {}", d))))
        .transpose()?
        .unwrap_or(0);

    Ok(AccountKind::Proxied(ProxiedDetails {
        proxy_account_id,
        proxy_type,
        proxy_variant,
        delay,
        block_number: None,
        extrinsic_index: None,
    }))
}

/// Explicit kind for a v1 account row
///
/// Known `account_type` strings decide directly. Rows without one (or with an
/// unrecognised one) are classified by which legacy columns are filled.
pub fn reclassify_account(row: &LegacyAccountRow) -> AppResult<AccountKind> {
    match row.account_type.as_deref() {
        Some("multisig") => multisig_kind(row),
        Some("proxied") => proxied_kind(row),
        Some("base") | Some("chain") | Some("shard") | Some("watch_only")
        | Some("wallet_connect") => Ok(AccountKind::Base),
        other => {
            if other.is_some() {
                warn!(
                    "Legacy account row {} has unknown type {:?}, classifying by columns",
                    row.id, other
                );
            }
            if row.signatories.is_some() {
                multisig_kind(row)
            } else if row.proxy_account_id.is_some() {
                proxied_kind(row)
            } else {
                Ok(AccountKind::Base)
            }
        }
    }
}

fn legacy_crypto_type(raw: Option<&str>) -> CryptoType {
    match raw {
        Some("ed25519") => CryptoType::Ed25519,
        Some("ecdsa") => CryptoType::Ecdsa,
        Some("ethereum") => CryptoType::Ethereum,
        _ => CryptoType::Sr25519,
    }
}

fn legacy_chain_type(raw: Option<&str>) -> ChainType {
    match raw {
        Some("ethereum") => ChainType::Ethereum,
        _ => ChainType::Substrate,
    }
}

fn read_legacy_rows(tx: &Transaction) -> AppResult<Vec<LegacyAccountRow>> {
    let mut stmt = tx.prepare(
        r#"SELECT id, wallet_id, name, account_id, chain_id, crypto_type, chain_type,
                  account_type, signatories, threshold, creator_account_id, matrix_room_id,
                  proxy_account_id, proxy_type, proxy_variant, delay
           FROM accounts ORDER BY id"#,
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(LegacyAccountRow {
                id: row.get(0)?,
                wallet_id: row.get(1)?,
                name: row.get(2)?,
                account_id: row.get(3)?,
                chain_id: row.get(4)?,
                crypto_type: row.get(5)?,
                chain_type: row.get(6)?,
                account_type: row.get(7)?,
                signatories: row.get(8)?,
                threshold: row.get(9)?,
                creator_account_id: row.get(10)?,
                matrix_room_id: row.get(11)?,
                proxy_account_id: row.get(12)?,
                proxy_type: row.get(13)?,
                proxy_variant: row.get(14)?,
                delay: row.get(15)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn apply(tx: &Transaction) -> AppResult<()> {
    let legacy = read_legacy_rows(tx)?;

    tx.execute_batch(
        r#"
        CREATE TABLE accounts_v2 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wallet_id INTEGER NOT NULL REFERENCES wallets(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            account_id TEXT NOT NULL,
            chain_id TEXT NOT NULL DEFAULT '',
            crypto_type TEXT NOT NULL,
            chain_type TEXT NOT NULL,
            kind TEXT NOT NULL,
            details TEXT NOT NULL,
            UNIQUE (wallet_id, account_id, chain_id)
        );
        "#,
    )?;

    {
        let mut insert = tx.prepare(
            r#"INSERT OR REPLACE INTO accounts_v2
               (wallet_id, name, account_id, chain_id, crypto_type, chain_type, kind, details)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )?;
        for row in &legacy {
            let account_id: AccountId = row.account_id.parse()?;
            let kind = reclassify_account(row)?;
            insert.execute(params![
                row.wallet_id,
                row.name,
                account_id.to_hex(),
                row.chain_id,
                enum_to_sql(&legacy_crypto_type(row.crypto_type.as_deref()))?,
                enum_to_sql(&legacy_chain_type(row.chain_type.as_deref()))?,
                kind.label(),
                serde_json::to_string(&kind)?,
            ])?;
            debug!("Reclassified legacy account {} as {}", row.id, kind.label());
        }
    }

    tx.execute_batch(
        r#"
        DROP TABLE accounts;
        ALTER TABLE accounts_v2 RENAME TO accounts;
        CREATE INDEX idx_accounts_chain ON accounts (chain_id);
        CREATE INDEX idx_accounts_kind ON accounts (kind);
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LegacyAccountRow {
        LegacyAccountRow {
            id: 1,
            wallet_id: 1,
            name: "legacy".to_string(),
            account_id: AccountId([1u8; 32]).to_hex(),
            ..LegacyAccountRow::default()
        }
    }

    fn signatories_json() -> String {
        serde_json::json!([
            {"accountId": AccountId([1u8; 32]), "address": "alice"},
            {"accountId": AccountId([2u8; 32])}
        ])
        .to_string()
    }

    #[test]
    fn test_explicit_types() {
        let mut base = row();
        base.account_type = Some("shard".to_string());
        assert_eq!(reclassify_account(&base).unwrap(), AccountKind::Base);

        let mut multisig = row();
        multisig.account_type = Some("multisig".to_string());
        multisig.signatories = Some(signatories_json());
        multisig.threshold = Some(2);
        multisig.matrix_room_id = Some("!room".to_string());
        match reclassify_account(&multisig).unwrap() {
            AccountKind::Multisig(details) => {
                assert_eq!(details.threshold, 2);
                assert_eq!(details.channel_id, "!room");
                assert_eq!(details.signatories[0].address, "alice");
                assert_eq!(details.creator_account_id, AccountId([1u8; 32]));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_untyped_rows_are_classified_by_columns() {
        let mut proxied = row();
        proxied.proxy_account_id = Some(AccountId([3u8; 32]).to_hex());
        proxied.proxy_type = Some("Staking".to_string());
        proxied.proxy_variant = Some("anonymous".to_string());
        match reclassify_account(&proxied).unwrap() {
            AccountKind::Proxied(details) => {
                assert_eq!(details.proxy_type, ProxyType::Staking);
                assert_eq!(details.proxy_variant, ProxyVariant::Pure);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        assert_eq!(reclassify_account(&row()).unwrap(), AccountKind::Base);
    }

    #[test]
    fn test_broken_multisig_is_rejected() {
        let mut multisig = row();
        multisig.account_type = Some("multisig".to_string());
        multisig.signatories = Some(signatories_json());
        multisig.threshold = Some(0);
        assert!(reclassify_account(&multisig).is_err());

        multisig.signatories = None;
        multisig.threshold = Some(2);
        assert!(reclassify_account(&multisig).is_err());
    }
}
