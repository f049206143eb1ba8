//! Shared row conversions
//!
//! Balances are `u128`, which SQLite cannot hold natively, so they are stored
//! as decimal TEXT. Ids are stored as their `0x` hex rendering and enums as
//! their serde names.

use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::types::{Account, AccountId, AccountKind, Balance, CallHash};

/// Conversion failure inside a row mapper
pub fn conversion_error(column: usize, message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        Box::new(AppError::InvalidData(message.into())),
    )
}

pub fn balance_to_sql(value: Balance) -> String {
    value.to_string()
}

pub fn balance_from_sql(column: usize, raw: &str) -> rusqlite::Result<Balance> {
    raw.parse()
        .map_err(|e| conversion_error(column, format!("balance '{}': {}", raw, e)))
}

pub fn account_id_from_sql(column: usize, raw: &str) -> rusqlite::Result<AccountId> {
    raw.parse()
        .map_err(|e: AppError| conversion_error(column, e.to_string()))
}

pub fn call_hash_from_sql(column: usize, raw: &str) -> rusqlite::Result<CallHash> {
    raw.parse()
        .map_err(|e: AppError| conversion_error(column, e.to_string()))
}

/// Serde name of a unit enum variant, e.g. `CryptoType::Sr25519` -> `sr25519`
pub fn enum_to_sql<T: Serialize>(value: &T) -> AppResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(name) => Ok(name),
        other => Err(AppError::InvalidData(format!(
            "expected a unit variant, got {}",
            other
        ))),
    }
}

pub fn enum_from_sql<T: DeserializeOwned>(column: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|e| conversion_error(column, format!("'{}': {}", raw, e)))
}

pub fn json_from_sql<T: DeserializeOwned>(column: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion_error(column, e.to_string()))
}

/// Columns selected for every account query, in [`account_from_row`] order
pub const ACCOUNT_COLUMNS: &str =
    "wallet_id, name, account_id, chain_id, crypto_type, chain_type, details";

/// Build an [`Account`] from a row selected with [`ACCOUNT_COLUMNS`]
///
/// An empty `chain_id` column means the account is usable on any chain.
pub fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    let chain_id: String = row.get(3)?;
    Ok(Account {
        wallet_id: row.get(0)?,
        name: row.get(1)?,
        account_id: account_id_from_sql(2, &row.get::<_, String>(2)?)?,
        chain_id: (!chain_id.is_empty()).then_some(chain_id),
        crypto_type: enum_from_sql(4, &row.get::<_, String>(4)?)?,
        chain_type: enum_from_sql(5, &row.get::<_, String>(5)?)?,
        kind: json_from_sql::<AccountKind>(6, &row.get::<_, String>(6)?)?,
    })
}
