//! Wallet delegation engine - Type System
//!
//! - `common`: Identifiers shared across every module (AccountId, CallHash, Timepoint)
//! - `account`: Account taxonomy (base, multisig, proxied) as tagged variants
//! - `multisig`: Multisig transaction records, events and their status enums
//! - `proxy`: Proxy relationships, proxied accounts and deposit snapshots
//! - `transaction`: Authored and decoded transactions, call arguments
//! - `balance`: Persisted account balances

mod account;
mod balance;
mod common;
mod multisig;
mod proxy;
mod transaction;

pub use account::*;
pub use balance::*;
pub use common::*;
pub use multisig::*;
pub use proxy::*;
pub use transaction::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_hex_roundtrip() {
        let id = AccountId([7u8; 32]);
        let rendered = id.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 66);

        let parsed: AccountId = rendered.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_account_id_rejects_wrong_length() {
        assert!("0x0102".parse::<AccountId>().is_err());
        assert!("not-hex".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_account_kind_serialises_with_discriminant() {
        let account = Account::base(1, "alice", AccountId([1u8; 32]), None);
        let json = serde_json::to_value(&account.kind).unwrap();
        assert_eq!(json["kind"], "base");
    }
}
