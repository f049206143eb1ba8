//! Upgrading a v1 database to the current schema

use delegation_engine::database::AccountOperations;
use delegation_engine::types::{AccountId, AccountKind, ProxyType, ProxyVariant};
use rusqlite::params;

use crate::common::database::TestDatabase;
use crate::common::fixtures::{id, CHAIN};

fn insert_legacy_wallet(test_db: &TestDatabase) {
    test_db
        .database()
        .connection()
        .execute(
            "INSERT INTO wallets (id, name, created_at) VALUES (1, 'legacy', 0)",
            [],
        )
        .unwrap();
}

fn insert_legacy_account(
    test_db: &TestDatabase,
    name: &str,
    account_id: AccountId,
    account_type: Option<&str>,
    extra: &[(&str, String)],
) {
    let mut columns = vec!["wallet_id", "name", "account_id", "chain_id", "account_type"];
    let mut values: Vec<Option<String>> = vec![
        Some("1".to_string()),
        Some(name.to_string()),
        Some(account_id.to_hex()),
        Some(CHAIN.to_string()),
        account_type.map(str::to_string),
    ];
    for (column, value) in extra {
        columns.push(*column);
        values.push(Some(value.clone()));
    }
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO accounts ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    test_db
        .database()
        .connection()
        .execute(&sql, rusqlite::params_from_iter(values))
        .unwrap();
}

fn signatories_json(ids: &[AccountId]) -> String {
    serde_json::Value::Array(
        ids.iter()
            .map(|id| serde_json::json!({ "accountId": id }))
            .collect(),
    )
    .to_string()
}

#[test]
fn test_v1_accounts_are_reclassified() {
    let mut test_db = TestDatabase::at_version("migration_reclassify", 1).unwrap();
    assert_eq!(test_db.database().schema_version().unwrap(), 1);
    insert_legacy_wallet(&test_db);

    insert_legacy_account(&test_db, "plain", id(1), Some("chain"), &[]);
    insert_legacy_account(
        &test_db,
        "team",
        id(10),
        Some("multisig"),
        &[
            ("signatories", signatories_json(&[id(1), id(2), id(3)])),
            ("threshold", "2".to_string()),
            ("matrix_room_id", "!team:matrix.org".to_string()),
        ],
    );
    insert_legacy_account(
        &test_db,
        "staking",
        id(20),
        None,
        &[
            ("proxy_account_id", id(1).to_hex()),
            ("proxy_type", "Staking".to_string()),
            ("proxy_variant", "pure".to_string()),
        ],
    );
    insert_legacy_account(&test_db, "hardware", id(30), Some("ledger"), &[]);

    let version = test_db.database_mut().migrate().unwrap();
    assert_eq!(version, 3);

    let accounts = test_db.database().get_accounts().unwrap();
    assert_eq!(accounts.len(), 4);
    let kind_of = |account_id: AccountId| {
        accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .map(|a| a.kind.clone())
            .unwrap()
    };

    assert_eq!(kind_of(id(1)), AccountKind::Base);
    assert_eq!(kind_of(id(30)), AccountKind::Base);
    match kind_of(id(10)) {
        AccountKind::Multisig(details) => {
            assert_eq!(details.threshold, 2);
            assert_eq!(details.signatory_ids(), vec![id(1), id(2), id(3)]);
            assert_eq!(details.creator_account_id, id(1));
            assert_eq!(details.channel_id, "!team:matrix.org");
        }
        other => panic!("unexpected kind {:?}", other),
    }
    match kind_of(id(20)) {
        AccountKind::Proxied(details) => {
            assert_eq!(details.proxy_account_id, id(1));
            assert_eq!(details.proxy_type, ProxyType::Staking);
            assert_eq!(details.proxy_variant, ProxyVariant::Pure);
            assert_eq!(details.delay, 0);
        }
        other => panic!("unexpected kind {:?}", other),
    }

    let multisig = test_db
        .database()
        .find_multisig_by_channel("!team:matrix.org")
        .unwrap()
        .unwrap();
    assert_eq!(multisig.account_id, id(10));
}

#[test]
fn test_failed_migration_keeps_previous_version() {
    let mut test_db = TestDatabase::at_version("migration_rollback", 1).unwrap();
    insert_legacy_wallet(&test_db);
    insert_legacy_account(
        &test_db,
        "broken",
        id(10),
        Some("multisig"),
        &[("threshold", "2".to_string())],
    );

    assert!(test_db.database_mut().migrate().is_err());
    assert_eq!(test_db.database().schema_version().unwrap(), 1);

    let legacy_rows: i64 = test_db
        .database()
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM accounts WHERE account_type = ?1",
            params!["multisig"],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(legacy_rows, 1);
}
