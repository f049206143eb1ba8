//! Common Test Utilities
//!
//! Shared helpers for the unit and integration suites: unique database paths,
//! account fixtures and snapshot chains.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global test counter for generating unique test database paths
static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique test database path for a given test
///
/// Combines the test name, process id, a counter and a timestamp so tests
/// running in parallel never share a file.
pub fn create_unique_test_db_path(test_name: &str) -> String {
    let test_dir = PathBuf::from("test_output/delegation_tests");
    std::fs::create_dir_all(&test_dir).unwrap();

    let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    let db_path = test_dir.join(format!(
        "{}_{}_{}_{}.db",
        test_name,
        std::process::id(),
        unique_id,
        timestamp
    ));
    db_path.to_str().unwrap().to_string()
}

/// Database setup and teardown utilities
pub mod database {
    use delegation_engine::database::Database;

    /// Test database wrapper that removes its file on drop
    pub struct TestDatabase {
        pub db: Database,
        path: String,
    }

    impl TestDatabase {
        /// Fresh database at the latest schema
        pub fn new(test_name: &str) -> anyhow::Result<Self> {
            let path = super::create_unique_test_db_path(test_name);
            let db = Database::new(&path)?;
            Ok(TestDatabase { db, path })
        }

        /// Fresh database stopped at schema `version`
        pub fn at_version(test_name: &str, version: u32) -> anyhow::Result<Self> {
            let path = super::create_unique_test_db_path(test_name);
            let db = Database::with_schema_version(&path, version)?;
            Ok(TestDatabase { db, path })
        }

        pub fn path(&self) -> &str {
            &self.path
        }

        pub fn database(&self) -> &Database {
            &self.db
        }

        pub fn database_mut(&mut self) -> &mut Database {
            &mut self.db
        }
    }

    impl Drop for TestDatabase {
        fn drop(&mut self) {
            cleanup_test_database(&self.path);
        }
    }

    pub fn cleanup_test_database(db_path: &str) {
        if std::path::Path::new(db_path).exists() {
            let _ = std::fs::remove_file(db_path);
        }
    }
}

/// Account and chain fixtures
pub mod fixtures {
    use delegation_engine::chain::{ChainSnapshot, SnapshotChain};
    use delegation_engine::codec::derive_multisig_account_id;
    use delegation_engine::config::ChainConfig;
    use delegation_engine::fees::{MultisigConstants, ProxyConstants};
    use delegation_engine::types::{Account, AccountId, MultisigDetails, Signatory};
    use std::sync::Arc;

    pub const CHAIN: &str = "0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";

    pub const MULTISIG_CONSTANTS: MultisigConstants = MultisigConstants {
        deposit_base: 200_880_000_000,
        deposit_factor: 320_000_000,
    };

    pub const PROXY_CONSTANTS: ProxyConstants = ProxyConstants {
        deposit_base: 200_080_000_000,
        deposit_factor: 330_000_000,
    };

    pub fn id(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    pub fn base_account(wallet_id: i64, name: &str, account_id: AccountId) -> Account {
        Account::base(wallet_id, name, account_id, None)
    }

    pub fn multisig_account(
        wallet_id: i64,
        signatories: &[AccountId],
        threshold: u16,
        channel_id: &str,
    ) -> Account {
        Account::multisig(
            wallet_id,
            "shared",
            derive_multisig_account_id(signatories, threshold).unwrap(),
            Some(CHAIN.to_string()),
            MultisigDetails {
                signatories: signatories.iter().copied().map(Signatory::new).collect(),
                threshold,
                creator_account_id: signatories[0],
                channel_id: channel_id.to_string(),
            },
        )
    }

    pub fn chain_config() -> ChainConfig {
        ChainConfig {
            multisig: Some(MULTISIG_CONSTANTS),
            proxy: Some(PROXY_CONSTANTS),
            ..ChainConfig::new(CHAIN, "Polkadot")
        }
    }

    /// Snapshot chain carrying the runtime constants the fixtures use
    pub fn snapshot_chain() -> Arc<SnapshotChain> {
        let snapshot = ChainSnapshot::new(CHAIN)
            .with_constant("multisig", "depositBase", MULTISIG_CONSTANTS.deposit_base)
            .with_constant("multisig", "depositFactor", MULTISIG_CONSTANTS.deposit_factor)
            .with_constant("proxy", "proxyDepositBase", PROXY_CONSTANTS.deposit_base)
            .with_constant("proxy", "proxyDepositFactor", PROXY_CONSTANTS.deposit_factor);
        Arc::new(SnapshotChain::new(snapshot))
    }
}
