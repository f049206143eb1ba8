//! Database trait abstractions, one per record family

use crate::errors::AppResult;
use crate::proxy::ProxiesDiff;
use crate::types::{
    Account, AccountBalance, AccountId, MultisigEvent, MultisigTransaction, MultisigTxKey,
    ProxiedAccount, ProxyAccount, ProxyDeposits,
};

/// Wallets and the accounts they own
pub trait AccountOperations {
    /// Create an empty wallet, returning its id
    fn create_wallet(&mut self, name: &str) -> AppResult<i64>;

    /// Delete a wallet together with every account it owns
    fn delete_wallet(&mut self, wallet_id: i64) -> AppResult<()>;

    /// Insert an account, or update name and kind of an existing one
    fn insert_account(&mut self, account: &Account) -> AppResult<()>;

    fn get_accounts(&self) -> AppResult<Vec<Account>>;

    /// Accounts usable on `chain_id`, including chain-agnostic ones
    fn get_accounts_for_chain(&self, chain_id: &str) -> AppResult<Vec<Account>>;

    /// Chain-specific account first, then a chain-agnostic one
    fn find_account(&self, account_id: &AccountId, chain_id: &str) -> AppResult<Option<Account>>;

    /// Multisig account whose signatories share `channel_id`
    fn find_multisig_by_channel(&self, channel_id: &str) -> AppResult<Option<Account>>;

    /// Delete every row for `account_id` (on one chain, or on all); returns rows removed
    fn delete_account(&mut self, account_id: &AccountId, chain_id: Option<&str>) -> AppResult<usize>;
}

/// Multisig transactions and the append-only event log
pub trait MultisigOperations {
    fn upsert_multisig_transaction(&mut self, tx: &MultisigTransaction) -> AppResult<()>;

    fn get_multisig_transaction(&self, key: &MultisigTxKey)
        -> AppResult<Option<MultisigTransaction>>;

    /// Every transaction of one multisig account, newest first
    fn get_multisig_transactions(&self, account_id: &AccountId)
        -> AppResult<Vec<MultisigTransaction>>;

    /// Append an event; `false` when an identical event is already stored
    fn insert_multisig_event(&mut self, event: &MultisigEvent) -> AppResult<bool>;

    fn get_multisig_events(&self, key: &MultisigTxKey) -> AppResult<Vec<MultisigEvent>>;

    /// Append `events` and upsert `tx` atomically; returns events actually appended
    fn save_multisig_state(
        &mut self,
        tx: &MultisigTransaction,
        events: &[MultisigEvent],
    ) -> AppResult<usize>;
}

/// Proxy relationships, proxied accounts and proxy deposits
pub trait ProxyOperations {
    fn get_proxies(&self, chain_id: &str) -> AppResult<Vec<ProxyAccount>>;

    /// Insert proxies, ignoring ones already stored; returns rows added
    fn add_proxies(&mut self, proxies: &[ProxyAccount]) -> AppResult<usize>;

    /// Delete proxies by full tuple; returns rows removed
    fn remove_proxies(&mut self, proxies: &[ProxyAccount]) -> AppResult<usize>;

    /// Proxied accounts stored for `chain_id`
    fn get_proxied_accounts(&self, chain_id: &str) -> AppResult<Vec<ProxiedAccount>>;

    /// Replace every deposit stored for the chain
    fn replace_proxy_deposits(&mut self, deposits: &ProxyDeposits) -> AppResult<()>;

    fn get_proxy_deposits(&self, chain_id: &str) -> AppResult<ProxyDeposits>;

    /// Apply one reconciliation result in a single transaction
    fn apply_proxies_diff(&mut self, diff: &ProxiesDiff) -> AppResult<()>;
}

/// Per-chain account balances
pub trait BalanceOperations {
    fn upsert_balances(&mut self, balances: &[AccountBalance]) -> AppResult<usize>;

    fn get_balances(&self, chain_id: &str) -> AppResult<Vec<AccountBalance>>;

    fn get_balance(
        &self,
        chain_id: &str,
        account_id: &AccountId,
        asset_id: u32,
    ) -> AppResult<Option<AccountBalance>>;
}
