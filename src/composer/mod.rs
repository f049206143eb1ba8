//! Transaction wrapper composer
//!
//! A core transaction is turned into the extrinsic that is actually broadcast
//! by folding a wrapping stack over it. The stack is ordered outermost first
//! and applied innermost first:
//! - `[MULTISIG]` gives `asMulti(core)`
//! - `[PROXY]` gives `proxy(core)`
//! - `[PROXY, MULTISIG]` gives `proxy(asMulti(core))`, a multisig whose acting
//!   signatory is only reachable through a proxy
//! - `[MULTISIG, PROXY]` gives `asMulti(proxy(core))`, a proxied account whose
//!   proxy is a multisig
//!
//! Composition is pure; [`get_tx_wrappers`] picks the stack from the wallet's
//! local account graph without touching the chain.

pub mod encode;

pub use encode::{encode_payload, encode_transaction};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::CallRegistry;
use crate::codec::{call_hash, derive_multisig_account_id};
use crate::errors::{AppError, AppResult};
use crate::types::{
    Account, AccountId, AccountKind, CallArgs, CallHash, ProxyAccount, Transaction, TxPayload,
    Weight,
};

/// Act for `proxied_account` through `proxy_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyWrapper {
    pub proxy_account: ProxyAccount,
    pub proxied_account: Account,
}

/// Act for `multisig_account` as `signatory_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigWrapper {
    pub multisig_account: Account,
    pub signatory_id: AccountId,
}

/// One delegation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxWrapper {
    Proxy(ProxyWrapper),
    Multisig(MultisigWrapper),
}

impl TxWrapper {
    pub fn label(&self) -> &'static str {
        match self {
            TxWrapper::Proxy(_) => "PROXY",
            TxWrapper::Multisig(_) => "MULTISIG",
        }
    }
}

/// Result of composing a wrapping stack over a core transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedTransaction {
    /// Unwrapped transaction, for local bookkeeping and display
    pub core_tx: Transaction,
    /// Outermost layer, the one that is signed and broadcast
    pub wrapped_tx: Transaction,
    /// The `asMulti` layer, even when a proxy wraps it further
    pub multisig_tx: Option<Transaction>,
}

impl WrappedTransaction {
    /// Call dispatched by the multisig once the threshold is reached
    pub fn unwrap_multisig_call(&self) -> Option<&TxPayload> {
        match self.multisig_tx.as_ref().map(|tx| &tx.args) {
            Some(CallArgs::AsMulti { call, .. }) => Some(call),
            _ => None,
        }
    }

    /// Call hash the multisig transaction is tracked under
    pub fn multisig_call_hash(&self, registry: &CallRegistry) -> AppResult<Option<CallHash>> {
        self.unwrap_multisig_call()
            .map(|call| encode_payload(registry, call).map(|bytes| call_hash(&bytes)))
            .transpose()
    }

    pub fn multisig_threshold(&self) -> Option<u16> {
        match self.multisig_tx.as_ref().map(|tx| &tx.args) {
            Some(CallArgs::AsMulti { threshold, .. }) => Some(*threshold),
            _ => None,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        self.core_tx != self.wrapped_tx
    }
}

/// Compose with a zero max weight
pub fn compose(core_tx: Transaction, wrappers: &[TxWrapper]) -> AppResult<WrappedTransaction> {
    compose_with_weight(core_tx, wrappers, Weight::ZERO)
}

/// Fold the wrapping stack right to left over `core_tx`
pub fn compose_with_weight(
    core_tx: Transaction,
    wrappers: &[TxWrapper],
    max_weight: Weight,
) -> AppResult<WrappedTransaction> {
    let mut current = core_tx.clone();
    let mut multisig_tx: Option<Transaction> = None;

    for wrapper in wrappers.iter().rev() {
        current = match wrapper {
            TxWrapper::Multisig(layer) => {
                let wrapped = wrap_multisig(current, layer, max_weight)?;
                if multisig_tx.is_some() {
                    return Err(AppError::InvalidWrapper(
                        "stack contains more than one multisig layer".to_string(),
                    ));
                }
                multisig_tx = Some(wrapped.clone());
                wrapped
            }
            TxWrapper::Proxy(layer) => wrap_proxy(current, layer)?,
        };
    }

    debug!(
        "Composed {:?} with [{}]",
        core_tx.tx_type,
        wrappers
            .iter()
            .map(|w| w.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(WrappedTransaction {
        core_tx,
        wrapped_tx: current,
        multisig_tx,
    })
}

fn wrap_multisig(
    payload: Transaction,
    layer: &MultisigWrapper,
    max_weight: Weight,
) -> AppResult<Transaction> {
    let account = &layer.multisig_account;
    let details = account.multisig_details().ok_or_else(|| {
        AppError::InvalidWrapper(format!(
            "account {} is {} not multisig",
            account.account_id,
            account.kind.label()
        ))
    })?;

    if payload.address != account.account_id {
        return Err(AppError::InvalidWrapper(format!(
            "multisig layer for {} wraps a call sent by {}",
            account.account_id, payload.address
        )));
    }
    if !details.has_signatory(&layer.signatory_id) {
        return Err(AppError::InvalidWrapper(format!(
            "{} is not a signatory of {}",
            layer.signatory_id, account.account_id
        )));
    }

    let other_signatories = details.other_signatories(&layer.signatory_id);
    let mut all_signatories = other_signatories.clone();
    all_signatories.push(layer.signatory_id);
    let derived = derive_multisig_account_id(&all_signatories, details.threshold)?;
    if derived != account.account_id {
        return Err(AppError::InvalidWrapper(format!(
            "signatories and threshold {} derive {}, not {}",
            details.threshold, derived, account.account_id
        )));
    }

    let chain_id = payload.chain_id.clone();
    Ok(Transaction::new(
        chain_id,
        layer.signatory_id,
        CallArgs::AsMulti {
            threshold: details.threshold,
            other_signatories,
            maybe_timepoint: None,
            call: Box::new(TxPayload::Authored(payload)),
            max_weight,
        },
    ))
}

fn wrap_proxy(payload: Transaction, layer: &ProxyWrapper) -> AppResult<Transaction> {
    let proxied = &layer.proxied_account;
    if layer.proxy_account.proxied_account_id != proxied.account_id {
        return Err(AppError::InvalidWrapper(format!(
            "proxy {} acts for {}, not {}",
            layer.proxy_account.account_id, layer.proxy_account.proxied_account_id, proxied.account_id
        )));
    }
    if payload.address != proxied.account_id {
        return Err(AppError::InvalidWrapper(format!(
            "proxy layer for {} wraps a call sent by {}",
            proxied.account_id, payload.address
        )));
    }

    let chain_id = payload.chain_id.clone();
    Ok(Transaction::new(
        chain_id,
        layer.proxy_account.account_id,
        CallArgs::Proxy {
            real: proxied.account_id,
            force_proxy_type: Some(layer.proxy_account.proxy_type),
            call: Box::new(TxPayload::Authored(payload)),
        },
    ))
}

fn find_wallet_account<'a>(
    wallet_accounts: &'a [Account],
    account_id: &AccountId,
    chain_id: &str,
) -> Option<&'a Account> {
    wallet_accounts
        .iter()
        .find(|a| &a.account_id == account_id && a.is_on_chain(chain_id))
}

fn proxy_wrapper(proxied: &Account, chain_id: &str) -> Option<TxWrapper> {
    let details = proxied.proxied_details()?;
    Some(TxWrapper::Proxy(ProxyWrapper {
        proxy_account: ProxyAccount {
            chain_id: chain_id.to_string(),
            proxied_account_id: proxied.account_id,
            account_id: details.proxy_account_id,
            proxy_type: details.proxy_type,
            delay: details.delay,
        },
        proxied_account: proxied.clone(),
    }))
}

/// Pick the acting signatory of `multisig` the wallet can sign for
///
/// Signatories the wallet holds directly win over ones it reaches through a
/// proxy; `allow_proxied` is false when a further layer would be needed.
fn choose_signatory<'a>(
    multisig: &Account,
    wallet_accounts: &'a [Account],
    chain_id: &str,
    allow_proxied: bool,
) -> Option<&'a Account> {
    let details = multisig.multisig_details()?;
    let candidates: Vec<&Account> = details
        .signatories
        .iter()
        .filter_map(|s| find_wallet_account(wallet_accounts, &s.account_id, chain_id))
        .collect();

    candidates
        .iter()
        .find(|a| matches!(a.kind, AccountKind::Base))
        .or_else(|| {
            candidates
                .iter()
                .find(|a| allow_proxied && matches!(a.kind, AccountKind::Proxied(_)))
        })
        .copied()
}

/// Wrapping stack needed to send a transaction from `account`
///
/// `signatory` forces the acting signatory when `account` is a multisig (or
/// is proxied by one); otherwise the wallet's own signatory is chosen.
pub fn get_tx_wrappers(
    account: &Account,
    wallet_accounts: &[Account],
    chain_id: &str,
    signatory: Option<AccountId>,
) -> AppResult<Vec<TxWrapper>> {
    match &account.kind {
        AccountKind::Base => Ok(Vec::new()),
        AccountKind::Multisig(details) => {
            let signatory_account = match signatory {
                Some(id) => {
                    if !details.has_signatory(&id) {
                        return Err(AppError::InvalidWrapper(format!(
                            "{} is not a signatory of {}",
                            id, account.account_id
                        )));
                    }
                    find_wallet_account(wallet_accounts, &id, chain_id)
                }
                None => choose_signatory(account, wallet_accounts, chain_id, true),
            };
            let signatory_id = signatory.or(signatory_account.map(|a| a.account_id)).ok_or_else(|| {
                AppError::InvalidWrapper(format!(
                    "wallet holds no signatory of {}",
                    account.account_id
                ))
            })?;

            let multisig = TxWrapper::Multisig(MultisigWrapper {
                multisig_account: account.clone(),
                signatory_id,
            });
            match signatory_account.and_then(|a| proxy_wrapper(a, chain_id)) {
                Some(proxy) => Ok(vec![proxy, multisig]),
                None => Ok(vec![multisig]),
            }
        }
        AccountKind::Proxied(details) => {
            let proxy = proxy_wrapper(account, chain_id).ok_or_else(|| {
                AppError::InvalidWrapper(format!("{} has no proxy details", account.account_id))
            })?;

            let Some(proxy_account) =
                find_wallet_account(wallet_accounts, &details.proxy_account_id, chain_id)
            else {
                return Ok(vec![proxy]);
            };
            if proxy_account.multisig_details().is_none() {
                return Ok(vec![proxy]);
            }

            let signatory_id = match signatory {
                Some(id) => id,
                None => choose_signatory(proxy_account, wallet_accounts, chain_id, false)
                    .map(|a| a.account_id)
                    .ok_or_else(|| {
                        AppError::InvalidWrapper(format!(
                            "wallet holds no signatory of proxy {}",
                            proxy_account.account_id
                        ))
                    })?,
            };
            Ok(vec![
                TxWrapper::Multisig(MultisigWrapper {
                    multisig_account: proxy_account.clone(),
                    signatory_id,
                }),
                proxy,
            ])
        }
    }
}
