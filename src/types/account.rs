//! Account taxonomy
//!
//! An account is owned by exactly one wallet. Its `kind` is an explicit
//! discriminant: callers match on [`AccountKind`] instead of probing for
//! multisig- or proxy-specific fields.

use serde::{Deserialize, Serialize};

use super::common::{AccountId, ChainId};
use super::proxy::{ProxyType, ProxyVariant};

/// Key scheme of the account's signing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CryptoType {
    #[default]
    Sr25519,
    Ed25519,
    Ecdsa,
    Ethereum,
}

/// Address family of the chain the account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    #[default]
    Substrate,
    Ethereum,
}

/// One member of a multisig signatory set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    pub account_id: AccountId,
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Signatory {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            address: account_id.to_address(),
            name: None,
        }
    }
}

/// Multisig-specific account data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigDetails {
    pub signatories: Vec<Signatory>,
    pub threshold: u16,
    pub creator_account_id: AccountId,
    /// Secure-messaging room shared by the signatories (empty when none)
    #[serde(default)]
    pub channel_id: String,
}

impl MultisigDetails {
    pub fn signatory_ids(&self) -> Vec<AccountId> {
        self.signatories.iter().map(|s| s.account_id).collect()
    }

    pub fn has_signatory(&self, account_id: &AccountId) -> bool {
        self.signatories.iter().any(|s| &s.account_id == account_id)
    }

    /// Sorted signatory ids excluding the acting signatory
    pub fn other_signatories(&self, signatory: &AccountId) -> Vec<AccountId> {
        let mut others: Vec<AccountId> = self
            .signatories
            .iter()
            .map(|s| s.account_id)
            .filter(|id| id != signatory)
            .collect();
        others.sort();
        others
    }

    pub fn has_channel(&self) -> bool {
        !self.channel_id.is_empty()
    }
}

/// Data carried by an account that is the proxied side of a proxy relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxiedDetails {
    pub proxy_account_id: AccountId,
    pub proxy_type: ProxyType,
    pub proxy_variant: ProxyVariant,
    pub delay: u32,
    #[serde(default)]
    pub block_number: Option<u32>,
    #[serde(default)]
    pub extrinsic_index: Option<u32>,
}

/// Explicit account discriminant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountKind {
    Base,
    Multisig(MultisigDetails),
    Proxied(ProxiedDetails),
}

impl AccountKind {
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Base => "base",
            AccountKind::Multisig(_) => "multisig",
            AccountKind::Proxied(_) => "proxied",
        }
    }
}

/// Wallet-owned account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub wallet_id: i64,
    pub name: String,
    pub account_id: AccountId,
    /// `None` for accounts usable on every chain of their chain type
    pub chain_id: Option<ChainId>,
    pub crypto_type: CryptoType,
    pub chain_type: ChainType,
    pub kind: AccountKind,
}

impl Account {
    pub fn base(
        wallet_id: i64,
        name: impl Into<String>,
        account_id: AccountId,
        chain_id: Option<ChainId>,
    ) -> Self {
        Self {
            wallet_id,
            name: name.into(),
            account_id,
            chain_id,
            crypto_type: CryptoType::default(),
            chain_type: ChainType::default(),
            kind: AccountKind::Base,
        }
    }

    pub fn multisig(
        wallet_id: i64,
        name: impl Into<String>,
        account_id: AccountId,
        chain_id: Option<ChainId>,
        details: MultisigDetails,
    ) -> Self {
        Self {
            kind: AccountKind::Multisig(details),
            ..Self::base(wallet_id, name, account_id, chain_id)
        }
    }

    pub fn proxied(
        wallet_id: i64,
        name: impl Into<String>,
        account_id: AccountId,
        chain_id: ChainId,
        details: ProxiedDetails,
    ) -> Self {
        Self {
            kind: AccountKind::Proxied(details),
            ..Self::base(wallet_id, name, account_id, Some(chain_id))
        }
    }

    pub fn multisig_details(&self) -> Option<&MultisigDetails> {
        match &self.kind {
            AccountKind::Multisig(details) => Some(details),
            _ => None,
        }
    }

    pub fn proxied_details(&self) -> Option<&ProxiedDetails> {
        match &self.kind {
            AccountKind::Proxied(details) => Some(details),
            _ => None,
        }
    }

    /// Whether the account can act on `chain_id`
    pub fn is_on_chain(&self, chain_id: &str) -> bool {
        self.chain_id.as_deref().map_or(true, |id| id == chain_id)
    }
}
