//! Proxy relationship types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::common::{AccountId, Balance, ChainId};

/// Capability class granted to a proxy
///
/// Discriminants follow the relay-chain runtime's `ProxyType` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProxyType {
    Any,
    NonTransfer,
    Governance,
    Staking,
    IdentityJudgement,
    CancelProxy,
    Auction,
    NominationPools,
}

impl ProxyType {
    pub fn index(&self) -> u8 {
        match self {
            ProxyType::Any => 0,
            ProxyType::NonTransfer => 1,
            ProxyType::Governance => 2,
            ProxyType::Staking => 3,
            ProxyType::IdentityJudgement => 5,
            ProxyType::CancelProxy => 6,
            ProxyType::Auction => 7,
            ProxyType::NominationPools => 8,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ProxyType::Any),
            1 => Some(ProxyType::NonTransfer),
            2 => Some(ProxyType::Governance),
            3 => Some(ProxyType::Staking),
            5 => Some(ProxyType::IdentityJudgement),
            6 => Some(ProxyType::CancelProxy),
            7 => Some(ProxyType::Auction),
            8 => Some(ProxyType::NominationPools),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Any => "Any",
            ProxyType::NonTransfer => "NonTransfer",
            ProxyType::Governance => "Governance",
            ProxyType::Staking => "Staking",
            ProxyType::IdentityJudgement => "IdentityJudgement",
            ProxyType::CancelProxy => "CancelProxy",
            ProxyType::Auction => "Auction",
            ProxyType::NominationPools => "NominationPools",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            ProxyType::Any,
            ProxyType::NonTransfer,
            ProxyType::Governance,
            ProxyType::Staking,
            ProxyType::IdentityJudgement,
            ProxyType::CancelProxy,
            ProxyType::Auction,
            ProxyType::NominationPools,
        ]
        .into_iter()
        .find(|t| t.as_str() == value)
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regular proxies are added by an existing account; pure proxies are keyless
/// accounts spawned by `createPure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyVariant {
    #[default]
    Regular,
    Pure,
}

impl ProxyVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyVariant::Regular => "regular",
            ProxyVariant::Pure => "pure",
        }
    }
}

/// `account_id` may act as proxy for `proxied_account_id` on `chain_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProxyAccount {
    pub chain_id: ChainId,
    pub proxied_account_id: AccountId,
    pub account_id: AccountId,
    pub proxy_type: ProxyType,
    pub delay: u32,
}

impl ProxyAccount {
    /// Full-tuple identity check
    pub fn is_same_proxy(&self, other: &ProxyAccount) -> bool {
        self.chain_id == other.chain_id
            && self.proxied_account_id == other.proxied_account_id
            && self.account_id == other.account_id
            && self.proxy_type == other.proxy_type
            && self.delay == other.delay
    }
}

/// Local view of an account that is the proxied side of a relationship the
/// wallet can exercise
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxiedAccount {
    pub chain_id: ChainId,
    pub account_id: AccountId,
    pub proxy_account_id: AccountId,
    pub proxy_type: ProxyType,
    pub delay: u32,
    pub proxy_variant: ProxyVariant,
}

impl ProxiedAccount {
    pub fn from_proxy(proxy: &ProxyAccount, proxy_variant: ProxyVariant) -> Self {
        Self {
            chain_id: proxy.chain_id.clone(),
            account_id: proxy.proxied_account_id,
            proxy_account_id: proxy.account_id,
            proxy_type: proxy.proxy_type,
            delay: proxy.delay,
            proxy_variant,
        }
    }

    /// Identity ignores the variant: a pure proxy re-observed as a plain chain
    /// entry is the same relationship
    pub fn is_same_proxied(&self, other: &ProxiedAccount) -> bool {
        self.chain_id == other.chain_id
            && self.account_id == other.account_id
            && self.proxy_account_id == other.proxy_account_id
            && self.proxy_type == other.proxy_type
            && self.delay == other.delay
    }
}

/// Per-chain proxy deposits produced by a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDeposits {
    pub chain_id: ChainId,
    pub deposits: BTreeMap<AccountId, Balance>,
}

impl ProxyDeposits {
    pub fn new(chain_id: impl Into<ChainId>) -> Self {
        Self {
            chain_id: chain_id.into(),
            deposits: BTreeMap::new(),
        }
    }
}
