use serde::{Deserialize, Serialize};

use super::common::{AccountId, Balance, ChainId};

/// Asset id used for the chain's native token
pub const NATIVE_ASSET_ID: u32 = 0;

/// Balance snapshot of one account/asset on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub chain_id: ChainId,
    pub account_id: AccountId,
    #[serde(default)]
    pub asset_id: u32,
    pub free: Balance,
    #[serde(default)]
    pub reserved: Balance,
    #[serde(default)]
    pub frozen: Balance,
    /// Cross-checked against a trusted relay chain
    #[serde(default)]
    pub verified: bool,
}

impl AccountBalance {
    pub fn native(chain_id: impl Into<ChainId>, account_id: AccountId, free: Balance) -> Self {
        Self {
            chain_id: chain_id.into(),
            account_id,
            asset_id: NATIVE_ASSET_ID,
            free,
            reserved: 0,
            frozen: 0,
            verified: false,
        }
    }

    /// Amount that can pay fees and reserve deposits
    pub fn transferable(&self) -> Balance {
        self.free.saturating_sub(self.frozen)
    }
}
