//! Call index registry
//!
//! Maps `(section, method)` names to the `(pallet_index, call_index)` pair
//! that prefixes every encoded call, and back again for decoding.

use serde::{Deserialize, Serialize};

/// One pallet's dispatchable calls; a call's index is its position in `calls`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletCalls {
    pub name: String,
    pub index: u8,
    pub calls: Vec<String>,
}

impl PalletCalls {
    fn new(name: &str, index: u8, calls: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            index,
            calls: calls.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRegistry {
    pallets: Vec<PalletCalls>,
}

impl CallRegistry {
    pub fn new(pallets: Vec<PalletCalls>) -> Self {
        Self { pallets }
    }

    pub fn pallets(&self) -> &[PalletCalls] {
        &self.pallets
    }

    pub fn call_index(&self, section: &str, method: &str) -> Option<(u8, u8)> {
        let pallet = self.pallets.iter().find(|p| p.name == section)?;
        let call = pallet.calls.iter().position(|c| c == method)?;
        Some((pallet.index, u8::try_from(call).ok()?))
    }

    pub fn resolve(&self, pallet_index: u8, call_index: u8) -> Option<(&str, &str)> {
        let pallet = self.pallets.iter().find(|p| p.index == pallet_index)?;
        let method = pallet.calls.get(call_index as usize)?;
        Some((pallet.name.as_str(), method.as_str()))
    }
}

impl Default for CallRegistry {
    /// Relay-chain pallet layout
    fn default() -> Self {
        Self::new(vec![
            PalletCalls::new(
                "system",
                0,
                &[
                    "remark",
                    "setHeapPages",
                    "setCode",
                    "setCodeWithoutChecks",
                    "setStorage",
                    "killStorage",
                    "killPrefix",
                    "remarkWithEvent",
                ],
            ),
            PalletCalls::new(
                "balances",
                5,
                &[
                    "transferAllowDeath",
                    "setBalanceDeprecated",
                    "forceTransfer",
                    "transferKeepAlive",
                    "transferAll",
                    "forceUnreserve",
                ],
            ),
            PalletCalls::new(
                "staking",
                7,
                &[
                    "bond",
                    "bondExtra",
                    "unbond",
                    "withdrawUnbonded",
                    "validate",
                    "nominate",
                    "chill",
                ],
            ),
            PalletCalls::new(
                "utility",
                26,
                &["batch", "asDerivative", "batchAll", "dispatchAs", "forceBatch"],
            ),
            PalletCalls::new(
                "proxy",
                29,
                &[
                    "proxy",
                    "addProxy",
                    "removeProxy",
                    "removeProxies",
                    "createPure",
                    "killPure",
                    "announce",
                    "removeAnnouncement",
                    "rejectAnnouncement",
                    "proxyAnnounced",
                ],
            ),
            PalletCalls::new(
                "multisig",
                30,
                &["asMultiThreshold1", "asMulti", "approveAsMulti", "cancelAsMulti"],
            ),
        ])
    }
}
