//! Authored and decoded transactions
//!
//! A [`Transaction`] is what the wallet user intends; a [`DecodedTransaction`]
//! is reconstructed from raw call bytes seen on chain. [`TxPayload`] is the
//! tagged union of the two.

use serde::{Deserialize, Serialize};

use super::common::{balance_string, hex_bytes, AccountId, Balance, CallHash, ChainId, Timepoint};
use super::proxy::ProxyType;

/// Transaction kinds the engine can encode and decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    Bond,
    Unbond,
    Nominate,
    Chill,
    Batch,
    MultisigAsMulti,
    MultisigApproveAsMulti,
    MultisigCancelAsMulti,
    AddProxy,
    RemoveProxy,
    CreatePureProxy,
    Proxy,
    Remark,
}

impl TransactionType {
    /// Canonical `(section, method)` used when encoding
    pub fn call_name(&self) -> (&'static str, &'static str) {
        match self {
            TransactionType::Transfer => ("balances", "transferKeepAlive"),
            TransactionType::Bond => ("staking", "bond"),
            TransactionType::Unbond => ("staking", "unbond"),
            TransactionType::Nominate => ("staking", "nominate"),
            TransactionType::Chill => ("staking", "chill"),
            TransactionType::Batch => ("utility", "batchAll"),
            TransactionType::MultisigAsMulti => ("multisig", "asMulti"),
            TransactionType::MultisigApproveAsMulti => ("multisig", "approveAsMulti"),
            TransactionType::MultisigCancelAsMulti => ("multisig", "cancelAsMulti"),
            TransactionType::AddProxy => ("proxy", "addProxy"),
            TransactionType::RemoveProxy => ("proxy", "removeProxy"),
            TransactionType::CreatePureProxy => ("proxy", "createPure"),
            TransactionType::Proxy => ("proxy", "proxy"),
            TransactionType::Remark => ("system", "remark"),
        }
    }

    /// Map an on-chain `(section, method)` pair to a known type
    pub fn from_call_name(section: &str, method: &str) -> Option<Self> {
        let tx_type = match (section, method) {
            ("balances", "transferKeepAlive")
            | ("balances", "transferAllowDeath")
            | ("balances", "transfer") => TransactionType::Transfer,
            ("staking", "bond") => TransactionType::Bond,
            ("staking", "unbond") => TransactionType::Unbond,
            ("staking", "nominate") => TransactionType::Nominate,
            ("staking", "chill") => TransactionType::Chill,
            ("utility", "batch") | ("utility", "batchAll") | ("utility", "forceBatch") => {
                TransactionType::Batch
            }
            ("multisig", "asMulti") => TransactionType::MultisigAsMulti,
            ("multisig", "approveAsMulti") => TransactionType::MultisigApproveAsMulti,
            ("multisig", "cancelAsMulti") => TransactionType::MultisigCancelAsMulti,
            ("proxy", "addProxy") => TransactionType::AddProxy,
            ("proxy", "removeProxy") => TransactionType::RemoveProxy,
            ("proxy", "createPure") => TransactionType::CreatePureProxy,
            ("proxy", "proxy") => TransactionType::Proxy,
            ("system", "remark") => TransactionType::Remark,
            _ => return None,
        };
        Some(tx_type)
    }

    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            TransactionType::MultisigAsMulti
                | TransactionType::MultisigApproveAsMulti
                | TransactionType::MultisigCancelAsMulti
        )
    }
}

/// Weight limit attached to multisig execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Weight {
    pub ref_time: u64,
    pub proof_size: u64,
}

impl Weight {
    pub const ZERO: Weight = Weight {
        ref_time: 0,
        proof_size: 0,
    };
}

/// Where staking rewards are paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardDestination {
    Staked,
    Stash,
    Controller,
    Account(AccountId),
    None,
}

/// Typed call arguments, one variant per [`TransactionType`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum CallArgs {
    Transfer {
        dest: AccountId,
        #[serde(with = "balance_string")]
        value: Balance,
    },
    Bond {
        #[serde(with = "balance_string")]
        value: Balance,
        payee: RewardDestination,
    },
    Unbond {
        #[serde(with = "balance_string")]
        value: Balance,
    },
    Nominate {
        targets: Vec<AccountId>,
    },
    Chill,
    Batch {
        calls: Vec<TxPayload>,
    },
    AsMulti {
        threshold: u16,
        other_signatories: Vec<AccountId>,
        maybe_timepoint: Option<Timepoint>,
        call: Box<TxPayload>,
        max_weight: Weight,
    },
    ApproveAsMulti {
        threshold: u16,
        other_signatories: Vec<AccountId>,
        maybe_timepoint: Option<Timepoint>,
        call_hash: CallHash,
        max_weight: Weight,
    },
    CancelAsMulti {
        threshold: u16,
        other_signatories: Vec<AccountId>,
        timepoint: Timepoint,
        call_hash: CallHash,
    },
    AddProxy {
        delegate: AccountId,
        proxy_type: ProxyType,
        delay: u32,
    },
    RemoveProxy {
        delegate: AccountId,
        proxy_type: ProxyType,
        delay: u32,
    },
    CreatePureProxy {
        proxy_type: ProxyType,
        delay: u32,
        index: u16,
    },
    Proxy {
        real: AccountId,
        force_proxy_type: Option<ProxyType>,
        call: Box<TxPayload>,
    },
    Remark {
        #[serde(with = "hex_bytes")]
        remark: Vec<u8>,
    },
}

impl CallArgs {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            CallArgs::Transfer { .. } => TransactionType::Transfer,
            CallArgs::Bond { .. } => TransactionType::Bond,
            CallArgs::Unbond { .. } => TransactionType::Unbond,
            CallArgs::Nominate { .. } => TransactionType::Nominate,
            CallArgs::Chill => TransactionType::Chill,
            CallArgs::Batch { .. } => TransactionType::Batch,
            CallArgs::AsMulti { .. } => TransactionType::MultisigAsMulti,
            CallArgs::ApproveAsMulti { .. } => TransactionType::MultisigApproveAsMulti,
            CallArgs::CancelAsMulti { .. } => TransactionType::MultisigCancelAsMulti,
            CallArgs::AddProxy { .. } => TransactionType::AddProxy,
            CallArgs::RemoveProxy { .. } => TransactionType::RemoveProxy,
            CallArgs::CreatePureProxy { .. } => TransactionType::CreatePureProxy,
            CallArgs::Proxy { .. } => TransactionType::Proxy,
            CallArgs::Remark { .. } => TransactionType::Remark,
        }
    }
}

/// User-authored transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub chain_id: ChainId,
    /// Sender of this layer
    pub address: AccountId,
    pub args: CallArgs,
}

impl Transaction {
    pub fn new(chain_id: impl Into<ChainId>, address: AccountId, args: CallArgs) -> Self {
        Self {
            tx_type: args.tx_type(),
            chain_id: chain_id.into(),
            address,
            args,
        }
    }
}

/// Transaction reconstructed from raw call bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedTransaction {
    /// `None` for calls the decoder has no parser for
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub chain_id: ChainId,
    pub address: AccountId,
    pub section: String,
    pub method: String,
    /// `None` when the call is unknown
    pub args: Option<CallArgs>,
    /// Exact call bytes this record was decoded from
    #[serde(with = "hex_bytes")]
    pub call_data: Vec<u8>,
}

/// Either an authored or a decoded transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum TxPayload {
    Authored(Transaction),
    Decoded(DecodedTransaction),
}

impl TxPayload {
    pub fn tx_type(&self) -> Option<TransactionType> {
        match self {
            TxPayload::Authored(tx) => Some(tx.tx_type),
            TxPayload::Decoded(decoded) => decoded.tx_type,
        }
    }

    pub fn chain_id(&self) -> &str {
        match self {
            TxPayload::Authored(tx) => &tx.chain_id,
            TxPayload::Decoded(decoded) => &decoded.chain_id,
        }
    }

    pub fn sender(&self) -> AccountId {
        match self {
            TxPayload::Authored(tx) => tx.address,
            TxPayload::Decoded(decoded) => decoded.address,
        }
    }

    pub fn args(&self) -> Option<&CallArgs> {
        match self {
            TxPayload::Authored(tx) => Some(&tx.args),
            TxPayload::Decoded(decoded) => decoded.args.as_ref(),
        }
    }
}

impl From<Transaction> for TxPayload {
    fn from(tx: Transaction) -> Self {
        TxPayload::Authored(tx)
    }
}

impl From<DecodedTransaction> for TxPayload {
    fn from(decoded: DecodedTransaction) -> Self {
        TxPayload::Decoded(decoded)
    }
}

/// True when the payload was reconstructed from chain bytes rather than authored locally
pub fn is_decoded_tx(payload: &TxPayload) -> bool {
    matches!(payload, TxPayload::Decoded(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    #[test]
    fn test_nested_wrappers_survive_json() {
        let transfer = Transaction::new(
            "polkadot",
            id(50),
            CallArgs::Transfer {
                dest: id(99),
                value: u128::MAX,
            },
        );
        let proxy = Transaction::new(
            "polkadot",
            id(7),
            CallArgs::Proxy {
                real: id(50),
                force_proxy_type: Some(ProxyType::Any),
                call: Box::new(TxPayload::Authored(transfer)),
            },
        );
        let as_multi = TxPayload::Authored(Transaction::new(
            "polkadot",
            id(1),
            CallArgs::AsMulti {
                threshold: 2,
                other_signatories: vec![id(2), id(3)],
                maybe_timepoint: Some(Timepoint::new(10, 2)),
                call: Box::new(TxPayload::Authored(proxy)),
                max_weight: Weight::ZERO,
            },
        ));

        let json = serde_json::to_string(&as_multi).unwrap();
        let restored: TxPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, as_multi);
    }

    #[test]
    fn test_decoded_payload_survives_json() {
        let decoded = TxPayload::Decoded(DecodedTransaction {
            tx_type: Some(TransactionType::Batch),
            chain_id: "polkadot".to_string(),
            address: id(1),
            section: "utility".to_string(),
            method: "batchAll".to_string(),
            args: Some(CallArgs::Batch {
                calls: vec![TxPayload::Authored(Transaction::new(
                    "polkadot",
                    id(1),
                    CallArgs::Remark {
                        remark: vec![1, 2, 3],
                    },
                ))],
            }),
            call_data: vec![26, 2, 4, 0, 0, 12, 1, 2, 3],
        });

        let json = serde_json::to_string(&decoded).unwrap();
        assert!(is_decoded_tx(&serde_json::from_str(&json).unwrap()));
        assert_eq!(serde_json::from_str::<TxPayload>(&json).unwrap(), decoded);
    }
}
