//! Unit Tests Module
//!
//! Properties that must hold over many inputs: account derivation, the
//! multisig fold, proxy reconciliation and the deposit formulas.

pub mod deposits;
pub mod derivation;
pub mod multisig_fold;
pub mod proxy_reconcile;
