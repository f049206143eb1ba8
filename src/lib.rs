//! Multisig and proxy delegation engine
//!
//! Tracks multisig consensus, reconciles proxy relationships against chain
//! state and composes wrapped transactions for a multi-account wallet.

pub mod chain;
pub mod cli;
pub mod codec;
pub mod composer;
pub mod config;
pub mod database;
pub mod decoder;
pub mod errors;
pub mod fees;
pub mod messaging;
pub mod multisig;
pub mod proxy;
pub mod types;
