//! Integration Tests Module
//!
//! End-to-end flows across the composer, chain capability, tracker,
//! reconciliation worker and database.

pub mod decode_round_trip;
pub mod migration_upgrade;
pub mod multisig_flow;
pub mod proxy_sync;
