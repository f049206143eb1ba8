use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use super::scale::encode_account_ids;
use crate::errors::{AppError, AppResult};
use crate::types::{AccountId, CallHash};

/// Domain separator for multisig account derivation
pub const MULTISIG_DERIVATION_PREFIX: &[u8] = b"modlpy/utilisuba";

fn hash_256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Content hash of an encoded call
pub fn call_hash(call_data: &[u8]) -> CallHash {
    CallHash(hash_256(call_data))
}

/// Deterministic multisig account id for a signatory set and threshold
///
/// Input order does not matter: ids are sorted before hashing. Empty sets,
/// duplicate ids and thresholds outside `1..=len` are rejected.
pub fn derive_multisig_account_id(
    signatories: &[AccountId],
    threshold: u16,
) -> AppResult<AccountId> {
    if signatories.is_empty() {
        return Err(AppError::MultisigDerivation(
            "signatory set is empty".to_string(),
        ));
    }

    let unique: BTreeSet<AccountId> = signatories.iter().copied().collect();
    if unique.len() != signatories.len() {
        return Err(AppError::MultisigDerivation(format!(
            "signatory set contains {} duplicate id(s)",
            signatories.len() - unique.len()
        )));
    }

    if threshold == 0 || threshold as usize > unique.len() {
        return Err(AppError::MultisigDerivation(format!(
            "threshold {} is outside 1..={}",
            threshold,
            unique.len()
        )));
    }

    let sorted: Vec<AccountId> = unique.into_iter().collect();
    let mut preimage = MULTISIG_DERIVATION_PREFIX.to_vec();
    encode_account_ids(&sorted, &mut preimage);
    preimage.extend_from_slice(&threshold.to_le_bytes());

    Ok(AccountId(hash_256(&preimage)))
}
