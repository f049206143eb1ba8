//! Multisig account derivation

use delegation_engine::codec::derive_multisig_account_id;
use delegation_engine::types::AccountId;

use crate::common::fixtures::id;

/// Every ordering of `items`
fn permutations(items: &[AccountId]) -> Vec<Vec<AccountId>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_signatory_order_does_not_matter() {
    let signatories = [id(7), id(1), id(42), id(3)];
    let expected = derive_multisig_account_id(&signatories, 3).unwrap();

    let orderings = permutations(&signatories);
    assert_eq!(orderings.len(), 24);
    for ordering in orderings {
        assert_eq!(derive_multisig_account_id(&ordering, 3).unwrap(), expected);
    }
}

#[test]
fn test_threshold_and_membership_change_the_account() {
    let signatories = [id(1), id(2), id(3)];
    let two = derive_multisig_account_id(&signatories, 2).unwrap();
    let three = derive_multisig_account_id(&signatories, 3).unwrap();
    assert_ne!(two, three);

    let swapped = derive_multisig_account_id(&[id(1), id(2), id(4)], 2).unwrap();
    assert_ne!(two, swapped);

    // Not one of the signatories
    assert!(!signatories.contains(&two));
}

#[test]
fn test_invalid_sets_are_rejected() {
    assert!(derive_multisig_account_id(&[], 1).is_err());
    assert!(derive_multisig_account_id(&[id(1), id(1)], 1).is_err());
    assert!(derive_multisig_account_id(&[id(1), id(2)], 0).is_err());
    assert!(derive_multisig_account_id(&[id(1), id(2)], 3).is_err());
    assert!(derive_multisig_account_id(&[id(1)], 1).is_ok());
}
