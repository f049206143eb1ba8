//! Deposit formulas

use delegation_engine::fees::{multisig_deposit, proxy_deposit, pure_proxy_deposit};

use crate::common::fixtures::{MULTISIG_CONSTANTS, PROXY_CONSTANTS};

#[test]
fn test_multisig_deposit_grows_with_threshold() {
    let mut previous = multisig_deposit(1, &MULTISIG_CONSTANTS);
    assert_eq!(
        previous,
        MULTISIG_CONSTANTS.deposit_base + MULTISIG_CONSTANTS.deposit_factor
    );
    for threshold in 2..=20u16 {
        let deposit = multisig_deposit(threshold, &MULTISIG_CONSTANTS);
        assert_eq!(deposit - previous, MULTISIG_CONSTANTS.deposit_factor);
        previous = deposit;
    }
}

#[test]
fn test_proxy_deposit_grows_with_count() {
    let mut previous = proxy_deposit(0, &PROXY_CONSTANTS);
    assert_eq!(previous, PROXY_CONSTANTS.deposit_base);
    for count in 1..=32u32 {
        let deposit = proxy_deposit(count, &PROXY_CONSTANTS);
        assert!(deposit > previous);
        previous = deposit;
    }
    assert_eq!(pure_proxy_deposit(&PROXY_CONSTANTS), proxy_deposit(1, &PROXY_CONSTANTS));
}
