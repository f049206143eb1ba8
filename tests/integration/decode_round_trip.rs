//! Composed delegation stacks survive encoding and decoding

use delegation_engine::chain::CallRegistry;
use delegation_engine::codec::call_hash;
use delegation_engine::composer::{compose, encode_payload, encode_transaction, get_tx_wrappers};
use delegation_engine::decoder;
use delegation_engine::types::{
    Account, CallArgs, ProxiedDetails, ProxyType, ProxyVariant, Transaction, TransactionType,
    TxPayload,
};

use crate::common::fixtures::{base_account, id, multisig_account, CHAIN};

fn decoded_args(payload: &TxPayload) -> &CallArgs {
    match payload {
        TxPayload::Decoded(decoded) => decoded.args.as_ref().unwrap(),
        TxPayload::Authored(_) => panic!("expected a decoded payload"),
    }
}

#[test]
fn test_multisig_over_proxy_round_trip() {
    let registry = CallRegistry::default();
    let (a, b, c) = (id(1), id(2), id(3));

    let signer = base_account(1, "alice", a);
    let multisig = multisig_account(1, &[a, b, c], 2, "");
    let proxied = Account::proxied(
        2,
        "treasury",
        id(40),
        CHAIN.to_string(),
        ProxiedDetails {
            proxy_account_id: multisig.account_id,
            proxy_type: ProxyType::Any,
            proxy_variant: ProxyVariant::Regular,
            delay: 0,
            block_number: None,
            extrinsic_index: None,
        },
    );
    let wallet = vec![signer, multisig.clone(), proxied.clone()];

    let core = Transaction::new(
        CHAIN,
        proxied.account_id,
        CallArgs::Transfer {
            dest: id(99),
            value: 42_000_000_000,
        },
    );
    let wrappers = get_tx_wrappers(&proxied, &wallet, CHAIN, None).unwrap();
    let labels: Vec<_> = wrappers.iter().map(|w| w.label()).collect();
    assert_eq!(labels, vec!["MULTISIG", "PROXY"]);

    let wrapped = compose(core, &wrappers).unwrap();
    let bytes = encode_transaction(&registry, &wrapped.wrapped_tx).unwrap();
    let decoded = decoder::decode(CHAIN, &registry, a, &bytes).unwrap();

    assert_eq!(decoded.tx_type, Some(TransactionType::MultisigAsMulti));
    assert_eq!(decoded.address, a);
    assert_eq!(decoded.call_data, bytes);

    let (threshold, others, inner) = match decoded.args.as_ref().unwrap() {
        CallArgs::AsMulti {
            threshold,
            other_signatories,
            call,
            ..
        } => (*threshold, other_signatories.clone(), call.as_ref()),
        other => panic!("unexpected args {:?}", other),
    };
    assert_eq!(threshold, 2);
    assert_eq!(others, vec![b, c]);
    assert_eq!(inner.sender(), multisig.account_id);

    // The multisig tracks the proxy call by the hash of its exact bytes
    let inner_bytes = match inner {
        TxPayload::Decoded(d) => d.call_data.clone(),
        TxPayload::Authored(_) => unreachable!(),
    };
    let expected = wrapped.multisig_call_hash(&registry).unwrap().unwrap();
    assert_eq!(call_hash(&inner_bytes), expected);
    assert_eq!(
        inner_bytes,
        encode_payload(&registry, wrapped.unwrap_multisig_call().unwrap()).unwrap()
    );

    match decoded_args(inner) {
        CallArgs::Proxy {
            real,
            force_proxy_type,
            call,
        } => {
            assert_eq!(*real, proxied.account_id);
            assert_eq!(*force_proxy_type, Some(ProxyType::Any));
            assert_eq!(call.sender(), proxied.account_id);
            assert_eq!(
                decoded_args(call),
                &CallArgs::Transfer {
                    dest: id(99),
                    value: 42_000_000_000,
                }
            );
        }
        other => panic!("unexpected args {:?}", other),
    }
}

#[test]
fn test_plain_multisig_round_trip() {
    let registry = CallRegistry::default();
    let (a, b) = (id(1), id(2));
    let signer = base_account(1, "alice", a);
    let multisig = multisig_account(1, &[a, b], 2, "");

    let core = Transaction::new(CHAIN, multisig.account_id, CallArgs::Chill);
    let wrappers =
        get_tx_wrappers(&multisig, &[signer, multisig.clone()], CHAIN, Some(a)).unwrap();
    let wrapped = compose(core, &wrappers).unwrap();
    assert_eq!(wrapped.multisig_threshold(), Some(2));

    let bytes = encode_transaction(&registry, &wrapped.wrapped_tx).unwrap();
    let decoded = decoder::decode(CHAIN, &registry, a, &bytes).unwrap();

    // Re-encoding the decoded arguments reproduces the original bytes
    let rebuilt = Transaction::new(CHAIN, a, decoded.args.clone().unwrap());
    assert_eq!(encode_transaction(&registry, &rebuilt).unwrap(), bytes);

    match decoded.args.unwrap() {
        CallArgs::AsMulti { call, .. } => {
            assert_eq!(call.tx_type(), Some(TransactionType::Chill));
            assert_eq!(call.sender(), multisig.account_id);
        }
        other => panic!("unexpected args {:?}", other),
    }
}
