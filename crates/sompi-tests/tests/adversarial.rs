//! Adversarial property-based tests for the wallet engine.
//!
//! Each property runs 256 cases with proptest shrinking.
//!
//! Covered:
//! - Parsers never panic on arbitrary input (paths, addresses, extended keys)
//! - Derivation path format/parse round trip
//! - Extended key string round trip for private and public keys
//! - Coin selection coverage, minimality and fee accounting
//! - Built and signed transactions always verify

use proptest::prelude::*;
use sompi_core::address::{Address, Prefix};
use sompi_core::crypto::SigHashType;
use sompi_core::script::ScriptPublicKey;
use sompi_core::tx::{TransactionId, TransactionOutpoint, UtxoEntry};
use sompi_tests::helpers::{address_of, key};
use sompi_wallet::{
    CoinSelector, DerivationPath, ExtendedKey, FeePolicy, HARDENED_OFFSET, PaymentOutput, TransactionBuilder,
    TransactionSigner, WalletError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry(i: usize, script: &ScriptPublicKey, amount: u64) -> UtxoEntry {
    let mut id = [0u8; 32];
    id[..8].copy_from_slice(&(i as u64).to_le_bytes());
    UtxoEntry {
        outpoint: TransactionOutpoint::new(TransactionId(id), 0),
        address: None,
        script_public_key: script.clone(),
        amount,
        block_daa_score: 0,
        is_coinbase: false,
    }
}

fn destination() -> Address {
    Address::from_xonly(Prefix::Mainnet, [0xAA; 32])
}

fn step_strategy() -> impl Strategy<Value = (u32, bool)> {
    (0u32..HARDENED_OFFSET, any::<bool>())
}

// ---------------------------------------------------------------------------
// Parser robustness
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parsers_never_panic(s in "\\PC{0,120}") {
        let _ = DerivationPath::parse(&s);
        let _ = Address::decode(&s);
        let _ = ExtendedKey::from_string(&s);
    }

    #[test]
    fn path_like_strings_never_panic(s in "m(/[0-9]{1,11}['hH]?){0,8}") {
        let _ = DerivationPath::parse(&s);
    }
}

// ---------------------------------------------------------------------------
// Path and key round trips
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn path_round_trip(steps in prop::collection::vec(step_strategy(), 0..8)) {
        let mut path = DerivationPath::master();
        for (index, hardened) in &steps {
            path.push(*index, *hardened).unwrap();
        }
        let text = path.to_string();
        let parsed = DerivationPath::parse(&text).unwrap();
        prop_assert_eq!(&parsed, &path);
        prop_assert_eq!(parsed.len(), steps.len());
    }

    #[test]
    fn extended_key_round_trip(
        seed in prop::array::uniform32(any::<u8>()),
        steps in prop::collection::vec(step_strategy(), 0..4),
    ) {
        let mut k = ExtendedKey::from_seed(seed).unwrap();
        for (index, hardened) in &steps {
            k = k.derive_child(*index, *hardened).unwrap();
        }

        let private = k.into_string(k.default_prefix()).unwrap();
        let back = ExtendedKey::from_string(&private).unwrap();
        prop_assert_eq!(back.public_key(), k.public_key());
        prop_assert_eq!(back.chain_code(), k.chain_code());
        prop_assert_eq!(back.depth(), k.depth());
        prop_assert_eq!(back.child_number(), k.child_number());
        prop_assert_eq!(back.parent_fingerprint(), k.parent_fingerprint());

        let public = k.to_public();
        let back = ExtendedKey::from_string(&public.into_string(public.default_prefix()).unwrap()).unwrap();
        prop_assert!(!back.is_private());
        prop_assert_eq!(back.public_key(), k.public_key());
    }

    #[test]
    fn public_derivation_matches_private(
        seed in prop::array::uniform32(any::<u8>()),
        index in 0u32..HARDENED_OFFSET,
    ) {
        let k = ExtendedKey::from_seed(seed).unwrap();
        let via_private = k.derive_child(index, false).unwrap().public_key();
        let via_public = k.to_public().derive_child(index, false).unwrap().public_key();
        prop_assert_eq!(via_private, via_public);
        prop_assert!(k.to_public().derive_child(index, true).is_err());
    }
}

// ---------------------------------------------------------------------------
// Coin selection
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn selection_covers_or_reports_shortfall(
        amounts in prop::collection::vec(0u64..1_000_000, 0..24),
        target in 1u64..5_000_000,
        base in 0u64..5_000,
        per_input in 0u64..5_000,
    ) {
        let script = ScriptPublicKey::pay_to_pub_key(&[1; 32]);
        let utxos: Vec<UtxoEntry> = amounts.iter().enumerate().map(|(i, a)| entry(i, &script, *a)).collect();
        let outputs = vec![PaymentOutput::new(destination(), target)];
        let fee = FeePolicy::Linear { base, per_input };

        match CoinSelector::select(&utxos, &outputs, &fee) {
            Ok(sel) => {
                let n = sel.selected.len();
                prop_assert!(n > 0);
                prop_assert_eq!(sel.fee, fee.fee_for(n));
                prop_assert_eq!(sel.total_selected, sel.required + sel.fee + sel.change);
                prop_assert_eq!(sel.required, target);
                prop_assert!(sel.selected.iter().all(|e| e.amount > 0));
                prop_assert!(sel.selected.windows(2).all(|w| w[0].amount >= w[1].amount));

                let without_last: u64 = sel.selected[..n - 1].iter().map(|e| e.amount).sum();
                prop_assert!(without_last < target + fee.fee_for(n - 1) || n == 1);
            }
            Err(WalletError::InsufficientFunds { have, need }) => {
                let total: u64 = amounts.iter().sum();
                prop_assert_eq!(have, total);
                prop_assert!(have < need);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn selection_ignores_input_order(
        mut amounts in prop::collection::vec(1u64..1_000_000, 1..16),
        target in 1u64..2_000_000,
    ) {
        let script = ScriptPublicKey::pay_to_pub_key(&[1; 32]);
        let outputs = vec![PaymentOutput::new(destination(), target)];
        let fee = FeePolicy::Fixed(100);

        let forward: Vec<UtxoEntry> = amounts.iter().enumerate().map(|(i, a)| entry(i, &script, *a)).collect();
        amounts.reverse();
        let len = amounts.len();
        let backward: Vec<UtxoEntry> =
            amounts.iter().enumerate().map(|(i, a)| entry(len - 1 - i, &script, *a)).collect();

        let a = CoinSelector::select(&forward, &outputs, &fee).map(|s| (s.total_selected, s.selected.len()));
        let b = CoinSelector::select(&backward, &outputs, &fee).map(|s| (s.total_selected, s.selected.len()));
        prop_assert_eq!(a.ok(), b.ok());
    }
}

// ---------------------------------------------------------------------------
// Build and sign
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn signed_transactions_verify(
        amounts in prop::collection::vec(10_000u64..1_000_000, 1..5),
        key_bytes in prop::collection::vec(1u8..=200, 1..5),
        hash_type in prop::sample::select(vec![
            SigHashType::ALL,
            SigHashType::NONE,
            SigHashType::ALL_ANYONE_CAN_PAY,
        ]),
    ) {
        let keys: Vec<_> = key_bytes.iter().map(|b| key(*b)).collect();
        let inputs: Vec<UtxoEntry> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let owner = &keys[i % keys.len()];
                let script = ScriptPublicKey::pay_to_address(&address_of(owner, Prefix::Mainnet));
                entry(i, &script, *a)
            })
            .collect();
        let total: u64 = amounts.iter().sum();

        let mut builder = TransactionBuilder::new();
        builder.add_output(destination(), total / 2);
        let mut unsigned = builder.build(&inputs, 1_000).unwrap();
        TransactionSigner::sign(&mut unsigned, &keys, hash_type).unwrap();
        let signed = unsigned.finalize().unwrap();
        prop_assert!(signed.verify().is_ok());
        prop_assert_eq!(signed.tx().inputs.len(), inputs.len());
    }
}
