//! End-to-end scenarios across sompi-core, sompi-wallet and sompi-store.
//!
//! Each test starts from the recorded phrase or a fixed UTXO set and walks
//! the full path a wallet takes: derive, select, build, sign, and finally
//! hand the result to a node or an export writer.

use sompi_core::address::{Address, Prefix};
use sompi_core::crypto::{SigHashType, verify_input};
use sompi_core::network::NetworkType;
use sompi_core::script::ScriptPublicKey;
use sompi_store::{ExportOptions, IndexedUtxo, MemoryStore, StoreReader, export_utxos};
use sompi_tests::helpers::*;
use sompi_wallet::{
    Account, ChangePolicy, CoinSelector, DerivationPath, ExtendedKey, ExtendedKeyPrefix, FeePolicy,
    Mnemonic, PaymentOutput, TransactionBuilder, TransactionSigner, Wallet, WalletError,
};

// ---------------------------------------------------------------------------
// Scenario A: phrase to address
// ---------------------------------------------------------------------------

#[test]
fn phrase_derives_recorded_address() {
    let key = master().derive_path("m/44'/111111'/0'/0/1").unwrap();
    let address = key.public_key().to_address(Prefix::Mainnet);
    assert_eq!(address.to_string(), RECEIVE_1);
}

#[test]
fn path_object_and_string_agree() {
    let path = DerivationPath::bip44(0, 0, 1).unwrap();
    let by_object = master().derive_path(&path).unwrap();
    let by_string = master().derive_path("m/44'/111111'/0'/0/1").unwrap();
    assert_eq!(by_object.public_key(), by_string.public_key());
}

#[test]
fn derive_path_is_fold_of_children() {
    let path = DerivationPath::parse("m/44'/111111'/0'/1/0").unwrap();
    let folded = path
        .steps()
        .iter()
        .try_fold(master(), |k, c| k.derive_child(c.index(), c.is_hardened()))
        .unwrap();
    assert_eq!(folded.public_key(), master().derive_path(&path).unwrap().public_key());
    assert_eq!(folded.public_key().to_address(Prefix::Mainnet).to_string(), CHANGE_0);
}

#[test]
fn account_matches_direct_derivation() {
    let mut account = Account::new(&master(), 0, Prefix::Mainnet).unwrap();
    assert_eq!(account.receive_address_at(0).unwrap().to_string(), RECEIVE_0);
    assert_eq!(account.receive_address_at(1).unwrap().to_string(), RECEIVE_1);
    assert_eq!(account.change_address_at(0).unwrap().to_string(), CHANGE_0);
    assert_eq!(
        account.extended_public_key().into_string(ExtendedKeyPrefix::Kpub).unwrap(),
        ACCOUNT_KPUB
    );
}

#[test]
fn root_key_string_is_recorded() {
    assert_eq!(master().into_string(ExtendedKeyPrefix::Kprv).unwrap(), ROOT_KPRV);
}

#[test]
fn testnet_prefix_changes_only_the_tag() {
    let mut account = Account::new(&master(), 0, Prefix::Testnet).unwrap();
    assert_eq!(account.receive_address_at(0).unwrap().to_string(), RECEIVE_0_TESTNET);
}

#[test]
fn seed_is_deterministic() {
    let m = Mnemonic::from_phrase(PHRASE).unwrap();
    assert_eq!(m.to_seed("").as_bytes(), m.to_seed("").as_bytes());
    assert_ne!(m.to_seed("").as_bytes(), m.to_seed("TREZOR").as_bytes());
}

// ---------------------------------------------------------------------------
// Scenario B: greedy selection
// ---------------------------------------------------------------------------

#[test]
fn greedy_selection_picks_five_and_three() {
    let owner = key(1);
    let addr = address_of(&owner, Prefix::Mainnet);
    let utxos = vec![utxo_to(&addr, 1, 5), utxo_to(&addr, 2, 3), utxo_to(&addr, 3, 2)];
    let outputs = vec![PaymentOutput::new(Address::from_xonly(Prefix::Mainnet, [9; 32]), 6)];

    let selection = CoinSelector::select(&utxos, &outputs, &FeePolicy::Fixed(0)).unwrap();
    let amounts: Vec<u64> = selection.selected.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![5, 3]);
    assert_eq!(selection.change, 2);
    assert_eq!(selection.fee, 0);

    let mut builder = TransactionBuilder::new();
    builder
        .set_outputs(outputs)
        .set_dust_threshold(0)
        .set_change_policy(ChangePolicy::To(addr.clone()));
    let unsigned = builder.build_from_selection(&selection).unwrap();
    let values: Vec<u64> = unsigned.tx().outputs.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![6, 2]);
    assert_eq!(unsigned.tx().outputs[1].script_public_key, ScriptPublicKey::pay_to_address(&addr));
    assert_eq!(unsigned.fee(), 0);
}

#[test]
fn dust_change_is_folded_into_fee() {
    let addr = address_of(&key(1), Prefix::Mainnet);
    let utxos = vec![utxo_to(&addr, 1, 5), utxo_to(&addr, 2, 3), utxo_to(&addr, 3, 2)];
    let outputs = vec![PaymentOutput::new(Address::from_xonly(Prefix::Mainnet, [9; 32]), 6)];
    let selection = CoinSelector::select(&utxos, &outputs, &FeePolicy::Fixed(0)).unwrap();

    let mut builder = TransactionBuilder::new();
    builder.set_outputs(outputs);
    let unsigned = builder.build_from_selection(&selection).unwrap();
    assert_eq!(unsigned.tx().outputs.len(), 1);
    assert_eq!(unsigned.fee(), 2);
    assert_eq!(unsigned.change(), 0);
}

// ---------------------------------------------------------------------------
// Scenario C: signing preconditions
// ---------------------------------------------------------------------------

#[test]
fn signing_requires_owner_and_reset() {
    let owner = key(1);
    let addr = address_of(&owner, Prefix::Mainnet);
    let mut builder = TransactionBuilder::new();
    builder.add_output(Address::from_xonly(Prefix::Mainnet, [9; 32]), 4_000);
    let mut unsigned = builder.build(&[utxo_to(&addr, 1, 10_000)], 1_000).unwrap();

    let err = TransactionSigner::sign(&mut unsigned, &[key(2)], SigHashType::ALL).unwrap_err();
    assert!(matches!(err, WalletError::MissingPrivateKeyForInput { index: 0, .. }));
    assert_eq!(unsigned.unsigned_inputs(), vec![0]);

    TransactionSigner::sign(&mut unsigned, &[owner.clone()], SigHashType::ALL).unwrap();
    let err = TransactionSigner::sign(&mut unsigned, &[owner.clone()], SigHashType::ALL).unwrap_err();
    assert!(matches!(err, WalletError::AlreadySigned { index: 0 }));

    TransactionSigner::reset_input(&mut unsigned, 0).unwrap();
    TransactionSigner::sign(&mut unsigned, &[owner], SigHashType::ALL).unwrap();
    let signed = unsigned.finalize().unwrap();
    signed.verify().unwrap();
}

#[test]
fn inputs_sign_independently_with_their_own_keys() {
    let (a, b) = (key(1), key(2));
    let inputs = vec![
        utxo_to(&address_of(&a, Prefix::Mainnet), 1, 10_000),
        utxo_to(&address_of(&b, Prefix::Mainnet), 2, 10_000),
    ];
    let mut builder = TransactionBuilder::new();
    builder.add_output(Address::from_xonly(Prefix::Mainnet, [9; 32]), 15_000);
    let mut unsigned = builder.build(&inputs, 1_000).unwrap();

    TransactionSigner::sign_input(&mut unsigned, 1, &b, SigHashType::ALL).unwrap();
    assert_eq!(unsigned.unsigned_inputs(), vec![0]);
    TransactionSigner::sign_input(&mut unsigned, 0, &a, SigHashType::ALL).unwrap();

    let signed = unsigned.finalize().unwrap();
    for i in 0..2 {
        verify_input(signed.tx(), signed.entries(), i).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Scenario D: testnet extended key round trip
// ---------------------------------------------------------------------------

#[test]
fn testnet_private_key_round_trip() {
    let account_key = master()
        .derive_path("m/44'/111111'/0'")
        .unwrap()
        .for_network(NetworkType::Testnet);
    let encoded = account_key.into_string(ExtendedKeyPrefix::Ktrv).unwrap();
    assert!(encoded.starts_with("ktrv"));

    let parsed = ExtendedKey::from_string(&encoded).unwrap();
    assert_eq!(parsed.network(), NetworkType::Testnet);
    assert_eq!(parsed.depth(), account_key.depth());
    assert_eq!(parsed.child_number(), account_key.child_number());
    assert!(parsed.is_private());
    assert_eq!(parsed.public_key(), account_key.public_key());
}

#[test]
fn mainnet_prefix_rejected_for_testnet_key() {
    let key = master().for_network(NetworkType::Testnet);
    assert!(key.into_string(ExtendedKeyPrefix::Kprv).is_err());
}

// ---------------------------------------------------------------------------
// Full wallet flow over a mock node
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wallet_sends_and_forgets_spent_outputs() {
    let mut account = Account::new(&master(), 0, Prefix::Mainnet).unwrap();
    account.restore(2, 0).unwrap();
    let r0 = account.receive_address_at(0).unwrap();
    let r1 = account.receive_address_at(1).unwrap();
    let stranger = Address::from_xonly(Prefix::Mainnet, [0x42; 32]);

    let node = MockNode::new(
        vec![utxo_to(&r0, 1, 100_000), utxo_to(&r1, 2, 50_000), utxo_to(&stranger, 3, 1_000_000)],
        1.0,
    );
    let mut wallet = Wallet::new(account, node);

    let id = wallet.send(&[PaymentOutput::new(stranger.clone(), 120_000)]).await.unwrap();

    let submitted = wallet.rpc().submitted();
    assert_eq!(submitted.len(), 1);
    let tx = &submitted[0];
    assert_eq!(tx.id(), id);
    assert_eq!(tx.inputs.len(), 2);
    assert!(tx.is_fully_signed());
    assert_eq!(tx.outputs[0].value, 120_000);

    let change_script = ScriptPublicKey::pay_to_address(&CHANGE_0.parse::<Address>().unwrap());
    assert_eq!(tx.outputs[1].script_public_key, change_script);
    let fee = 150_000 - tx.total_output_value().unwrap();
    assert_eq!(fee, 918 + 2 * 1_118);

    assert!(wallet.utxos().is_empty());
    assert_eq!(wallet.account().next_change_index(), 1);
}

#[tokio::test]
async fn rejected_submission_keeps_utxos() {
    let mut account = Account::new(&master(), 0, Prefix::Mainnet).unwrap();
    account.restore(1, 0).unwrap();
    let r0 = account.receive_address_at(0).unwrap();

    let mut node = MockNode::new(vec![utxo_to(&r0, 1, 100_000)], 1.0);
    node.reject_submissions = true;
    let mut wallet = Wallet::new(account, node);

    let dest = Address::from_xonly(Prefix::Mainnet, [7; 32]);
    let err = wallet.send(&[PaymentOutput::new(dest, 10_000)]).await.unwrap_err();
    assert!(matches!(err, WalletError::Rpc(_)));
    assert_eq!(wallet.utxos().len(), 1);
    assert_eq!(wallet.account().next_change_index(), 0);
}

// ---------------------------------------------------------------------------
// Store export of wallet-owned outputs
// ---------------------------------------------------------------------------

#[test]
fn exported_rows_resolve_to_wallet_addresses() {
    let mut store = MemoryStore::new();
    for (id, addr) in [(1u8, RECEIVE_0), (2, RECEIVE_1)] {
        let address: Address = addr.parse().unwrap();
        let entry = utxo_to(&address, id, 1_000 * u64::from(id));
        store.push_utxo(IndexedUtxo {
            script_public_key: entry.script_public_key,
            outpoint: entry.outpoint,
            amount: entry.amount,
            block_daa_score: entry.block_daa_score,
            is_coinbase: false,
        });
    }

    let mut buf = Vec::new();
    let summary = export_utxos(&mut buf, store.utxo_index().unwrap(), ExportOptions::default()).unwrap();
    assert_eq!(summary.records, 2);

    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], format!("{RECEIVE_0},1001,1000,f"));
    assert_eq!(lines[2], format!("{RECEIVE_1},1002,2000,f"));
}

#[test]
fn utxo_snapshot_json_round_trips_through_selection() {
    let addr: Address = RECEIVE_0.parse().unwrap();
    let json = serde_json::to_string(&vec![utxo_to(&addr, 1, 9_000)]).unwrap();
    let utxos: Vec<sompi_core::tx::UtxoEntry> = serde_json::from_str(&json).unwrap();
    let outputs = vec![PaymentOutput::new(addr, 1_000)];
    let selection = CoinSelector::select(&utxos, &outputs, &FeePolicy::Fixed(100)).unwrap();
    assert_eq!(selection.change, 7_900);
}
