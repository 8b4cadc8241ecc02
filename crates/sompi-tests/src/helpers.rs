//! Shared fixtures for the end-to-end and adversarial tests.

use std::sync::Mutex;

use async_trait::async_trait;
use sompi_core::address::{Address, Prefix};
use sompi_core::crypto::PrivateKey;
use sompi_core::error::RpcError;
use sompi_core::script::ScriptPublicKey;
use sompi_core::traits::{FeeEstimate, FeerateBucket, NodeRpc};
use sompi_core::tx::{Transaction, TransactionId, TransactionOutpoint, UtxoEntry};
use sompi_wallet::{ExtendedKey, Mnemonic};

/// Recorded 24-word phrase all derivation fixtures come from.
pub const PHRASE: &str = "hunt bitter praise lift buyer topic crane leopard uniform network \
    inquiry over grain pass match crush marine strike doll relax fortune trumpet sunny silk";

/// `m/44'/111111'/0'/0/0` of [`PHRASE`] on mainnet.
pub const RECEIVE_0: &str = "kaspa:qpu92skxut9ltmj2pugjfnac6zs4npmjzqura2e4dfu29clqltu95p3tg2dr3";
/// `m/44'/111111'/0'/0/1`.
pub const RECEIVE_1: &str = "kaspa:qrc2959g0pqda53glnfd238cdnmk24zxzkj8n5x83rkktx4h73dkc5m2z4s4v";
/// `m/44'/111111'/0'/1/0`.
pub const CHANGE_0: &str = "kaspa:qqrvtndmu2h68q6npvk9d3w89eq7vuulkasxp2t26z7098rpsvf4qvvexy53r";
/// `m/44'/111111'/0'/0/0` on testnet.
pub const RECEIVE_0_TESTNET: &str =
    "kaspatest:qpu92skxut9ltmj2pugjfnac6zs4npmjzqura2e4dfu29clqltu95qhdn9nj4";
/// Account-level extended public key.
pub const ACCOUNT_KPUB: &str = "kpub2JuicbmKdz5WtbYgUCaBxH3SXsRANDChV5ssc9fR7zHGe6KtWtA3UFGmjAg1s4N78moLxKy7uBU9HPnHywbkHWNzWUY2na76y6Z2jnmHqsK";
/// Root extended private key.
pub const ROOT_KPRV: &str = "kprv5y2qurMHCsXYr94rQenbxdCCvn8fFkhWEsvD8EfxUYyhbNVN5XFt5UqJ5oLH2Xa9837MFrQnarjFxtuF2n1RgiNJVP2od8PWYjWLcwLzvho";

/// Root key of [`PHRASE`] with an empty passphrase.
pub fn master() -> ExtendedKey {
    let seed = Mnemonic::from_phrase(PHRASE).unwrap().to_seed("");
    ExtendedKey::from_seed(seed.as_bytes()).unwrap()
}

/// Deterministic private key filled with `byte`.
pub fn key(byte: u8) -> PrivateKey {
    PrivateKey::from_bytes(&[byte; 32]).unwrap()
}

/// Schnorr address of `key` under `prefix`.
pub fn address_of(key: &PrivateKey, prefix: Prefix) -> Address {
    key.public_key().to_address(prefix)
}

/// An unspent output paying `address`, with outpoint id filled with `id`.
pub fn utxo_to(address: &Address, id: u8, amount: u64) -> UtxoEntry {
    UtxoEntry {
        outpoint: TransactionOutpoint::new(TransactionId([id; 32]), 0),
        address: Some(address.clone()),
        script_public_key: ScriptPublicKey::pay_to_address(address),
        amount,
        block_daa_score: 1_000 + u64::from(id),
        is_coinbase: false,
    }
}

/// In-memory node: serves a fixed UTXO set and fee rate, records
/// submissions.
pub struct MockNode {
    pub utxos: Vec<UtxoEntry>,
    pub feerate: f64,
    pub reject_submissions: bool,
    submitted: Mutex<Vec<Transaction>>,
}

impl MockNode {
    pub fn new(utxos: Vec<UtxoEntry>, feerate: f64) -> Self {
        Self { utxos, feerate, reject_submissions: false, submitted: Mutex::new(Vec::new()) }
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeRpc for MockNode {
    async fn get_utxos_by_addresses(&self, addresses: &[Address]) -> Result<Vec<UtxoEntry>, RpcError> {
        Ok(self
            .utxos
            .iter()
            .filter(|e| e.address.as_ref().is_some_and(|a| addresses.contains(a)))
            .cloned()
            .collect())
    }

    async fn get_fee_estimate(&self) -> Result<FeeEstimate, RpcError> {
        let bucket = |feerate| FeerateBucket { feerate, estimated_seconds: 1.0 };
        Ok(FeeEstimate {
            priority_bucket: bucket(self.feerate * 2.0),
            normal_buckets: vec![bucket(self.feerate)],
            low_buckets: vec![bucket(self.feerate / 2.0)],
        })
    }

    async fn submit_transaction(&self, tx: Transaction, _allow_orphan: bool) -> Result<TransactionId, RpcError> {
        if self.reject_submissions {
            return Err(RpcError::Rejected("orphan transaction".into()));
        }
        let id = tx.id();
        self.submitted.lock().unwrap().push(tx);
        Ok(id)
    }
}
