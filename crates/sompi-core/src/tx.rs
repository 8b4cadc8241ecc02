//! Transaction and UTXO value types.
//!
//! All monetary values are in sompi (1 KAS = 10^8 sompi).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::constants::{SUBNETWORK_ID_SIZE, TX_VERSION};
use crate::hashing::DomainHasher;
use crate::script::ScriptPublicKey;

/// A 32-byte transaction id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TransactionId(pub [u8; 32]);

impl TransactionId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TransactionId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for TransactionId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TransactionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 20-byte subnetwork id. All zeroes is the native subnetwork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SubnetworkId(pub [u8; SUBNETWORK_ID_SIZE]);

impl SubnetworkId {
    pub const NATIVE: Self = Self([0u8; SUBNETWORK_ID_SIZE]);

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl AsRef<[u8]> for SubnetworkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

impl fmt::Display for TransactionOutpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.index)
    }
}

/// A transaction input spending a previous output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    /// Empty until the input is signed.
    #[serde(with = "crate::serde_hex")]
    pub signature_script: Vec<u8>,
    pub sequence: u64,
    pub sig_op_count: u8,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, sequence: u64, sig_op_count: u8) -> Self {
        Self {
            previous_outpoint,
            signature_script: Vec::new(),
            sequence,
            sig_op_count,
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature_script.is_empty()
    }
}

/// A transaction output creating a new UTXO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Value in sompi.
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

/// A transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    #[serde(with = "crate::serde_hex")]
    pub payload: Vec<u8>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            subnetwork_id: SubnetworkId::NATIVE,
            gas: 0,
            payload: Vec::new(),
        }
    }
}

impl Transaction {
    /// Transaction id over all fields except signature scripts, so the id is
    /// the same before and after signing.
    pub fn id(&self) -> TransactionId {
        let mut hasher = DomainHasher::transaction_id();
        hasher.write_u16(self.version).write_len(self.inputs.len());
        for input in &self.inputs {
            hasher
                .update(input.previous_outpoint.transaction_id)
                .write_u32(input.previous_outpoint.index)
                .write_var_bytes(&[])
                .write_u64(input.sequence);
        }
        hasher.write_len(self.outputs.len());
        for output in &self.outputs {
            hasher
                .write_u64(output.value)
                .write_u16(output.script_public_key.version)
                .write_var_bytes(&output.script_public_key.script);
        }
        hasher
            .write_u64(self.lock_time)
            .update(self.subnetwork_id)
            .write_u64(self.gas)
            .write_var_bytes(&self.payload);
        TransactionId(hasher.finalize())
    }

    /// Sum of output values, `None` on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value))
    }

    pub fn is_fully_signed(&self) -> bool {
        self.inputs.iter().all(TransactionInput::is_signed)
    }
}

/// An unspent output as reported by the node. Read-only to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub outpoint: TransactionOutpoint,
    pub address: Option<Address>,
    pub script_public_key: ScriptPublicKey,
    /// Value in sompi.
    pub amount: u64,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spk(byte: u8) -> ScriptPublicKey {
        ScriptPublicKey::pay_to_pub_key(&[byte; 32])
    }

    fn fixture_tx() -> Transaction {
        Transaction {
            inputs: vec![
                TransactionInput::new(TransactionOutpoint::new(TransactionId([0x11; 32]), 0), 0, 1),
                TransactionInput::new(TransactionOutpoint::new(TransactionId([0x22; 32]), 1), 0, 1),
            ],
            outputs: vec![
                TransactionOutput::new(6000, spk(0xBB)),
                TransactionOutput::new(1900, spk(0xAA)),
            ],
            ..Default::default()
        }
    }

    // --- TransactionId ---

    #[test]
    fn txid_hex_roundtrip() {
        let id = TransactionId([0xab; 32]);
        let s = id.to_string();
        assert_eq!(s.len(), 64);
        assert_eq!(s.parse::<TransactionId>().unwrap(), id);
    }

    #[test]
    fn txid_rejects_short_hex() {
        assert!("abcd".parse::<TransactionId>().is_err());
    }

    #[test]
    fn txid_fixture() {
        assert_eq!(
            fixture_tx().id().to_string(),
            "db3488235ec558e6cf06a949977325e3c95f1382d68a8b53fb795ddf2d269053"
        );
    }

    #[test]
    fn txid_stable_across_signing() {
        let tx = fixture_tx();
        let mut signed = tx.clone();
        signed.inputs[0].signature_script = vec![0x41; 66];
        assert_eq!(tx.id(), signed.id());
    }

    #[test]
    fn txid_changes_with_outputs() {
        let tx = fixture_tx();
        let mut other = tx.clone();
        other.outputs[0].value += 1;
        assert_ne!(tx.id(), other.id());
    }

    // --- Signing state ---

    #[test]
    fn unsigned_tx_not_fully_signed() {
        let mut tx = fixture_tx();
        assert!(!tx.is_fully_signed());
        tx.inputs[0].signature_script = vec![1];
        assert!(!tx.is_fully_signed());
        tx.inputs[1].signature_script = vec![1];
        assert!(tx.is_fully_signed());
    }

    #[test]
    fn total_output_value_sums() {
        assert_eq!(fixture_tx().total_output_value(), Some(7900));
    }

    #[test]
    fn total_output_value_overflow() {
        let mut tx = fixture_tx();
        tx.outputs[0].value = u64::MAX;
        assert_eq!(tx.total_output_value(), None);
    }

    // --- Serde ---

    #[test]
    fn outpoint_serde() {
        let op = TransactionOutpoint::new(TransactionId([1; 32]), 3);
        let json = serde_json::to_value(op).unwrap();
        assert_eq!(json["index"], 3);
        assert_eq!(json["transaction_id"], hex::encode([1u8; 32]));
    }

    #[test]
    fn transaction_json_roundtrip() {
        let tx = fixture_tx();
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
