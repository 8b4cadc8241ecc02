//! secp256k1 keys, signature hashes and Schnorr input signing.
//!
//! # Signature hash
//!
//! An input's signature commits to the transaction version, the input's own
//! outpoint, **the script public key and amount of the UTXO it spends**,
//! its sequence and sig-op count, lock time, subnetwork, gas and payload,
//! plus sub-hashes over the other inputs and the outputs selected by the
//! [`SigHashType`]. Signature scripts are never committed to, so inputs can
//! be signed independently and in any order.

use secp256k1::{Keypair, Message, SECP256K1, SecretKey, XOnlyPublicKey, schnorr};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::address::{Address, Prefix};
use crate::error::CryptoError;
use crate::hashing::DomainHasher;
use crate::script::{parse_schnorr_signature_script, schnorr_signature_script};
use crate::tx::{Transaction, TransactionOutput, UtxoEntry};

// --- Sighash types ---

/// Which parts of the transaction a signature commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SigHashType(u8);

impl SigHashType {
    pub const ALL: Self = Self(0x01);
    pub const NONE: Self = Self(0x02);
    pub const SINGLE: Self = Self(0x04);
    pub const ALL_ANYONE_CAN_PAY: Self = Self(0x81);
    pub const NONE_ANYONE_CAN_PAY: Self = Self(0x82);
    pub const SINGLE_ANYONE_CAN_PAY: Self = Self(0x84);

    const ANYONE_CAN_PAY_FLAG: u8 = 0x80;
    const MASK: u8 = 0x07;

    /// Accepts only the six standard combinations.
    pub fn from_u8(value: u8) -> Result<Self, CryptoError> {
        match value {
            0x01 | 0x02 | 0x04 | 0x81 | 0x82 | 0x84 => Ok(Self(value)),
            other => Err(CryptoError::InvalidSighashType(other)),
        }
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 & Self::MASK == Self::NONE.0
    }

    pub fn is_single(self) -> bool {
        self.0 & Self::MASK == Self::SINGLE.0
    }

    pub fn is_anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONE_CAN_PAY_FLAG != 0
    }
}

impl Default for SigHashType {
    fn default() -> Self {
        Self::ALL
    }
}

/// Compute the Schnorr signature hash for `tx.inputs[input_index]`.
///
/// `entries` are the UTXOs spent by each input, in input order.
pub fn calc_schnorr_signature_hash(
    tx: &Transaction,
    entries: &[UtxoEntry],
    input_index: usize,
    hash_type: SigHashType,
) -> Result<[u8; 32], CryptoError> {
    if entries.len() != tx.inputs.len() {
        return Err(CryptoError::EntryCountMismatch {
            inputs: tx.inputs.len(),
            entries: entries.len(),
        });
    }
    let input = tx.inputs.get(input_index).ok_or(CryptoError::InputIndexOutOfBounds {
        index: input_index,
        len: tx.inputs.len(),
    })?;
    let entry = &entries[input_index];

    let mut hasher = DomainHasher::transaction_signing();
    hasher
        .write_u16(tx.version)
        .update(previous_outputs_hash(tx, hash_type))
        .update(sequences_hash(tx, hash_type))
        .update(sig_op_counts_hash(tx, hash_type))
        .update(input.previous_outpoint.transaction_id)
        .write_u32(input.previous_outpoint.index)
        .write_u16(entry.script_public_key.version)
        .write_var_bytes(&entry.script_public_key.script)
        .write_u64(entry.amount)
        .write_u64(input.sequence)
        .write_u8(input.sig_op_count)
        .update(outputs_hash(tx, hash_type, input_index))
        .write_u64(tx.lock_time)
        .update(tx.subnetwork_id)
        .write_u64(tx.gas)
        .update(payload_hash(tx))
        .write_u8(hash_type.to_u8());
    Ok(hasher.finalize())
}

fn previous_outputs_hash(tx: &Transaction, hash_type: SigHashType) -> [u8; 32] {
    if hash_type.is_anyone_can_pay() {
        return [0u8; 32];
    }
    let mut hasher = DomainHasher::transaction_signing();
    for input in &tx.inputs {
        hasher
            .update(input.previous_outpoint.transaction_id)
            .write_u32(input.previous_outpoint.index);
    }
    hasher.finalize()
}

fn sequences_hash(tx: &Transaction, hash_type: SigHashType) -> [u8; 32] {
    if hash_type.is_single() || hash_type.is_none() || hash_type.is_anyone_can_pay() {
        return [0u8; 32];
    }
    let mut hasher = DomainHasher::transaction_signing();
    for input in &tx.inputs {
        hasher.write_u64(input.sequence);
    }
    hasher.finalize()
}

fn sig_op_counts_hash(tx: &Transaction, hash_type: SigHashType) -> [u8; 32] {
    if hash_type.is_anyone_can_pay() {
        return [0u8; 32];
    }
    let mut hasher = DomainHasher::transaction_signing();
    for input in &tx.inputs {
        hasher.write_u8(input.sig_op_count);
    }
    hasher.finalize()
}

fn outputs_hash(tx: &Transaction, hash_type: SigHashType, input_index: usize) -> [u8; 32] {
    if hash_type.is_none() {
        return [0u8; 32];
    }
    if hash_type.is_single() {
        // SINGLE without a matching output commits to no outputs
        return match tx.outputs.get(input_index) {
            Some(output) => {
                let mut hasher = DomainHasher::transaction_signing();
                write_output(&mut hasher, output);
                hasher.finalize()
            }
            None => [0u8; 32],
        };
    }
    let mut hasher = DomainHasher::transaction_signing();
    for output in &tx.outputs {
        write_output(&mut hasher, output);
    }
    hasher.finalize()
}

fn payload_hash(tx: &Transaction) -> [u8; 32] {
    if tx.subnetwork_id.is_native() && tx.payload.is_empty() {
        return [0u8; 32];
    }
    let mut hasher = DomainHasher::transaction_signing();
    hasher.write_var_bytes(&tx.payload);
    hasher.finalize()
}

fn write_output(hasher: &mut DomainHasher, output: &TransactionOutput) {
    hasher
        .write_u64(output.value)
        .write_u16(output.script_public_key.version)
        .write_var_bytes(&output.script_public_key.script);
}

// --- Keys ---

/// A secp256k1 secret key.
///
/// The secret is overwritten on drop. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    inner: SecretKey,
}

impl PrivateKey {
    /// Generate a random key using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self { inner: SecretKey::new(&mut csprng) }
    }

    /// Create a key from 32 bytes; rejects zero and values at or above the
    /// curve order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let inner = SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { inner })
    }

    /// Raw secret bytes. Handle with care.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.inner.secret_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey { inner: self.inner.public_key(SECP256K1) }
    }

    pub(crate) fn keypair(&self) -> Keypair {
        Keypair::from_secret_key(SECP256K1, &self.inner)
    }

    /// Schnorr-sign a 32-byte digest.
    pub fn sign_schnorr(&self, digest: [u8; 32]) -> [u8; 64] {
        let msg = Message::from_digest(digest);
        let sig = SECP256K1.sign_schnorr(&msg, &self.keypair());
        let bytes: &[u8; 64] = sig.as_ref();
        *bytes
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.inner.non_secure_erase();
    }
}

impl From<SecretKey> for PrivateKey {
    fn from(inner: SecretKey) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_bytes(&bytes)
    }
}

/// A secp256k1 public key (compressed point).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
}

impl PublicKey {
    /// Parse a 33-byte compressed or 65-byte uncompressed key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner =
            secp256k1::PublicKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { inner })
    }

    pub fn serialize(&self) -> [u8; 33] {
        self.inner.serialize()
    }

    /// The 32-byte x-only form used by Schnorr addresses and scripts.
    pub fn xonly(&self) -> [u8; 32] {
        self.inner.x_only_public_key().0.serialize()
    }

    /// Schnorr pay-to-pubkey address.
    pub fn to_address(&self, prefix: Prefix) -> Address {
        Address::from_xonly(prefix, self.xonly())
    }

    /// ECDSA pay-to-pubkey address.
    pub fn to_address_ecdsa(&self, prefix: Prefix) -> Address {
        Address::from_ecdsa(prefix, self.serialize())
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(inner: secp256k1::PublicKey) -> Self {
        Self { inner }
    }
}

impl From<PublicKey> for secp256k1::PublicKey {
    fn from(key: PublicKey) -> Self {
        key.inner
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.serialize()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.serialize()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(PublicKey::serialize(self)))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

// --- Input signing ---

/// Sign `tx.inputs[input_index]`, writing its Schnorr signature script.
pub fn sign_input(
    tx: &mut Transaction,
    entries: &[UtxoEntry],
    input_index: usize,
    key: &PrivateKey,
    hash_type: SigHashType,
) -> Result<(), CryptoError> {
    let digest = calc_schnorr_signature_hash(tx, entries, input_index, hash_type)?;
    let signature = key.sign_schnorr(digest);
    tx.inputs[input_index].signature_script =
        schnorr_signature_script(&signature, hash_type.to_u8());
    Ok(())
}

/// Verify the Schnorr signature on `tx.inputs[input_index]` against the
/// x-only key in the spent UTXO's pay-to-pubkey script.
pub fn verify_input(
    tx: &Transaction,
    entries: &[UtxoEntry],
    input_index: usize,
) -> Result<(), CryptoError> {
    let input = tx.inputs.get(input_index).ok_or(CryptoError::InputIndexOutOfBounds {
        index: input_index,
        len: tx.inputs.len(),
    })?;
    let entry = entries.get(input_index).ok_or(CryptoError::EntryCountMismatch {
        inputs: tx.inputs.len(),
        entries: entries.len(),
    })?;

    let (signature, hash_byte) = parse_schnorr_signature_script(&input.signature_script)
        .ok_or(CryptoError::MalformedSignatureScript { index: input_index })?;
    let hash_type = SigHashType::from_u8(hash_byte)?;
    let xonly = entry
        .script_public_key
        .xonly_key()
        .ok_or(CryptoError::UnsupportedScript { index: input_index })?;

    let digest = calc_schnorr_signature_hash(tx, entries, input_index, hash_type)?;
    let key = XOnlyPublicKey::from_slice(&xonly).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = schnorr::Signature::from_slice(&signature).map_err(|_| CryptoError::InvalidSignature)?;
    SECP256K1
        .verify_schnorr(&sig, &Message::from_digest(digest), &key)
        .map_err(|_| CryptoError::VerificationFailed { index: input_index })
}
