//! Standard locking and unlocking scripts.
//!
//! Only the fixed pay-to-address templates are understood. The engine never
//! executes scripts; it builds them for outputs, recognises them on spent
//! UTXOs and parses the Schnorr signature script it writes itself.

use serde::{Deserialize, Serialize};

use crate::address::{Address, Prefix, Version};
use crate::constants::SCRIPT_VERSION;
use crate::error::ScriptError;

pub const OP_DATA_32: u8 = 0x20;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_BLAKE2B: u8 = 0xaa;
pub const OP_CHECKSIG_ECDSA: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;

/// Length of a Schnorr signature script: push opcode, signature, type byte.
pub const SCHNORR_SIGNATURE_SCRIPT_LEN: usize = 66;

/// A versioned locking script.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptPublicKey {
    pub version: u16,
    #[serde(with = "crate::serde_hex")]
    pub script: Vec<u8>,
}

/// The standard template a locking script matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptClass {
    NonStandard,
    PubKey,
    PubKeyECDSA,
    ScriptHash,
}

impl ScriptPublicKey {
    pub fn new(version: u16, script: Vec<u8>) -> Self {
        Self { version, script }
    }

    /// `OP_DATA_32 <xonly> OP_CHECKSIG`
    pub fn pay_to_pub_key(xonly: &[u8; 32]) -> Self {
        let mut script = Vec::with_capacity(34);
        script.push(OP_DATA_32);
        script.extend_from_slice(xonly);
        script.push(OP_CHECKSIG);
        Self::new(SCRIPT_VERSION, script)
    }

    /// `OP_DATA_33 <compressed key> OP_CHECKSIG_ECDSA`
    pub fn pay_to_pub_key_ecdsa(key: &[u8; 33]) -> Self {
        let mut script = Vec::with_capacity(35);
        script.push(OP_DATA_33);
        script.extend_from_slice(key);
        script.push(OP_CHECKSIG_ECDSA);
        Self::new(SCRIPT_VERSION, script)
    }

    /// `OP_BLAKE2B OP_DATA_32 <hash> OP_EQUAL`
    pub fn pay_to_script_hash(hash: &[u8; 32]) -> Self {
        let mut script = Vec::with_capacity(35);
        script.push(OP_BLAKE2B);
        script.push(OP_DATA_32);
        script.extend_from_slice(hash);
        script.push(OP_EQUAL);
        Self::new(SCRIPT_VERSION, script)
    }

    /// The locking script paying to `address`.
    pub fn pay_to_address(address: &Address) -> Self {
        let payload = address.payload();
        let mut script = Vec::with_capacity(payload.len() + 3);
        match address.version() {
            Version::PubKey => {
                script.push(OP_DATA_32);
                script.extend_from_slice(payload);
                script.push(OP_CHECKSIG);
            }
            Version::PubKeyECDSA => {
                script.push(OP_DATA_33);
                script.extend_from_slice(payload);
                script.push(OP_CHECKSIG_ECDSA);
            }
            Version::ScriptHash => {
                script.push(OP_BLAKE2B);
                script.push(OP_DATA_32);
                script.extend_from_slice(payload);
                script.push(OP_EQUAL);
            }
        }
        Self::new(SCRIPT_VERSION, script)
    }

    pub fn class(&self) -> ScriptClass {
        if self.version != SCRIPT_VERSION {
            return ScriptClass::NonStandard;
        }
        let s = &self.script;
        match s.len() {
            34 if s[0] == OP_DATA_32 && s[33] == OP_CHECKSIG => ScriptClass::PubKey,
            35 if s[0] == OP_DATA_33 && s[34] == OP_CHECKSIG_ECDSA => ScriptClass::PubKeyECDSA,
            35 if s[0] == OP_BLAKE2B && s[1] == OP_DATA_32 && s[34] == OP_EQUAL => {
                ScriptClass::ScriptHash
            }
            _ => ScriptClass::NonStandard,
        }
    }

    /// The x-only key of a Schnorr pay-to-pubkey script.
    pub fn xonly_key(&self) -> Option<[u8; 32]> {
        match self.class() {
            ScriptClass::PubKey => self.script[1..33].try_into().ok(),
            _ => None,
        }
    }

    /// Recover the address this script pays to.
    pub fn to_address(&self, prefix: Prefix) -> Result<Address, ScriptError> {
        if self.version != SCRIPT_VERSION {
            return Err(ScriptError::UnsupportedVersion(self.version));
        }
        let (version, payload) = match self.class() {
            ScriptClass::PubKey => (Version::PubKey, &self.script[1..33]),
            ScriptClass::PubKeyECDSA => (Version::PubKeyECDSA, &self.script[1..34]),
            ScriptClass::ScriptHash => (Version::ScriptHash, &self.script[2..34]),
            ScriptClass::NonStandard => return Err(ScriptError::NonStandard),
        };
        Address::new(prefix, version, payload).map_err(|_| ScriptError::NonStandard)
    }
}

impl From<&Address> for ScriptPublicKey {
    fn from(address: &Address) -> Self {
        Self::pay_to_address(address)
    }
}

/// `OP_DATA_65 <64-byte signature> <sighash type>`
pub fn schnorr_signature_script(signature: &[u8; 64], hash_type: u8) -> Vec<u8> {
    let mut script = Vec::with_capacity(SCHNORR_SIGNATURE_SCRIPT_LEN);
    script.push(OP_DATA_65);
    script.extend_from_slice(signature);
    script.push(hash_type);
    script
}

/// Split a Schnorr signature script into its signature and sighash byte.
pub fn parse_schnorr_signature_script(script: &[u8]) -> Option<([u8; 64], u8)> {
    if script.len() != SCHNORR_SIGNATURE_SCRIPT_LEN || script[0] != OP_DATA_65 {
        return None;
    }
    let signature: [u8; 64] = script[1..65].try_into().ok()?;
    Some((signature, script[65]))
}
