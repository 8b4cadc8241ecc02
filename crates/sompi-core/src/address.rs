//! Address encoding for Kaspa-style networks.
//!
//! Addresses have the form `<prefix>:<data>`, where the prefix names the
//! network (`kaspa`, `kaspatest`, `kaspasim`, `kaspadev`) and the data part
//! is the 5-bit base32 encoding of `version || payload` followed by an
//! 8-character BCH checksum. The checksum covers the prefix, so an address
//! copied onto the wrong network fails to decode.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;
use crate::network::{NetworkId, NetworkType};

/// Base32 character set for encoding 5-bit values.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Number of 5-bit checksum characters.
const CHECKSUM_LEN: usize = 8;

/// Network tag that prefixes every address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prefix {
    Mainnet,
    Testnet,
    Simnet,
    Devnet,
}

impl Prefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::Mainnet => "kaspa",
            Prefix::Testnet => "kaspatest",
            Prefix::Simnet => "kaspasim",
            Prefix::Devnet => "kaspadev",
        }
    }

    pub fn network_type(&self) -> NetworkType {
        match self {
            Prefix::Mainnet => NetworkType::Mainnet,
            Prefix::Testnet => NetworkType::Testnet,
            Prefix::Simnet => NetworkType::Simnet,
            Prefix::Devnet => NetworkType::Devnet,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prefix {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kaspa" => Ok(Prefix::Mainnet),
            "kaspatest" => Ok(Prefix::Testnet),
            "kaspasim" => Ok(Prefix::Simnet),
            "kaspadev" => Ok(Prefix::Devnet),
            other => Err(AddressError::UnknownNetworkPrefix(other.to_string())),
        }
    }
}

impl From<NetworkType> for Prefix {
    fn from(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Prefix::Mainnet,
            NetworkType::Testnet => Prefix::Testnet,
            NetworkType::Simnet => Prefix::Simnet,
            NetworkType::Devnet => Prefix::Devnet,
        }
    }
}

impl From<NetworkId> for Prefix {
    fn from(id: NetworkId) -> Self {
        id.network_type().into()
    }
}

/// Kind of payload an address commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Version {
    /// 32-byte x-only Schnorr public key.
    PubKey = 0,
    /// 33-byte compressed ECDSA public key.
    PubKeyECDSA = 1,
    /// 32-byte BLAKE2b script hash.
    ScriptHash = 8,
}

impl Version {
    /// Payload length implied by this version.
    pub fn public_key_len(&self) -> usize {
        match self {
            Version::PubKey | Version::ScriptHash => 32,
            Version::PubKeyECDSA => 33,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::PubKey),
            1 => Ok(Version::PubKeyECDSA),
            8 => Ok(Version::ScriptHash),
            other => Err(AddressError::InvalidVersion(other)),
        }
    }
}

/// A network address: prefix, version and the payload it commits to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    prefix: Prefix,
    version: Version,
    payload: Vec<u8>,
}

impl Address {
    /// Create an address, checking the payload length against the version.
    pub fn new(prefix: Prefix, version: Version, payload: &[u8]) -> Result<Self, AddressError> {
        let expected = version.public_key_len();
        if payload.len() != expected {
            return Err(AddressError::PayloadLength {
                version: version as u8,
                expected,
                got: payload.len(),
            });
        }
        Ok(Self { prefix, version, payload: payload.to_vec() })
    }

    /// Create a Schnorr pay-to-pubkey address from an x-only key.
    pub fn from_xonly(prefix: Prefix, xonly: [u8; 32]) -> Self {
        Self { prefix, version: Version::PubKey, payload: xonly.to_vec() }
    }

    /// Create an ECDSA pay-to-pubkey address from a compressed key.
    pub fn from_ecdsa(prefix: Prefix, key: [u8; 33]) -> Self {
        Self { prefix, version: Version::PubKeyECDSA, payload: key.to_vec() }
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The same payload under a different network prefix.
    pub fn with_prefix(&self, prefix: Prefix) -> Self {
        Self { prefix, ..self.clone() }
    }

    /// Encode this address as `<prefix>:<data>`.
    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(1 + self.payload.len());
        raw.push(self.version as u8);
        raw.extend_from_slice(&self.payload);
        let data = convert_bits(&raw, 8, 5, true).unwrap_or_default();

        let checksum = checksum(self.prefix.as_str(), &data);

        let mut result =
            String::with_capacity(self.prefix.as_str().len() + 1 + data.len() + CHECKSUM_LEN);
        result.push_str(self.prefix.as_str());
        result.push(':');
        for &d in &data {
            result.push(CHARSET[d as usize] as char);
        }
        for i in (0..CHECKSUM_LEN).rev() {
            result.push(CHARSET[((checksum >> (5 * i)) & 0x1f) as usize] as char);
        }
        result
    }

    /// Decode an address string. Upper-case input is accepted as long as it
    /// is not mixed with lower case.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }
        let s = s.to_ascii_lowercase();

        let (prefix_str, data_part) = s.split_once(':').ok_or(AddressError::MissingSeparator)?;
        let prefix: Prefix = prefix_str.parse()?;

        let mut values = Vec::with_capacity(data_part.len());
        for c in data_part.chars() {
            let pos = CHARSET
                .iter()
                .position(|&ch| ch as char == c)
                .ok_or(AddressError::InvalidCharacter(c))?;
            values.push(pos as u8);
        }

        if values.len() <= CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(values.len()));
        }
        let (data, checksum_chars) = values.split_at(values.len() - CHECKSUM_LEN);
        let given = checksum_chars
            .iter()
            .fold(0u64, |acc, &v| (acc << 5) | u64::from(v));
        if checksum(prefix.as_str(), data) != given {
            return Err(AddressError::ChecksumMismatch);
        }

        let raw = convert_bits(data, 5, 8, false).ok_or(AddressError::InvalidPadding)?;
        let (&version_byte, payload) =
            raw.split_first().ok_or(AddressError::InvalidLength(values.len()))?;
        let version = Version::try_from(version_byte)?;
        Self::new(prefix, version, payload)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

// --- Checksum internals ---

/// BCH polymod over 5-bit values, 40-bit result.
fn polymod(values: impl Iterator<Item = u8>) -> u64 {
    const GEN: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];
    let mut c: u64 = 1;
    for d in values {
        let c0 = c >> 35;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        for (i, &g) in GEN.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= g;
            }
        }
    }
    c ^ 1
}

/// Checksum over `prefix & 0x1f || 0 || data || 0*8`.
fn checksum(prefix: &str, data: &[u8]) -> u64 {
    let values = prefix
        .bytes()
        .map(|b| b & 0x1f)
        .chain(std::iter::once(0))
        .chain(data.iter().copied())
        .chain(std::iter::repeat_n(0, CHECKSUM_LEN));
    polymod(values)
}

/// Convert between bit widths (8-bit bytes to 5-bit groups and back).
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::with_capacity(data.len() * from_bits as usize / to_bits as usize + 1);
    let maxv = (1u32 << to_bits) - 1;
    for &value in data {
        let v = u32::from(value);
        if v >> from_bits != 0 {
            return None;
        }
        acc = (acc << from_bits) | v;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            ret.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(ret)
}
