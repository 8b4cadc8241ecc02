//! BIP-32 hierarchical deterministic keys.
//!
//! An [`ExtendedKey`] pairs a secp256k1 key with its chain code and
//! position in the tree. Keys are immutable: deriving a child returns a new
//! value. String forms are the 78-byte BIP-32 payload in base58check, with
//! version bytes selecting one of the [`ExtendedKeyPrefix`] families.

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use secp256k1::{PublicKey as SecpPublicKey, SECP256K1, Scalar, SecretKey};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use sompi_core::crypto::{PrivateKey, PublicKey};
use sompi_core::network::NetworkType;

use crate::error::WalletError;
use crate::path::{ChildNumber, IntoDerivationPath};

type HmacSha512 = Hmac<Sha512>;

/// HMAC key for master key generation.
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Length of the serialized key payload before the base58check checksum.
const ENCODED_LEN: usize = 78;

/// Version-byte families for extended key strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtendedKeyPrefix {
    Kprv,
    Kpub,
    Ktrv,
    Ktub,
    Xprv,
    Xpub,
    Tprv,
    Tpub,
}

impl ExtendedKeyPrefix {
    const ALL: [ExtendedKeyPrefix; 8] = [
        ExtendedKeyPrefix::Kprv,
        ExtendedKeyPrefix::Kpub,
        ExtendedKeyPrefix::Ktrv,
        ExtendedKeyPrefix::Ktub,
        ExtendedKeyPrefix::Xprv,
        ExtendedKeyPrefix::Xpub,
        ExtendedKeyPrefix::Tprv,
        ExtendedKeyPrefix::Tpub,
    ];

    pub fn version(&self) -> [u8; 4] {
        let v: u32 = match self {
            ExtendedKeyPrefix::Kprv => 0x038f_2ef4,
            ExtendedKeyPrefix::Kpub => 0x038f_332e,
            ExtendedKeyPrefix::Ktrv => 0x0390_9e07,
            ExtendedKeyPrefix::Ktub => 0x0390_a241,
            ExtendedKeyPrefix::Xprv => 0x0488_ade4,
            ExtendedKeyPrefix::Xpub => 0x0488_b21e,
            ExtendedKeyPrefix::Tprv => 0x0435_8394,
            ExtendedKeyPrefix::Tpub => 0x0435_87cf,
        };
        v.to_be_bytes()
    }

    pub fn from_version(version: [u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.version() == version)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtendedKeyPrefix::Kprv => "kprv",
            ExtendedKeyPrefix::Kpub => "kpub",
            ExtendedKeyPrefix::Ktrv => "ktrv",
            ExtendedKeyPrefix::Ktub => "ktub",
            ExtendedKeyPrefix::Xprv => "xprv",
            ExtendedKeyPrefix::Xpub => "xpub",
            ExtendedKeyPrefix::Tprv => "tprv",
            ExtendedKeyPrefix::Tpub => "tpub",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(
            self,
            ExtendedKeyPrefix::Kprv
                | ExtendedKeyPrefix::Ktrv
                | ExtendedKeyPrefix::Xprv
                | ExtendedKeyPrefix::Tprv
        )
    }

    pub fn is_test(&self) -> bool {
        matches!(
            self,
            ExtendedKeyPrefix::Ktrv
                | ExtendedKeyPrefix::Ktub
                | ExtendedKeyPrefix::Tprv
                | ExtendedKeyPrefix::Tpub
        )
    }

    /// Network tag a parsed key receives.
    pub fn network(&self) -> NetworkType {
        if self.is_test() { NetworkType::Testnet } else { NetworkType::Mainnet }
    }

    /// The `k*` prefix for a key kind on a network.
    pub fn kaspa(private: bool, network: NetworkType) -> Self {
        match (private, network.is_test()) {
            (true, false) => ExtendedKeyPrefix::Kprv,
            (false, false) => ExtendedKeyPrefix::Kpub,
            (true, true) => ExtendedKeyPrefix::Ktrv,
            (false, true) => ExtendedKeyPrefix::Ktub,
        }
    }

    /// The public counterpart of a private prefix; public prefixes map to
    /// themselves.
    pub fn public(&self) -> Self {
        match self {
            ExtendedKeyPrefix::Kprv => ExtendedKeyPrefix::Kpub,
            ExtendedKeyPrefix::Ktrv => ExtendedKeyPrefix::Ktub,
            ExtendedKeyPrefix::Xprv => ExtendedKeyPrefix::Xpub,
            ExtendedKeyPrefix::Tprv => ExtendedKeyPrefix::Tpub,
            other => *other,
        }
    }
}

impl fmt::Display for ExtendedKeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtendedKeyPrefix {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| WalletError::InvalidEncoding(format!("unknown prefix {s:?}")))
    }
}

#[derive(Clone, PartialEq, Eq)]
enum KeyMaterial {
    Private(SecretKey),
    Public(SecpPublicKey),
}

/// A BIP-32 extended private or public key.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    key: KeyMaterial,
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: ChildNumber,
    network: NetworkType,
}

impl ExtendedKey {
    /// Master key from a 16..=64 byte seed, tagged mainnet.
    pub fn from_seed(seed: impl AsRef<[u8]>) -> Result<Self, WalletError> {
        let seed = seed.as_ref();
        if !(16..=64).contains(&seed.len()) {
            return Err(WalletError::InvalidSeedLength(seed.len()));
        }
        let (il, chain_code) = hmac_sha512(MASTER_HMAC_KEY, &[seed]);
        let secret = SecretKey::from_slice(&il)
            .map_err(|_| WalletError::InvalidEncoding("seed yields an invalid master key".into()))?;
        Ok(Self {
            key: KeyMaterial::Private(secret),
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: ChildNumber::from_u32(0),
            network: NetworkType::Mainnet,
        })
    }

    /// The same key tagged for another network.
    pub fn for_network(&self, network: NetworkType) -> Self {
        Self { network, ..self.clone() }
    }

    /// CKDpriv / CKDpub for one step.
    pub fn derive_child(&self, index: u32, hardened: bool) -> Result<Self, WalletError> {
        let child_number = ChildNumber::new(index, hardened)?;
        let depth = self.depth.checked_add(1).ok_or(WalletError::DepthExceeded)?;
        let parent_public = self.secp_public_key();
        let index_bytes = child_number.to_u32().to_be_bytes();

        let (key, chain_code) = match &self.key {
            KeyMaterial::Private(secret) => {
                let (il, chain_code) = if hardened {
                    hmac_sha512(
                        &self.chain_code,
                        &[&[0u8][..], &secret.secret_bytes()[..], &index_bytes[..]],
                    )
                } else {
                    hmac_sha512(
                        &self.chain_code,
                        &[&parent_public.serialize()[..], &index_bytes[..]],
                    )
                };
                let tweak = Scalar::from_be_bytes(il).map_err(|_| WalletError::InvalidChildKey(index))?;
                let child = secret
                    .add_tweak(&tweak)
                    .map_err(|_| WalletError::InvalidChildKey(index))?;
                (KeyMaterial::Private(child), chain_code)
            }
            KeyMaterial::Public(public) => {
                if hardened {
                    return Err(WalletError::PublicDerivationNotHardenable { index });
                }
                let (il, chain_code) =
                    hmac_sha512(&self.chain_code, &[&public.serialize()[..], &index_bytes[..]]);
                let tweak = Scalar::from_be_bytes(il).map_err(|_| WalletError::InvalidChildKey(index))?;
                let child = public
                    .add_exp_tweak(SECP256K1, &tweak)
                    .map_err(|_| WalletError::InvalidChildKey(index))?;
                (KeyMaterial::Public(child), chain_code)
            }
        };

        Ok(Self {
            key,
            chain_code,
            depth,
            parent_fingerprint: fingerprint_of(&parent_public),
            child_number,
            network: self.network,
        })
    }

    /// Apply every step of `path` in order, stopping at the first error.
    pub fn derive_path(&self, path: impl IntoDerivationPath) -> Result<Self, WalletError> {
        let path = path.into_derivation_path()?;
        let derived = path
            .steps()
            .iter()
            .try_fold(self.clone(), |key, step| key.derive_child(step.index(), step.is_hardened()))?;
        debug!(%path, depth = derived.depth, "derived extended key");
        Ok(derived)
    }

    /// Neuter to the public extended key. Public keys are returned as-is.
    pub fn to_public(&self) -> Self {
        Self {
            key: KeyMaterial::Public(self.secp_public_key()),
            ..self.clone()
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self.key, KeyMaterial::Private(_))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.secp_public_key())
    }

    pub fn private_key(&self) -> Option<PrivateKey> {
        match &self.key {
            KeyMaterial::Private(secret) => Some(PrivateKey::from(*secret)),
            KeyMaterial::Public(_) => None,
        }
    }

    /// First 4 bytes of RIPEMD160(SHA256(compressed public key)).
    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint_of(&self.secp_public_key())
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_number(&self) -> ChildNumber {
        self.child_number
    }

    pub fn network(&self) -> NetworkType {
        self.network
    }

    /// The `k*` prefix matching this key's kind and network.
    pub fn default_prefix(&self) -> ExtendedKeyPrefix {
        ExtendedKeyPrefix::kaspa(self.is_private(), self.network)
    }

    /// Base58check string under `prefix`. The prefix must match the key's
    /// kind and network family.
    pub fn into_string(&self, prefix: ExtendedKeyPrefix) -> Result<String, WalletError> {
        if prefix.is_private() != self.is_private() {
            let kind = if self.is_private() { "private" } else { "public" };
            return Err(WalletError::InvalidEncoding(format!(
                "prefix {prefix} cannot encode a {kind} key"
            )));
        }
        if prefix.is_test() != self.network.is_test() {
            return Err(WalletError::InvalidEncoding(format!(
                "prefix {prefix} does not match network {}",
                self.network
            )));
        }

        let mut payload = Vec::with_capacity(ENCODED_LEN);
        payload.extend_from_slice(&prefix.version());
        payload.push(self.depth);
        payload.extend_from_slice(&self.parent_fingerprint);
        payload.extend_from_slice(&self.child_number.to_u32().to_be_bytes());
        payload.extend_from_slice(&self.chain_code);
        match &self.key {
            KeyMaterial::Private(secret) => {
                payload.push(0);
                payload.extend_from_slice(&secret.secret_bytes());
            }
            KeyMaterial::Public(public) => payload.extend_from_slice(&public.serialize()),
        }
        Ok(bs58::encode(payload).with_check().into_string())
    }

    /// Parse a base58check extended key. The prefix sets the network tag.
    pub fn from_string(s: &str) -> Result<Self, WalletError> {
        let data = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| WalletError::InvalidEncoding(e.to_string()))?;
        if data.len() != ENCODED_LEN {
            return Err(WalletError::InvalidEncoding(format!(
                "expected {ENCODED_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&data[0..4]);
        let prefix = ExtendedKeyPrefix::from_version(version).ok_or_else(|| {
            WalletError::InvalidEncoding(format!("unknown version {}", hex::encode(version)))
        })?;
        let depth = data[4];
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&data[5..9]);
        let mut child_raw = [0u8; 4];
        child_raw.copy_from_slice(&data[9..13]);
        let child_number = ChildNumber::from_u32(u32::from_be_bytes(child_raw));
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);
        let key_data = &data[45..78];

        if depth == 0 && (parent_fingerprint != [0u8; 4] || child_number.to_u32() != 0) {
            return Err(WalletError::InvalidEncoding(
                "root key with non-zero parent fingerprint or child number".into(),
            ));
        }

        let key = if prefix.is_private() {
            if key_data[0] != 0 {
                return Err(WalletError::InvalidEncoding("private key data must start with 0x00".into()));
            }
            let secret = SecretKey::from_slice(&key_data[1..])
                .map_err(|_| WalletError::InvalidEncoding("private key out of range".into()))?;
            KeyMaterial::Private(secret)
        } else {
            let public = SecpPublicKey::from_slice(key_data)
                .map_err(|_| WalletError::InvalidEncoding("invalid public key".into()))?;
            KeyMaterial::Public(public)
        };

        Ok(Self {
            key,
            chain_code,
            depth,
            parent_fingerprint,
            child_number,
            network: prefix.network(),
        })
    }

    fn secp_public_key(&self) -> SecpPublicKey {
        match &self.key {
            KeyMaterial::Private(secret) => secret.public_key(SECP256K1),
            KeyMaterial::Public(public) => *public,
        }
    }
}

impl FromStr for ExtendedKey {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("private", &self.is_private())
            .field("public_key", &self.public_key())
            .field("depth", &self.depth)
            .field("child_number", &self.child_number)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> ([u8; 32], [u8; 32]) {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    (il, ir)
}

fn fingerprint_of(public: &SecpPublicKey) -> [u8; 4] {
    let hash = Ripemd160::digest(Sha256::digest(public.serialize()));
    let mut fp = [0u8; 4];
    fp.copy_from_slice(&hash[..4]);
    fp
}
