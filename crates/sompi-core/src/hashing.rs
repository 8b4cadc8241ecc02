//! Domain-separated BLAKE2b-256 hashing.
//!
//! Every consensus hash is a keyed BLAKE2b with a 32-byte digest; the key is
//! the domain name. Integers are written little-endian and variable-length
//! byte strings carry a u64 length prefix.

use blake2::Blake2bMac;
use blake2::digest::Mac;
use blake2::digest::consts::U32;

/// Domain key for transaction signature hashes.
pub const TRANSACTION_SIGNING_DOMAIN: &[u8] = b"TransactionSigningHash";

/// Domain key for transaction ids.
pub const TRANSACTION_ID_DOMAIN: &[u8] = b"TransactionID";

/// Incremental writer over a keyed BLAKE2b-256 state.
#[derive(Clone)]
pub struct DomainHasher {
    inner: Blake2bMac<U32>,
}

impl DomainHasher {
    /// Start a hasher keyed with `domain` (at most 64 bytes).
    pub fn new(domain: &'static [u8]) -> Self {
        let inner = <Blake2bMac<U32> as Mac>::new_from_slice(domain)
            .expect("domain keys are at most 64 bytes");
        Self { inner }
    }

    pub fn transaction_signing() -> Self {
        Self::new(TRANSACTION_SIGNING_DOMAIN)
    }

    pub fn transaction_id() -> Self {
        Self::new(TRANSACTION_ID_DOMAIN)
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.inner.update(data.as_ref());
        self
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.update([v])
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.update(v.to_le_bytes())
    }

    pub fn write_len(&mut self, len: usize) -> &mut Self {
        self.write_u64(len as u64)
    }

    /// Length-prefixed byte string.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_len(bytes.len()).update(bytes)
    }

    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into_bytes().into()
    }
}
