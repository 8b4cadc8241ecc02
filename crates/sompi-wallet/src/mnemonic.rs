//! BIP-39 mnemonic phrases and the 64-byte seeds they stretch into.

use bip39::Language;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::WalletError;

/// Supported phrase lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WordCount {
    Words12,
    #[default]
    Words24,
}

impl WordCount {
    pub fn words(&self) -> usize {
        match self {
            WordCount::Words12 => 12,
            WordCount::Words24 => 24,
        }
    }

    fn entropy_len(&self) -> usize {
        match self {
            WordCount::Words12 => 16,
            WordCount::Words24 => 32,
        }
    }

    fn from_words(n: usize) -> Option<Self> {
        match n {
            12 => Some(WordCount::Words12),
            24 => Some(WordCount::Words24),
            _ => None,
        }
    }
}

/// A validated English BIP-39 phrase.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    inner: bip39::Mnemonic,
    word_count: WordCount,
}

impl Mnemonic {
    /// Parse a phrase. Whitespace runs collapse to single spaces and the
    /// phrase is lower-cased before validation.
    pub fn from_phrase(phrase: &str) -> Result<Self, WalletError> {
        let normalized = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let n = normalized.split(' ').filter(|w| !w.is_empty()).count();
        let word_count = WordCount::from_words(n).ok_or_else(|| {
            WalletError::InvalidMnemonic(format!("expected 12 or 24 words, got {n}"))
        })?;
        let inner = bip39::Mnemonic::parse_in(Language::English, &normalized)
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
        Ok(Self { inner, word_count })
    }

    /// Generate a fresh phrase from the OS cryptographic RNG.
    pub fn random(word_count: WordCount) -> Self {
        use rand::RngCore;
        let mut entropy = [0u8; 32];
        let entropy = &mut entropy[..word_count.entropy_len()];
        rand::rngs::OsRng.fill_bytes(entropy);
        let inner = bip39::Mnemonic::from_entropy_in(Language::English, entropy)
            .expect("16 or 32 bytes always produce a valid mnemonic");
        entropy.zeroize();
        Self { inner, word_count }
    }

    pub fn phrase(&self) -> String {
        self.inner.to_string()
    }

    pub fn word_count(&self) -> WordCount {
        self.word_count
    }

    /// PBKDF2-HMAC-SHA512 (2048 rounds, salt `"mnemonic" + passphrase`).
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        Seed { bytes: self.inner.to_seed(passphrase) }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic")
            .field("word_count", &self.word_count.words())
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

/// A 64-byte BIP-39 seed.
///
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 64],
}

impl Seed {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
