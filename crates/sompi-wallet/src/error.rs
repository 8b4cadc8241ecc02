//! Wallet error types.

use sompi_core::error::{AddressError, CryptoError, RpcError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Wrong word count, unknown word or checksum failure.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Seed outside the 16..=64 byte range accepted for a master key.
    #[error("invalid seed length: {0} bytes (expected 16..=64)")]
    InvalidSeedLength(usize),

    /// Hardened derivation requested from a public-only key.
    #[error("cannot derive hardened child {index}' from a public key")]
    PublicDerivationNotHardenable {
        /// Child index without the hardened bit.
        index: u32,
    },

    /// Malformed derivation path.
    #[error("invalid derivation path {path:?}: {reason}")]
    InvalidPath {
        /// The path text as given.
        path: String,
        /// Which component failed and why.
        reason: String,
    },

    /// Malformed extended key string.
    #[error("invalid extended key encoding: {0}")]
    InvalidEncoding(String),

    /// Derived tweak is outside the curve order or produces the identity.
    /// Callers should skip to the next index.
    #[error("child key {0} is invalid, use the next index")]
    InvalidChildKey(u32),

    /// Derivation past depth 255.
    #[error("maximum derivation depth exceeded")]
    DepthExceeded,

    /// Insufficient funds to cover the outputs plus fees.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Available balance in sompi.
        have: u64,
        /// Required amount in sompi.
        need: u64,
    },

    /// No outputs requested.
    #[error("no outputs requested")]
    EmptyOutputSet,

    /// Builder called without inputs.
    #[error("no inputs selected")]
    NoInputsSelected,

    /// Zero output value or an overflowing sum.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The same outpoint appears more than once in the candidate set.
    #[error("duplicate outpoint: {0}")]
    DuplicateOutpoint(String),

    /// No key in the signing set matches the input's locking script.
    #[error("no private key for input {index} (script {script})")]
    MissingPrivateKeyForInput {
        index: usize,
        /// Hex of the spent script public key.
        script: String,
    },

    /// The input already carries a signature; reset it first.
    #[error("input {index} is already signed")]
    AlreadySigned { index: usize },

    /// The input has no signature yet.
    #[error("input {index} is not signed")]
    NotFullySigned { index: usize },

    /// Inputs and UTXO entries disagree in count.
    #[error("{inputs} inputs but {entries} UTXO entries")]
    InputCountMismatch { inputs: usize, entries: usize },

    /// A UTXO entry does not match the outpoint its input spends.
    #[error("UTXO entry {index} does not match the outpoint of input {index}")]
    EntryMismatch { index: usize },

    /// Sighash byte outside the standard set.
    #[error("invalid sighash type: {0:#04x}")]
    InvalidSighashType(u8),

    /// Address error from sompi-core.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Cryptographic error from sompi-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Node collaborator failure.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl WalletError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        WalletError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_funds() {
        let e = WalletError::InsufficientFunds { have: 100, need: 200 };
        assert_eq!(e.to_string(), "insufficient funds: have 100, need 200");
    }

    #[test]
    fn display_invalid_path_names_component() {
        let e = WalletError::invalid_path("m/01", "leading zero in component \"01\"");
        assert_eq!(
            e.to_string(),
            "invalid derivation path \"m/01\": leading zero in component \"01\""
        );
    }

    #[test]
    fn display_missing_key() {
        let e = WalletError::MissingPrivateKeyForInput { index: 2, script: "20ab".into() };
        assert_eq!(e.to_string(), "no private key for input 2 (script 20ab)");
    }

    #[test]
    fn clone_and_eq() {
        let e1 = WalletError::AlreadySigned { index: 0 };
        assert_eq!(e1.clone(), e1);
    }

    #[test]
    fn from_crypto_error() {
        let wallet: WalletError = CryptoError::InvalidPublicKey.into();
        assert_eq!(wallet, WalletError::Crypto(CryptoError::InvalidPublicKey));
    }

    #[test]
    fn from_rpc_error() {
        let wallet: WalletError = RpcError::Transport("down".into()).into();
        assert_eq!(wallet.to_string(), "rpc transport: down");
    }
}
