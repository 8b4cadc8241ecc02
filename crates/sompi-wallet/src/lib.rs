//! # sompi-wallet — HD keys and UTXO transactions for Sompi.
//!
//! Turns a BIP-39 phrase into BIP-32 extended keys, derives BIP-44 account
//! addresses, selects UTXOs, builds unsigned transactions and signs them
//! input by input.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`mnemonic`] — BIP-39 phrases and seeds
//! - [`path`] — derivation path parsing and formatting
//! - [`xkey`] — extended keys and their base58 encodings
//! - [`account`] — BIP-44 account keychain
//! - [`payment`] — requested outputs
//! - [`fees`] — fee policies
//! - [`coin_selection`] — UTXO selection policies
//! - [`builder`] — unsigned transaction assembly
//! - [`signer`] — per-input Schnorr signing
//! - [`wallet`] — composition over a node collaborator

pub mod account;
pub mod builder;
pub mod coin_selection;
pub mod error;
pub mod fees;
pub mod mnemonic;
pub mod path;
pub mod payment;
pub mod signer;
pub mod wallet;
pub mod xkey;

// Re-exports for convenient access
pub use account::{Account, Chain, DerivedKey};
pub use builder::{ChangePolicy, TransactionBuilder, UnsignedTransaction};
pub use coin_selection::{CoinSelection, CoinSelector, LargestFirst, SelectionPolicy, SmallestSufficient};
pub use error::WalletError;
pub use fees::FeePolicy;
pub use mnemonic::{Mnemonic, Seed, WordCount};
pub use path::{ChildNumber, DerivationPath, HARDENED_OFFSET, IntoDerivationPath, MAX_PATH_DEPTH};
pub use payment::PaymentOutput;
pub use signer::{SignedTransaction, TransactionSigner};
pub use wallet::{FeePriority, Wallet, WalletBalance};
pub use xkey::{ExtendedKey, ExtendedKeyPrefix};
