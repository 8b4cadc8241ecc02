//! # sompi-core
//! Foundation types for the Sompi wallet engine: network ids, the address
//! codec, scripts, transactions, signing hashes and the RPC collaborator
//! interface.

pub mod address;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod hashing;
pub mod mass;
pub mod network;
pub mod script;
pub mod serde_hex;
pub mod traits;
pub mod tx;
