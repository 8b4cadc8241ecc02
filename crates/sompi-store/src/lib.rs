//! # sompi-store — node store boundary.
//!
//! Explicit directory layout for a node's data dir, the [`StoreReader`]
//! trait the engine consumes, and delimited export of the UTXO index.
//! Nothing here opens a database; readers are supplied by the caller.

pub mod error;
pub mod export;
pub mod layout;
pub mod reader;

pub use layout::StoreDirs;
pub use error::StoreError;
pub use export::{ExportOptions, ExportSummary, export_address_balances, export_utxos};
pub use reader::{IndexedUtxo, MemoryStore, StoreName, StoreReader};
