//! Store reader boundary.
//!
//! A node persists several named key/value stores. [`StoreReader`] is the
//! narrow read-only view the engine needs: which stores exist, point
//! lookups, and a stream over the UTXO index. [`MemoryStore`] is an
//! in-memory implementation for tests and offline fixtures.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sompi_core::script::ScriptPublicKey;
use sompi_core::tx::TransactionOutpoint;

use crate::error::StoreError;

/// The stores a node exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreName {
    Metadata,
    Headers,
    UtxoIndex,
    UtxoIndexTips,
    CirculatingSupply,
}

impl StoreName {
    pub const ALL: [StoreName; 5] = [
        StoreName::Metadata,
        StoreName::Headers,
        StoreName::UtxoIndex,
        StoreName::UtxoIndexTips,
        StoreName::CirculatingSupply,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Metadata => "metadata",
            StoreName::Headers => "headers",
            StoreName::UtxoIndex => "utxo_index",
            StoreName::UtxoIndexTips => "utxo_index_tips",
            StoreName::CirculatingSupply => "circulating_supply",
        }
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| StoreError::UnknownStore(s.to_string()))
    }
}

/// One record of the UTXO index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedUtxo {
    pub script_public_key: ScriptPublicKey,
    pub outpoint: TransactionOutpoint,
    /// Value in sompi.
    pub amount: u64,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

/// Boxed stream of UTXO index records.
pub type UtxoStream<'a> = Box<dyn Iterator<Item = Result<IndexedUtxo, StoreError>> + 'a>;

/// Read-only access to a node's stores.
pub trait StoreReader {
    /// Stores this reader can serve.
    fn stores(&self) -> Vec<StoreName>;

    /// Raw value under `key` in `store`, `None` if absent.
    fn get(&self, store: StoreName, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Every record of the UTXO index, in store order.
    fn utxo_index(&self) -> Result<UtxoStream<'_>, StoreError>;
}

/// In-memory [`StoreReader`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    kv: BTreeMap<StoreName, BTreeMap<Vec<u8>, Vec<u8>>>,
    utxos: Option<Vec<IndexedUtxo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, store: StoreName, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.kv.entry(store).or_default().insert(key.into(), value.into());
        self
    }

    /// Enable the UTXO index and append `record` to it.
    pub fn push_utxo(&mut self, record: IndexedUtxo) -> &mut Self {
        self.utxos.get_or_insert_with(Vec::new).push(record);
        self
    }
}

impl StoreReader for MemoryStore {
    fn stores(&self) -> Vec<StoreName> {
        let mut names: Vec<StoreName> = self.kv.keys().copied().collect();
        if self.utxos.is_some() && !names.contains(&StoreName::UtxoIndex) {
            names.push(StoreName::UtxoIndex);
            names.sort();
        }
        names
    }

    fn get(&self, store: StoreName, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let table = self.kv.get(&store).ok_or(StoreError::Unavailable(store))?;
        Ok(table.get(key).cloned())
    }

    fn utxo_index(&self) -> Result<UtxoStream<'_>, StoreError> {
        let utxos = self
            .utxos
            .as_ref()
            .ok_or(StoreError::Unavailable(StoreName::UtxoIndex))?;
        Ok(Box::new(utxos.iter().cloned().map(Ok)))
    }
}
