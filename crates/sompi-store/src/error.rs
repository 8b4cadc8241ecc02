//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::reader::StoreName;

/// Errors from directory resolution, store reads and export.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The platform reports no home directory and none was configured.
    #[error("no home directory found; pass an explicit app dir")]
    NoHomeDir,

    /// A required directory of the node layout does not exist.
    #[error("missing directory: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// A store name outside the known set.
    #[error("unknown store: {0:?}")]
    UnknownStore(String),

    /// The reader does not expose this store.
    #[error("store {0} is not available")]
    Unavailable(StoreName),

    /// Batch size must be at least one record.
    #[error("batch size must be non-zero")]
    InvalidBatchSize,

    /// Every export field is switched off.
    #[error("no export fields selected")]
    NoFieldsSelected,

    /// A UTXO script has no address form under the export prefix.
    #[error("script {script} has no address form")]
    UnresolvableScript { script: String },

    /// Summed balance for an address exceeds `u64`.
    #[error("balance overflow for {0}")]
    BalanceOverflow(String),

    /// Failure reported by the underlying reader.
    #[error("reader: {0}")]
    Reader(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
