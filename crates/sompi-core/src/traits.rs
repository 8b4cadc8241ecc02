//! Trait interfaces for collaborators the wallet engine consumes.
//!
//! - [`NodeRpc`]: UTXO lookup, fee estimation and transaction submission
//!   against a node. The engine never implements a transport itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::RpcError;
use crate::tx::{Transaction, TransactionId, UtxoEntry};

/// A fee rate together with the expected confirmation delay at that rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeerateBucket {
    /// Sompi per gram of mass.
    pub feerate: f64,
    pub estimated_seconds: f64,
}

/// Fee rate buckets reported by the node, fastest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub priority_bucket: FeerateBucket,
    pub normal_buckets: Vec<FeerateBucket>,
    pub low_buckets: Vec<FeerateBucket>,
}

impl FeeEstimate {
    pub fn priority(&self) -> FeerateBucket {
        self.priority_bucket
    }

    /// Fastest normal bucket, falling back to priority.
    pub fn normal(&self) -> FeerateBucket {
        self.normal_buckets.first().copied().unwrap_or(self.priority_bucket)
    }

    /// Fastest low bucket, falling back to [`normal`](Self::normal).
    pub fn low(&self) -> FeerateBucket {
        self.low_buckets.first().copied().unwrap_or_else(|| self.normal())
    }
}

/// Node RPC surface used by the wallet.
///
/// Implementations must be shareable across tasks; the engine holds no lock
/// while awaiting a call.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// All unspent outputs locked to any of `addresses`.
    async fn get_utxos_by_addresses(&self, addresses: &[Address]) -> Result<Vec<UtxoEntry>, RpcError>;

    async fn get_fee_estimate(&self) -> Result<FeeEstimate, RpcError>;

    /// Submit a signed transaction; returns the id the node accepted.
    async fn submit_transaction(
        &self,
        tx: Transaction,
        allow_orphan: bool,
    ) -> Result<TransactionId, RpcError>;
}
