//! Wallet composition: account keys, UTXO tracking, sending.
//!
//! [`Wallet`] ties an [`Account`] to a [`NodeRpc`] collaborator. Selection,
//! building and signing are synchronous; only the node calls are awaited.

use std::collections::BTreeMap;

use sompi_core::address::Address;
use sompi_core::constants::DEFAULT_DUST_THRESHOLD;
use sompi_core::crypto::SigHashType;
use sompi_core::script::ScriptPublicKey;
use sompi_core::traits::NodeRpc;
use sompi_core::tx::{TransactionId, TransactionOutpoint, UtxoEntry};
use tracing::{debug, info};

use crate::account::Account;
use crate::builder::{ChangePolicy, TransactionBuilder};
use crate::coin_selection::CoinSelector;
use crate::error::WalletError;
use crate::fees::FeePolicy;
use crate::payment::PaymentOutput;
use crate::signer::{SignedTransaction, TransactionSigner};

/// Confirmation speed to pay for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeePriority {
    Priority,
    #[default]
    Normal,
    Low,
}

/// Balance over the tracked UTXOs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletBalance {
    /// Total value in sompi.
    pub total: u64,
    /// Portion of `total` held in coinbase outputs.
    pub coinbase: u64,
    pub utxo_count: usize,
}

/// HD wallet bound to a node.
pub struct Wallet<R: NodeRpc> {
    account: Account,
    rpc: R,
    utxos: BTreeMap<TransactionOutpoint, UtxoEntry>,
    fee_priority: FeePriority,
    hash_type: SigHashType,
    dust_threshold: u64,
}

impl<R: NodeRpc> Wallet<R> {
    pub fn new(account: Account, rpc: R) -> Self {
        Self {
            account,
            rpc,
            utxos: BTreeMap::new(),
            fee_priority: FeePriority::default(),
            hash_type: SigHashType::ALL,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
        }
    }

    pub fn set_fee_priority(&mut self, priority: FeePriority) -> &mut Self {
        self.fee_priority = priority;
        self
    }

    pub fn set_hash_type(&mut self, hash_type: SigHashType) -> &mut Self {
        self.hash_type = hash_type;
        self
    }

    pub fn set_dust_threshold(&mut self, threshold: u64) -> &mut Self {
        self.dust_threshold = threshold;
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn account_mut(&mut self) -> &mut Account {
        &mut self.account
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Next unused receive address.
    pub fn receive_address(&mut self) -> Result<Address, WalletError> {
        self.account.next_receive_address()
    }

    /// Tracked UTXOs in outpoint order.
    pub fn utxos(&self) -> Vec<UtxoEntry> {
        self.utxos.values().cloned().collect()
    }

    pub fn balance(&self) -> WalletBalance {
        self.utxos.values().fold(WalletBalance::default(), |mut b, e| {
            b.total = b.total.saturating_add(e.amount);
            if e.is_coinbase {
                b.coinbase = b.coinbase.saturating_add(e.amount);
            }
            b.utxo_count += 1;
            b
        })
    }

    /// Replace the tracked set with the node's UTXOs for every derived
    /// address. Entries locked to scripts this account has no key for are
    /// dropped. Returns the number tracked.
    pub async fn fetch_utxos(&mut self) -> Result<usize, WalletError> {
        let addresses = self.account.addresses();
        let entries = if addresses.is_empty() {
            Vec::new()
        } else {
            self.rpc.get_utxos_by_addresses(&addresses).await?
        };
        self.utxos = entries
            .into_iter()
            .filter(|e| self.account.private_key_for_script(&e.script_public_key).is_some())
            .map(|e| (e.outpoint, e))
            .collect();
        debug!(addresses = addresses.len(), utxos = self.utxos.len(), "fetched utxos");
        Ok(self.utxos.len())
    }

    /// Fee policy for a transaction paying `output_scripts`, at the node's
    /// current rate for this wallet's priority.
    pub async fn estimate_fee_policy(&self, output_scripts: &[ScriptPublicKey]) -> Result<FeePolicy, WalletError> {
        let estimate = self.rpc.get_fee_estimate().await?;
        let bucket = match self.fee_priority {
            FeePriority::Priority => estimate.priority(),
            FeePriority::Normal => estimate.normal(),
            FeePriority::Low => estimate.low(),
        };
        debug!(feerate = bucket.feerate, priority = ?self.fee_priority, "fee estimate");
        Ok(FeePolicy::from_feerate(bucket.feerate, output_scripts))
    }

    /// Select, build and sign a transaction from the tracked UTXOs, with
    /// change to `change_address`.
    pub fn create_transaction(
        &self,
        outputs: &[PaymentOutput],
        fee_policy: &FeePolicy,
        change_address: Address,
    ) -> Result<SignedTransaction, WalletError> {
        let utxos = self.utxos();
        let selection = CoinSelector::select(&utxos, outputs, fee_policy)?;

        let mut builder = TransactionBuilder::new();
        builder
            .set_outputs(outputs.to_vec())
            .set_change_policy(ChangePolicy::To(change_address))
            .set_dust_threshold(self.dust_threshold);
        let mut unsigned = builder.build_from_selection(&selection)?;

        TransactionSigner::sign(&mut unsigned, &self.account.signing_keys(), self.hash_type)?;
        let signed = unsigned.finalize()?;
        signed.verify()?;
        Ok(signed)
    }

    /// Fetch, select, build, sign and submit a payment.
    pub async fn send(&mut self, outputs: &[PaymentOutput]) -> Result<TransactionId, WalletError> {
        self.fetch_utxos().await?;

        let (change_index, change_address) = self.account.peek_change_address()?;
        let scripts: Vec<ScriptPublicKey> = outputs
            .iter()
            .map(|o| ScriptPublicKey::pay_to_address(&o.address))
            .chain(std::iter::once(ScriptPublicKey::pay_to_address(&change_address)))
            .collect();
        let fee_policy = self.estimate_fee_policy(&scripts).await?;

        let signed = self.create_transaction(outputs, &fee_policy, change_address)?;
        let spent: Vec<TransactionOutpoint> =
            signed.tx().inputs.iter().map(|i| i.previous_outpoint).collect();
        let fee = signed.fee();

        let id = self.rpc.submit_transaction(signed.into_transaction(), false).await?;
        self.account.commit_change_index(change_index)?;
        for outpoint in &spent {
            self.utxos.remove(outpoint);
        }
        info!(%id, inputs = spent.len(), fee, "submitted transaction");
        Ok(id)
    }
}
