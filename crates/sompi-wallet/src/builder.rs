//! Unsigned transaction assembly.
//!
//! The builder turns selected inputs and requested outputs into an
//! [`UnsignedTransaction`]:
//! 1. Inputs in selection order, each with empty signature script
//! 2. Requested outputs in caller order
//! 3. A change output last, if the leftover is not dust
//!
//! Building is pure: identical arguments give a byte-identical transaction.

use std::collections::HashSet;

use sompi_core::address::Address;
use sompi_core::constants::{DEFAULT_DUST_THRESHOLD, DEFAULT_SIG_OP_COUNT, TX_VERSION};
use sompi_core::mass::compute_mass;
use sompi_core::script::ScriptPublicKey;
use sompi_core::tx::{Transaction, TransactionId, TransactionInput, TransactionOutput, UtxoEntry};
use tracing::debug;

use crate::coin_selection::CoinSelection;
use crate::error::WalletError;
use crate::payment::{self, PaymentOutput};

/// Where leftover value goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChangePolicy {
    /// Back to the script of the first input.
    #[default]
    ToSource,
    /// To a caller-chosen address.
    To(Address),
}

/// A transaction whose inputs may not all be signed yet, together with the
/// UTXO entries it spends (one per input, in input order).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub(crate) tx: Transaction,
    pub(crate) entries: Vec<UtxoEntry>,
    fee: u64,
    change: u64,
}

impl UnsignedTransaction {
    /// Wrap an externally assembled transaction.
    ///
    /// The fee is whatever the entries fund beyond the outputs; change is
    /// reported as zero.
    pub fn from_parts(tx: Transaction, entries: Vec<UtxoEntry>) -> Result<Self, WalletError> {
        if tx.inputs.len() != entries.len() {
            return Err(WalletError::InputCountMismatch {
                inputs: tx.inputs.len(),
                entries: entries.len(),
            });
        }
        for (index, (input, entry)) in tx.inputs.iter().zip(&entries).enumerate() {
            if input.previous_outpoint != entry.outpoint {
                return Err(WalletError::EntryMismatch { index });
            }
        }
        let have = sum_entries(&entries)?;
        let need = tx
            .total_output_value()
            .ok_or_else(|| WalletError::InvalidAmount("output total overflows u64".into()))?;
        if have < need {
            return Err(WalletError::InsufficientFunds { have, need });
        }
        Ok(Self { tx, entries, fee: have - need, change: 0 })
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn entries(&self) -> &[UtxoEntry] {
        &self.entries
    }

    /// Fee paid, including any leftover absorbed as dust.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Value of the change output, zero if none was emitted.
    pub fn change(&self) -> u64 {
        self.change
    }

    pub fn id(&self) -> TransactionId {
        self.tx.id()
    }

    /// Mass with placeholder signatures for unsigned inputs.
    pub fn mass(&self) -> u64 {
        compute_mass(&self.tx)
    }
}

/// Builder for unsigned transactions.
///
/// # Example
/// ```ignore
/// let mut builder = TransactionBuilder::new();
/// builder.add_output(address, 5 * SOMPI_PER_KASPA).set_lock_time(0);
/// let unsigned = builder.build_from_selection(&selection)?;
/// ```
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    outputs: Vec<PaymentOutput>,
    lock_time: u64,
    dust_threshold: u64,
    change_policy: ChangePolicy,
    sig_op_count: u8,
    payload: Vec<u8>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
            lock_time: 0,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            change_policy: ChangePolicy::ToSource,
            sig_op_count: DEFAULT_SIG_OP_COUNT,
            payload: Vec::new(),
        }
    }

    pub fn add_output(&mut self, address: Address, amount: u64) -> &mut Self {
        self.outputs.push(PaymentOutput::new(address, amount));
        self
    }

    pub fn set_outputs(&mut self, outputs: Vec<PaymentOutput>) -> &mut Self {
        self.outputs = outputs;
        self
    }

    pub fn set_lock_time(&mut self, lock_time: u64) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    /// Leftovers at or below this many sompi are added to the fee
    /// (default: [`DEFAULT_DUST_THRESHOLD`]).
    pub fn set_dust_threshold(&mut self, threshold: u64) -> &mut Self {
        self.dust_threshold = threshold;
        self
    }

    pub fn set_change_policy(&mut self, policy: ChangePolicy) -> &mut Self {
        self.change_policy = policy;
        self
    }

    /// Sig-op count declared by every input (default: 1).
    pub fn set_sig_op_count(&mut self, count: u8) -> &mut Self {
        self.sig_op_count = count;
        self
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) -> &mut Self {
        self.payload = payload;
        self
    }

    pub fn outputs(&self) -> &[PaymentOutput] {
        &self.outputs
    }

    /// Assemble a transaction spending `inputs` and paying `fee`.
    pub fn build(&self, inputs: &[UtxoEntry], fee: u64) -> Result<UnsignedTransaction, WalletError> {
        let first = inputs.first().ok_or(WalletError::NoInputsSelected)?;
        let required = payment::total_amount(&self.outputs)?;

        let mut seen = HashSet::with_capacity(inputs.len());
        for entry in inputs {
            if !seen.insert(entry.outpoint) {
                return Err(WalletError::DuplicateOutpoint(entry.outpoint.to_string()));
            }
        }

        let have = sum_entries(inputs)?;
        let need = required.saturating_add(fee);
        if have < need {
            return Err(WalletError::InsufficientFunds { have, need });
        }
        let leftover = have - need;

        let mut outputs: Vec<TransactionOutput> = self
            .outputs
            .iter()
            .map(PaymentOutput::to_transaction_output)
            .collect();

        let (fee, change) = if leftover > 0 && leftover > self.dust_threshold {
            let script = match &self.change_policy {
                ChangePolicy::ToSource => first.script_public_key.clone(),
                ChangePolicy::To(address) => ScriptPublicKey::pay_to_address(address),
            };
            outputs.push(TransactionOutput::new(leftover, script));
            (fee, leftover)
        } else {
            if leftover > 0 {
                debug!(leftover, dust_threshold = self.dust_threshold, "leftover absorbed into fee");
            }
            (fee + leftover, 0)
        };

        let tx = Transaction {
            version: TX_VERSION,
            inputs: inputs
                .iter()
                .map(|e| TransactionInput::new(e.outpoint, 0, self.sig_op_count))
                .collect(),
            outputs,
            lock_time: self.lock_time,
            payload: self.payload.clone(),
            ..Default::default()
        };
        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee,
            change,
            "built unsigned transaction"
        );

        Ok(UnsignedTransaction {
            tx,
            entries: inputs.to_vec(),
            fee,
            change,
        })
    }

    /// [`build`](Self::build) from a coin selection.
    pub fn build_from_selection(&self, selection: &CoinSelection) -> Result<UnsignedTransaction, WalletError> {
        self.build(&selection.selected, selection.fee)
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_entries(entries: &[UtxoEntry]) -> Result<u64, WalletError> {
    entries.iter().try_fold(0u64, |acc, e| {
        acc.checked_add(e.amount)
            .ok_or_else(|| WalletError::InvalidAmount("input total overflows u64".into()))
    })
}
