//! Transaction signing.
//!
//! Each input is signed against its own Schnorr sighash, which commits to
//! the spent UTXO's amount and script. [`TransactionSigner::sign`] checks
//! every input before writing any signature, so a failed call leaves the
//! transaction untouched.

use std::collections::HashMap;

use sompi_core::crypto::{PrivateKey, SigHashType, calc_schnorr_signature_hash, verify_input};
use sompi_core::error::CryptoError;
use sompi_core::script::schnorr_signature_script;
use sompi_core::tx::{Transaction, TransactionId, TransactionInput, UtxoEntry};
use tracing::debug;

use crate::builder::UnsignedTransaction;
use crate::error::WalletError;

/// Signs [`UnsignedTransaction`] inputs with matching pay-to-pubkey keys.
pub struct TransactionSigner;

impl TransactionSigner {
    /// Sign every input with the key whose x-only public key appears in the
    /// spent UTXO's pay-to-pubkey script.
    ///
    /// Fails with [`WalletError::AlreadySigned`] or
    /// [`WalletError::MissingPrivateKeyForInput`] for the first offending
    /// input; nothing is written in that case.
    pub fn sign(
        unsigned: &mut UnsignedTransaction,
        keys: &[PrivateKey],
        hash_type: SigHashType,
    ) -> Result<(), WalletError> {
        let by_xonly: HashMap<[u8; 32], &PrivateKey> =
            keys.iter().map(|k| (k.public_key().xonly(), k)).collect();

        let mut plan = Vec::with_capacity(unsigned.tx.inputs.len());
        for (index, (input, entry)) in unsigned.tx.inputs.iter().zip(&unsigned.entries).enumerate() {
            if input.is_signed() {
                return Err(WalletError::AlreadySigned { index });
            }
            let key = entry
                .script_public_key
                .xonly_key()
                .and_then(|xonly| by_xonly.get(&xonly).copied())
                .ok_or_else(|| missing_key(index, entry))?;
            plan.push(key);
        }

        let scripts = plan
            .iter()
            .enumerate()
            .map(|(index, key)| signature_script(unsigned, index, key, hash_type))
            .collect::<Result<Vec<_>, _>>()?;

        for (input, script) in unsigned.tx.inputs.iter_mut().zip(scripts) {
            input.signature_script = script;
        }
        debug!(inputs = unsigned.tx.inputs.len(), hash_type = hash_type.to_u8(), "signed transaction");
        Ok(())
    }

    /// Sign one input with `key`.
    pub fn sign_input(
        unsigned: &mut UnsignedTransaction,
        index: usize,
        key: &PrivateKey,
        hash_type: SigHashType,
    ) -> Result<(), WalletError> {
        let (input, entry) = input_and_entry(unsigned, index)?;
        if input.is_signed() {
            return Err(WalletError::AlreadySigned { index });
        }
        if entry.script_public_key.xonly_key() != Some(key.public_key().xonly()) {
            return Err(missing_key(index, entry));
        }
        let script = signature_script(unsigned, index, key, hash_type)?;
        unsigned.tx.inputs[index].signature_script = script;
        debug!(index, "signed input");
        Ok(())
    }

    /// Clear the signature on one input so it can be signed again.
    pub fn reset_input(unsigned: &mut UnsignedTransaction, index: usize) -> Result<(), WalletError> {
        input_and_entry(unsigned, index)?;
        unsigned.tx.inputs[index].signature_script.clear();
        Ok(())
    }

    /// Clear every signature.
    pub fn reset(unsigned: &mut UnsignedTransaction) {
        for input in &mut unsigned.tx.inputs {
            input.signature_script.clear();
        }
    }
}

fn input_and_entry(
    unsigned: &UnsignedTransaction,
    index: usize,
) -> Result<(&TransactionInput, &UtxoEntry), WalletError> {
    let len = unsigned.tx.inputs.len();
    match (unsigned.tx.inputs.get(index), unsigned.entries.get(index)) {
        (Some(input), Some(entry)) => Ok((input, entry)),
        _ => Err(CryptoError::InputIndexOutOfBounds { index, len }.into()),
    }
}

fn missing_key(index: usize, entry: &UtxoEntry) -> WalletError {
    WalletError::MissingPrivateKeyForInput {
        index,
        script: hex::encode(&entry.script_public_key.script),
    }
}

fn signature_script(
    unsigned: &UnsignedTransaction,
    index: usize,
    key: &PrivateKey,
    hash_type: SigHashType,
) -> Result<Vec<u8>, WalletError> {
    let digest = calc_schnorr_signature_hash(&unsigned.tx, &unsigned.entries, index, hash_type)
        .map_err(|e| match e {
            CryptoError::EntryCountMismatch { inputs, entries } => {
                WalletError::InputCountMismatch { inputs, entries }
            }
            other => other.into(),
        })?;
    Ok(schnorr_signature_script(&key.sign_schnorr(digest), hash_type.to_u8()))
}

impl UnsignedTransaction {
    /// Input indices still lacking a signature.
    pub fn unsigned_inputs(&self) -> Vec<usize> {
        self.tx
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, i)| !i.is_signed())
            .map(|(index, _)| index)
            .collect()
    }

    /// Convert into a [`SignedTransaction`] once every input carries a
    /// signature.
    pub fn finalize(self) -> Result<SignedTransaction, WalletError> {
        if let Some(&index) = self.unsigned_inputs().first() {
            return Err(WalletError::NotFullySigned { index });
        }
        let fee = self.fee();
        Ok(SignedTransaction {
            tx: self.tx,
            entries: self.entries,
            fee,
        })
    }
}

/// A transaction with every input signed, ready for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    entries: Vec<UtxoEntry>,
    fee: u64,
}

impl SignedTransaction {
    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn entries(&self) -> &[UtxoEntry] {
        &self.entries
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn id(&self) -> TransactionId {
        self.tx.id()
    }

    /// Re-check every input signature against its spent UTXO.
    pub fn verify(&self) -> Result<(), WalletError> {
        for index in 0..self.tx.inputs.len() {
            verify_input(&self.tx, &self.entries, index)?;
        }
        Ok(())
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }
}
