//! Coin selection.
//!
//! The selector walks candidates in the order a [`SelectionPolicy`] gives
//! and accumulates them until the requested total plus the fee for the
//! inputs taken so far is covered. The default policy is largest-first,
//! which minimizes input count rather than change.

use std::collections::HashSet;

use sompi_core::tx::UtxoEntry;
use tracing::debug;

use crate::error::WalletError;
use crate::fees::FeePolicy;
use crate::payment::{self, PaymentOutput};

/// Orders spendable candidates for accumulation.
///
/// Candidates never include zero-amount entries.
pub trait SelectionPolicy {
    fn order<'a>(&self, candidates: Vec<&'a UtxoEntry>, target: u64, fee: &FeePolicy) -> Vec<&'a UtxoEntry>;
}

/// Largest amount first. Equal amounts keep the caller's order.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestFirst;

impl SelectionPolicy for LargestFirst {
    fn order<'a>(&self, mut candidates: Vec<&'a UtxoEntry>, _target: u64, _fee: &FeePolicy) -> Vec<&'a UtxoEntry> {
        // sort_by is stable
        candidates.sort_by(|a, b| b.amount.cmp(&a.amount));
        candidates
    }
}

/// The single smallest entry that covers the target on its own, if any;
/// otherwise largest-first.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmallestSufficient;

impl SelectionPolicy for SmallestSufficient {
    fn order<'a>(&self, candidates: Vec<&'a UtxoEntry>, target: u64, fee: &FeePolicy) -> Vec<&'a UtxoEntry> {
        let need = target.saturating_add(fee.fee_for(1));
        let mut ordered = LargestFirst.order(candidates, target, fee);
        // ordered is descending, so the last covering entry is the smallest
        if let Some(pos) = ordered.iter().rposition(|e| e.amount >= need) {
            let pick = ordered.remove(pos);
            ordered.insert(0, pick);
        }
        ordered
    }
}

/// Selected inputs and the fee/change breakdown.
///
/// `total_selected == required + fee + change` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinSelection {
    /// Inputs in spend order.
    pub selected: Vec<UtxoEntry>,
    /// Sum of `selected` amounts in sompi.
    pub total_selected: u64,
    /// Sum of requested outputs in sompi.
    pub required: u64,
    /// Fee in sompi for `selected.len()` inputs.
    pub fee: u64,
    pub change: u64,
}

/// Chooses UTXOs to fund a set of payment outputs.
pub struct CoinSelector;

impl CoinSelector {
    /// Select with the default [`LargestFirst`] policy.
    pub fn select(
        utxos: &[UtxoEntry],
        outputs: &[PaymentOutput],
        fee_policy: &FeePolicy,
    ) -> Result<CoinSelection, WalletError> {
        Self::select_with(&LargestFirst, utxos, outputs, fee_policy)
    }

    /// Select with a caller-supplied policy.
    ///
    /// Fails with [`WalletError::InsufficientFunds`] if even every candidate
    /// together does not cover the outputs plus fee.
    pub fn select_with(
        policy: &dyn SelectionPolicy,
        utxos: &[UtxoEntry],
        outputs: &[PaymentOutput],
        fee_policy: &FeePolicy,
    ) -> Result<CoinSelection, WalletError> {
        let required = payment::total_amount(outputs)?;

        let mut seen = HashSet::with_capacity(utxos.len());
        for entry in utxos {
            if !seen.insert(entry.outpoint) {
                return Err(WalletError::DuplicateOutpoint(entry.outpoint.to_string()));
            }
        }

        let candidates: Vec<&UtxoEntry> = utxos.iter().filter(|e| e.amount > 0).collect();
        let ordered = policy.order(candidates, required, fee_policy);

        let mut selected = Vec::new();
        let mut total_selected: u64 = 0;
        for entry in ordered {
            total_selected = total_selected
                .checked_add(entry.amount)
                .ok_or_else(|| WalletError::InvalidAmount("input total overflows u64".into()))?;
            selected.push(entry.clone());
            debug!(outpoint = %entry.outpoint, amount = entry.amount, "selected input");

            let fee = fee_policy.fee_for(selected.len());
            let need = required.saturating_add(fee);
            if total_selected >= need {
                return Ok(CoinSelection {
                    change: total_selected - need,
                    selected,
                    total_selected,
                    required,
                    fee,
                });
            }
        }

        Err(WalletError::InsufficientFunds {
            have: total_selected,
            need: required.saturating_add(fee_policy.fee_for(selected.len())),
        })
    }
}
