//! Requested payment outputs.

use serde::{Deserialize, Serialize};
use sompi_core::address::Address;
use sompi_core::script::ScriptPublicKey;
use sompi_core::tx::TransactionOutput;

use crate::error::WalletError;

/// A destination address and the amount to pay it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub address: Address,
    /// Amount in sompi.
    pub amount: u64,
}

impl PaymentOutput {
    pub fn new(address: Address, amount: u64) -> Self {
        Self { address, amount }
    }

    pub fn to_transaction_output(&self) -> TransactionOutput {
        TransactionOutput::new(self.amount, ScriptPublicKey::pay_to_address(&self.address))
    }
}

/// Total requested amount.
///
/// Rejects an empty set, any zero amount, and sums that overflow `u64`.
pub fn total_amount(outputs: &[PaymentOutput]) -> Result<u64, WalletError> {
    if outputs.is_empty() {
        return Err(WalletError::EmptyOutputSet);
    }
    outputs.iter().enumerate().try_fold(0u64, |acc, (i, o)| {
        if o.amount == 0 {
            return Err(WalletError::InvalidAmount(format!("output {i} has zero amount")));
        }
        acc.checked_add(o.amount)
            .ok_or_else(|| WalletError::InvalidAmount("output total overflows u64".into()))
    })
}
