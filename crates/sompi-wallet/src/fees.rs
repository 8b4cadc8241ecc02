//! Fee policies.
//!
//! A [`FeePolicy`] prices a transaction by its input count, so the selector
//! can re-evaluate the fee each time it adds an input.

use serde::{Deserialize, Serialize};
use sompi_core::constants::{DEFAULT_SIG_OP_COUNT, MINIMUM_FEERATE};
use sompi_core::mass::compute_mass;
use sompi_core::script::ScriptPublicKey;
use sompi_core::tx::{Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput};

/// How the fee grows with the number of inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeePolicy {
    /// The same fee regardless of input count.
    Fixed(u64),
    /// `base + per_input * inputs`.
    Linear { base: u64, per_input: u64 },
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy::Fixed(0)
    }
}

impl FeePolicy {
    /// Fee in sompi for a transaction spending `input_count` inputs.
    pub fn fee_for(&self, input_count: usize) -> u64 {
        match *self {
            FeePolicy::Fixed(fee) => fee,
            FeePolicy::Linear { base, per_input } => {
                base.saturating_add(per_input.saturating_mul(input_count as u64))
            }
        }
    }

    /// Linear policy for a sompi-per-gram `feerate` over a transaction paying
    /// `output_scripts` (include the change script if change is expected).
    ///
    /// Rates below the relay minimum, and non-finite rates, are raised to
    /// [`MINIMUM_FEERATE`].
    pub fn from_feerate(feerate: f64, output_scripts: &[ScriptPublicKey]) -> Self {
        let feerate = if feerate.is_finite() && feerate >= MINIMUM_FEERATE {
            feerate
        } else {
            MINIMUM_FEERATE
        };
        let bare = Transaction {
            outputs: output_scripts
                .iter()
                .map(|s| TransactionOutput::new(0, s.clone()))
                .collect(),
            ..Default::default()
        };
        let base_mass = compute_mass(&bare);
        let mut one_input = bare;
        one_input.inputs.push(TransactionInput::new(
            TransactionOutpoint::new(TransactionId::ZERO, 0),
            0,
            DEFAULT_SIG_OP_COUNT,
        ));
        let per_input_mass = compute_mass(&one_input) - base_mass;
        FeePolicy::Linear {
            base: price(base_mass, feerate),
            per_input: price(per_input_mass, feerate),
        }
    }
}

fn price(mass: u64, feerate: f64) -> u64 {
    // float-to-int `as` saturates
    (mass as f64 * feerate).ceil() as u64
}
