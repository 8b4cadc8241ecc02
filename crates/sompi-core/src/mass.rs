//! Transaction mass estimation.
//!
//! Mass is the node's cost measure: serialized bytes, plus a surcharge per
//! output script byte and per signature operation. Unsigned inputs are
//! sized as if they already carried a Schnorr signature script.

use crate::constants::{MASS_PER_SCRIPT_PUB_KEY_BYTE, MASS_PER_SIG_OP, MASS_PER_TX_BYTE};
use crate::script::SCHNORR_SIGNATURE_SCRIPT_LEN;
use crate::tx::{Transaction, TransactionInput, TransactionOutput};

fn input_size(input: &TransactionInput) -> u64 {
    let script_len = if input.is_signed() {
        input.signature_script.len()
    } else {
        SCHNORR_SIGNATURE_SCRIPT_LEN
    };
    // outpoint (32 + 4), script length prefix, script, sequence
    32 + 4 + 8 + script_len as u64 + 8
}

fn output_size(output: &TransactionOutput) -> u64 {
    // value, script version, script length prefix, script
    8 + 2 + 8 + output.script_public_key.script.len() as u64
}

/// Serialized size in bytes, with placeholder signatures for unsigned inputs.
pub fn estimated_serialized_size(tx: &Transaction) -> u64 {
    let mut size: u64 = 2 + 8;
    size += tx.inputs.iter().map(input_size).sum::<u64>();
    size += 8;
    size += tx.outputs.iter().map(output_size).sum::<u64>();
    // lock time, subnetwork id, gas, payload hash, payload length
    size += 8 + 20 + 8 + 32 + 8;
    size + tx.payload.len() as u64
}

/// Total mass of `tx`.
pub fn compute_mass(tx: &Transaction) -> u64 {
    let script_bytes: u64 = tx
        .outputs
        .iter()
        .map(|o| 2 + o.script_public_key.script.len() as u64)
        .sum();
    let sig_ops: u64 = tx.inputs.iter().map(|i| u64::from(i.sig_op_count)).sum();
    estimated_serialized_size(tx) * MASS_PER_TX_BYTE
        + script_bytes * MASS_PER_SCRIPT_PUB_KEY_BYTE
        + sig_ops * MASS_PER_SIG_OP
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptPublicKey;
    use crate::tx::{TransactionId, TransactionOutpoint};

    fn one_in_two_out() -> Transaction {
        let op = TransactionOutpoint::new(TransactionId([1; 32]), 0);
        Transaction {
            inputs: vec![TransactionInput::new(op, 0, 1)],
            outputs: vec![
                TransactionOutput::new(100, ScriptPublicKey::pay_to_pub_key(&[2; 32])),
                TransactionOutput::new(200, ScriptPublicKey::pay_to_pub_key(&[3; 32])),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn size_of_standard_transaction() {
        assert_eq!(estimated_serialized_size(&one_in_two_out()), 316);
    }

    #[test]
    fn mass_of_standard_transaction() {
        // 316 bytes + 2 * 36 script bytes * 10 + 1 sig op * 1000
        assert_eq!(compute_mass(&one_in_two_out()), 2036);
    }

    #[test]
    fn unsigned_and_signed_sizes_match() {
        let unsigned = one_in_two_out();
        let mut signed = unsigned.clone();
        signed.inputs[0].signature_script = vec![0u8; SCHNORR_SIGNATURE_SCRIPT_LEN];
        assert_eq!(estimated_serialized_size(&unsigned), estimated_serialized_size(&signed));
    }

    #[test]
    fn payload_adds_to_size() {
        let mut tx = one_in_two_out();
        tx.payload = vec![0; 10];
        assert_eq!(estimated_serialized_size(&tx), 326);
    }

    #[test]
    fn each_input_adds_sig_op_mass() {
        let mut tx = one_in_two_out();
        let base = compute_mass(&tx);
        let op = TransactionOutpoint::new(TransactionId([9; 32]), 1);
        tx.inputs.push(TransactionInput::new(op, 0, 1));
        assert_eq!(compute_mass(&tx) - base, 118 + 1000);
    }
}
