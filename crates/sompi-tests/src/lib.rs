//! Cross-crate test suite for Sompi.
//!
//! End-to-end scenarios run a recorded mnemonic through derivation,
//! selection, building, signing and export. Adversarial tests hammer the
//! parsers and the selector with randomized inputs.

pub mod helpers;
