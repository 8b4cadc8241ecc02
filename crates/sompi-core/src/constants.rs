//! Protocol constants shared across the workspace.
//!
//! All monetary values are in sompi (1 KAS = 10^8 sompi).

/// Number of sompi in one KAS.
pub const SOMPI_PER_KASPA: u64 = 100_000_000;

/// Maximum possible supply in sompi, used to bound amount parsing.
pub const MAX_SOMPI: u64 = 29_000_000_000 * SOMPI_PER_KASPA;

/// SLIP-44 coin type registered for Kaspa.
pub const KASPA_COIN_TYPE: u32 = 111_111;

/// BIP-44 purpose field.
pub const BIP44_PURPOSE: u32 = 44;

/// Transaction version produced by the builder.
pub const TX_VERSION: u16 = 0;

/// Script public key version for all standard scripts.
pub const SCRIPT_VERSION: u16 = 0;

/// Length of a subnetwork id in bytes.
pub const SUBNETWORK_ID_SIZE: usize = 20;

/// Default sig-op count for a single-signature input.
pub const DEFAULT_SIG_OP_COUNT: u8 = 1;

/// Change at or below this value is dust under the default relay fee.
///
/// A standard P2PK output serializes to 52 bytes; with the 148-byte spend
/// allowance and the 3x relay multiplier this is `(52 + 148) * 3`.
pub const DEFAULT_DUST_THRESHOLD: u64 = 600;

/// Minimum relay fee rate in sompi per gram of mass.
pub const MINIMUM_FEERATE: f64 = 1.0;

/// Mass charged per serialized transaction byte.
pub const MASS_PER_TX_BYTE: u64 = 1;

/// Mass charged per byte of output script public key.
pub const MASS_PER_SCRIPT_PUB_KEY_BYTE: u64 = 10;

/// Mass charged per signature operation.
pub const MASS_PER_SIG_OP: u64 = 1_000;
