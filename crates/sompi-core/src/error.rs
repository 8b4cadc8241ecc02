//! Error types for the Sompi core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("missing ':' separator")] MissingSeparator,
    #[error("unknown network prefix: {0}")] UnknownNetworkPrefix(String),
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("mixed case")] MixedCase,
    #[error("checksum mismatch")] ChecksumMismatch,
    #[error("invalid length: {0}")] InvalidLength(usize),
    #[error("invalid version: {0}")] InvalidVersion(u8),
    #[error("invalid padding bits")] InvalidPadding,
    #[error("payload of {got} bytes does not match version {version} (expected {expected})")]
    PayloadLength { version: u8, expected: usize, got: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("unknown network type: {0}")] UnknownNetworkType(String),
    #[error("network {0} requires a numeric suffix")] MissingSuffix(String),
    #[error("network {0} does not take a suffix")] UnexpectedSuffix(String),
    #[error("invalid network suffix: {0}")] InvalidSuffix(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script is not a standard pay-to-address form")] NonStandard,
    #[error("unsupported script version: {0}")] UnsupportedVersion(u16),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid private key")] InvalidPrivateKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("malformed signature script on input {index}")] MalformedSignatureScript { index: usize },
    #[error("signature verification failed on input {index}")] VerificationFailed { index: usize },
    #[error("invalid sighash type: {0:#04x}")] InvalidSighashType(u8),
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
    #[error("{entries} UTXO entries supplied for {inputs} inputs")] EntryCountMismatch { inputs: usize, entries: usize },
    #[error("input {index} spends a non pay-to-pubkey script")] UnsupportedScript { index: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("rpc transport: {0}")] Transport(String),
    #[error("rpc rejected request: {0}")] Rejected(String),
    #[error("rpc response malformed: {0}")] Malformed(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Network(#[from] NetworkError),
    #[error(transparent)] Script(#[from] ScriptError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Rpc(#[from] RpcError),
}
