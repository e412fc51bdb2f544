use thiserror::Error;

/// Solana-side construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("derivation exhausted: no bump seed yields an off-curve address")]
    DerivationExhausted,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("transaction too large: {size} bytes (max {max})")]
    OversizeTransaction { size: usize, max: usize },

    #[error("blockhash expired: block height {current} is past last valid height {last_valid}")]
    BlockhashExpired { last_valid: u64, current: u64 },

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("account data mismatch: expected {expected} bytes, got {actual}")]
    AccountDataMismatch { expected: usize, actual: usize },
}
