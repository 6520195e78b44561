use thiserror::Error;

/// Errors originating from the primitive type and canonicalization layer.
/// Everything here is structural: malformed hex, bad UUID shape, a value that
/// cannot be canonicalized at all. Domain-level rejections (split sums,
/// inactive members, …) live in `ledger-engine::ValidationIssue` instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] crate::types::HexLengthError),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("empty field: {0}")]
    EmptyField(&'static str),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),
}
