use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("signature verification failed")]
    InvalidSignature,

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
}

impl From<ledger_core::CoreError> for IdentityError {
    fn from(e: ledger_core::CoreError) -> Self {
        IdentityError::Canonicalization(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("invalid JSON payload")]
    InvalidJson,

    #[error("missing required invite field: {0}")]
    MissingField(&'static str),
}
