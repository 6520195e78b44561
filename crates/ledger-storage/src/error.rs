use thiserror::Error;

/// Errors a storage backend may report. This crate's `InMemoryStorage`
/// reference implementation never actually fails — these variants exist for
/// the trait's real implementers (the persistence backend is an external
/// collaborator per the engine's scope).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend I/O failure: {0}")]
    Io(String),

    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error("no identity of the requested kind is stored")]
    IdentityNotFound,
}
