use thiserror::Error;

/// Errors the sync manager raises to callers. Expected per-entry rejections
/// are NOT represented here — those are `entry:rejected` events (§7: the
/// sync manager never raises validation errors). This enum is reserved for
/// transport failures bubbling up from explicit calls and programmer errors
/// (missing group key, missing identity) that fail fast.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no group key registered for this group; call register_group_key first")]
    NoGroupKey,

    #[error("no device identity available to sign outbound entries")]
    NoDeviceIdentity,

    #[error(transparent)]
    Transport(#[from] ledger_transport::TransportError),

    #[error(transparent)]
    Storage(#[from] ledger_storage::StorageError),

    #[error("initial sync produced an invalid chain: {0:?}")]
    InvalidChain(Vec<ledger_engine::EntryValidationError>),

    #[error("failed to canonicalize entry for transport: {0}")]
    Serialization(String),
}
