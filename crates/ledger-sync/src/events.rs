use std::sync::Arc;

use ledger_core::{GroupId, Hash};
use ledger_engine::ValidationIssue;

/// Why an inbound transport entry was rejected before it ever reached
/// single-entry validation (§4.8 incoming path, steps ii/v).
#[derive(Clone, Debug)]
pub enum RejectionReason {
    Decryption,
    Deserialization(String),
    ExpectedGenesisFirst,
    ValidationFailed(Vec<ValidationIssue>),
}

/// A lifecycle event emitted by the sync manager (§2 component 8). Every
/// variant is also logged via `tracing` at the level noted alongside it.
#[derive(Clone, Debug)]
pub enum SyncEvent {
    /// `info`: an inbound entry was validated, persisted, and applied.
    EntryReceived { group_id: GroupId, entry_id: Hash },
    /// `warn`: an inbound entry was dropped.
    EntryRejected {
        group_id: GroupId,
        entry_id: Option<Hash>,
        reason: RejectionReason,
    },
    /// `info`: a gap-fill or initial sync pass began.
    SyncStart { group_id: GroupId },
    /// `info`: a gap-fill sync pass finished.
    SyncComplete {
        group_id: GroupId,
        accepted: usize,
        total: usize,
    },
    /// `error`: a sync pass failed outright (transport or whole-chain
    /// validation failure).
    SyncError { group_id: GroupId, message: String },
}

pub type SyncEventHandler = Arc<dyn Fn(SyncEvent) + Send + Sync>;
