use async_trait::async_trait;
use ledger_core::{Entry, GroupId, Hash, LamportClock};
use ledger_crypto::KeyPair;
use ledger_engine::GroupState;

use crate::error::StorageError;

/// The persistence contract implemented by the embedding application's
/// storage backend. `ledger-sync` reads and writes through this trait only —
/// it never assumes a concrete engine (sled, sqlite, an in-browser IndexedDB
/// shim, …).
///
/// Every method is idempotent where the spec calls for it: re-appending an
/// entry already present by `entry_id` is a silent no-op (§5).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Append `entry` to `group_id`'s log. Idempotent on `entry_id`.
    async fn append_entry(&self, group_id: GroupId, entry: Entry) -> Result<(), StorageError>;

    async fn get_entry(&self, entry_id: Hash) -> Result<Option<Entry>, StorageError>;

    /// Entries for `group_id` with `lamport_clock` strictly greater than
    /// `after_lamport_clock`. Ordering is unspecified — callers re-order.
    async fn get_entries_after(
        &self,
        group_id: GroupId,
        after_lamport_clock: LamportClock,
    ) -> Result<Vec<Entry>, StorageError>;

    async fn get_latest_entry(&self, group_id: GroupId) -> Result<Option<Entry>, StorageError>;

    /// Every entry stored for `group_id`. No ordering guarantee.
    async fn get_all_entries(&self, group_id: GroupId) -> Result<Vec<Entry>, StorageError>;

    async fn get_group_ids(&self) -> Result<Vec<GroupId>, StorageError>;

    /// The cached derived-state projection for `group_id`, if one has been
    /// saved. Advisory only — validation always replays from the entry log
    /// rather than trusting this cache (§9, open question (b)).
    async fn get_group_state(&self, group_id: GroupId) -> Result<Option<GroupState>, StorageError>;

    async fn save_group_state(&self, group_id: GroupId, state: GroupState) -> Result<(), StorageError>;

    // ── Identity store — at most one of each per backend instance ──────────

    async fn store_root_identity(&self, keypair: &KeyPair) -> Result<(), StorageError>;
    async fn get_root_identity(&self) -> Result<Option<KeyPair>, StorageError>;

    async fn store_device_identity(&self, keypair: &KeyPair) -> Result<(), StorageError>;
    async fn get_device_identity(&self) -> Result<Option<KeyPair>, StorageError>;
}
