use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ledger_core::{Entry, GroupId, Hash, LamportClock};
use ledger_crypto::KeyPair;
use ledger_engine::GroupState;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::Storage;

#[derive(Default)]
struct Inner {
    entries_by_group: HashMap<GroupId, Vec<Entry>>,
    entries_by_id: HashMap<Hash, Entry>,
    group_states: HashMap<GroupId, GroupState>,
    root_identity: Option<[u8; 32]>,
    device_identity: Option<[u8; 32]>,
}

/// An in-process, non-persistent `Storage` implementation — sufficient for
/// tests and for embedding applications prototyping against the contract.
/// Not a production backend: a real one (sled, sqlite, IndexedDB, …) is an
/// external collaborator the engine never assumes the shape of beyond this
/// trait.
#[derive(Default, Clone)]
pub struct InMemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn append_entry(&self, group_id: GroupId, entry: Entry) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.entries_by_id.contains_key(&entry.entry_id) {
            return Ok(()); // idempotent no-op.
        }
        inner.entries_by_id.insert(entry.entry_id, entry.clone());
        inner.entries_by_group.entry(group_id).or_default().push(entry);
        Ok(())
    }

    async fn get_entry(&self, entry_id: Hash) -> Result<Option<Entry>, StorageError> {
        Ok(self.inner.read().await.entries_by_id.get(&entry_id).cloned())
    }

    async fn get_entries_after(
        &self,
        group_id: GroupId,
        after_lamport_clock: LamportClock,
    ) -> Result<Vec<Entry>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries_by_group
            .get(&group_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.lamport_clock > after_lamport_clock)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_latest_entry(&self, group_id: GroupId) -> Result<Option<Entry>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries_by_group
            .get(&group_id)
            .and_then(|entries| entries.iter().max_by_key(|e| e.lamport_clock).cloned()))
    }

    async fn get_all_entries(&self, group_id: GroupId) -> Result<Vec<Entry>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.entries_by_group.get(&group_id).cloned().unwrap_or_default())
    }

    async fn get_group_ids(&self) -> Result<Vec<GroupId>, StorageError> {
        Ok(self.inner.read().await.entries_by_group.keys().copied().collect())
    }

    async fn get_group_state(&self, group_id: GroupId) -> Result<Option<GroupState>, StorageError> {
        Ok(self.inner.read().await.group_states.get(&group_id).cloned())
    }

    async fn save_group_state(&self, group_id: GroupId, state: GroupState) -> Result<(), StorageError> {
        self.inner.write().await.group_states.insert(group_id, state);
        Ok(())
    }

    async fn store_root_identity(&self, keypair: &KeyPair) -> Result<(), StorageError> {
        self.inner.write().await.root_identity = Some(*keypair.secret_key_bytes());
        Ok(())
    }

    async fn get_root_identity(&self) -> Result<Option<KeyPair>, StorageError> {
        Ok(self
            .inner
            .read()
            .await
            .root_identity
            .map(KeyPair::from_secret_bytes))
    }

    async fn store_device_identity(&self, keypair: &KeyPair) -> Result<(), StorageError> {
        self.inner.write().await.device_identity = Some(*keypair.secret_key_bytes());
        Ok(())
    }

    async fn get_device_identity(&self) -> Result<Option<KeyPair>, StorageError> {
        Ok(self
            .inner
            .read()
            .await
            .device_identity
            .map(KeyPair::from_secret_bytes))
    }
}
