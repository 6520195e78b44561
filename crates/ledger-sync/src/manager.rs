use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ledger_core::{Entry, GroupId};
use ledger_crypto::GroupKey;
use ledger_storage::Storage;
use ledger_transport::{Transport, TransportEntry};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::events::{RejectionReason, SyncEvent, SyncEventHandler};

/// Default interval between background gap-fill passes for a registered
/// group (§4.8).
pub const DEFAULT_BACKGROUND_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Holds per-group AEAD keys, publishes locally produced entries, pulls and
/// validates remote ones, reconciles missing history, and emits lifecycle
/// events (§4.8). One instance typically serves every group a device
/// participates in.
pub struct SyncManager {
    storage: Arc<dyn Storage>,
    transport: Arc<dyn Transport>,
    group_keys: StdMutex<HashMap<GroupId, GroupKey>>,
    group_locks: StdMutex<HashMap<GroupId, Arc<AsyncMutex<()>>>>,
    background_tasks: StdMutex<HashMap<GroupId, JoinHandle<()>>>,
    event_handlers: ledger_transport::registry::Registry<SyncEventHandler>,
    background_interval: Duration,
}

impl SyncManager {
    pub fn new(storage: Arc<dyn Storage>, transport: Arc<dyn Transport>) -> Self {
        Self::with_background_interval(storage, transport, DEFAULT_BACKGROUND_SYNC_INTERVAL)
    }

    pub fn with_background_interval(
        storage: Arc<dyn Storage>,
        transport: Arc<dyn Transport>,
        background_interval: Duration,
    ) -> Self {
        Self {
            storage,
            transport,
            group_keys: StdMutex::new(HashMap::new()),
            group_locks: StdMutex::new(HashMap::new()),
            background_tasks: StdMutex::new(HashMap::new()),
            event_handlers: ledger_transport::registry::Registry::default(),
            background_interval,
        }
    }

    pub fn on_event(&self, handler: SyncEventHandler) {
        self.event_handlers.push(handler);
    }

    /// Derive and retain this group's AEAD key from a caller-supplied shared
    /// secret (§4.8 key registration).
    pub fn register_group_key(&self, group_id: GroupId, shared_secret: &[u8]) {
        let key = ledger_crypto::derive_group_key(shared_secret, &group_id);
        self.group_keys
            .lock()
            .expect("group key map mutex poisoned")
            .insert(group_id, key);
    }

    fn group_key(&self, group_id: GroupId) -> Result<GroupKey, SyncError> {
        self.group_keys
            .lock()
            .expect("group key map mutex poisoned")
            .get(&group_id)
            .cloned()
            .ok_or(SyncError::NoGroupKey)
    }

    fn group_lock(&self, group_id: GroupId) -> Arc<AsyncMutex<()>> {
        self.group_locks
            .lock()
            .expect("group lock map mutex poisoned")
            .entry(group_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn emit(&self, event: SyncEvent) {
        match &event {
            SyncEvent::EntryReceived { group_id, entry_id } => {
                info!(%group_id, %entry_id, "entry received");
            }
            SyncEvent::EntryRejected { group_id, entry_id, reason } => {
                warn!(%group_id, ?entry_id, ?reason, "entry rejected");
            }
            SyncEvent::SyncStart { group_id } => {
                info!(%group_id, "sync started");
            }
            SyncEvent::SyncComplete { group_id, accepted, total } => {
                info!(%group_id, accepted, total, "sync complete");
            }
            SyncEvent::SyncError { group_id, message } => {
                error!(%group_id, %message, "sync error");
            }
        }
        for handler in self.event_handlers.snapshot() {
            handler(event.clone());
        }
    }

    // ── Broadcast path (§4.8) ───────────────────────────────────────────────

    /// Canonically serialize, encrypt, base64-encode, and publish an already
    /// locally-created entry. Does not persist — the caller is expected to
    /// have appended `entry` to storage before broadcasting it.
    pub async fn publish_entry(&self, group_id: GroupId, entry: &Entry) -> Result<(), SyncError> {
        let key = self.group_key(group_id)?;
        let canonical = ledger_core::to_canonical_bytes(entry)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        let frame = ledger_crypto::encrypt(&key, &canonical);
        let encrypted_entry_base64 = BASE64.encode(frame);

        self.transport
            .publish_entry(
                group_id,
                TransportEntry {
                    encrypted_entry_base64,
                    lamport_clock: entry.lamport_clock,
                    sender_device_key: entry.creator_device_pubkey,
                },
            )
            .await?;
        Ok(())
    }

    // ── Incoming path (§4.8) ────────────────────────────────────────────────

    /// Decrypt, deserialize, dedup, validate, persist, and apply one transport
    /// entry (steps i–vii). Never returns a validation-shaped error — every
    /// rejection is an `entry:rejected` event.
    pub async fn handle_incoming_entry(
        &self,
        group_id: GroupId,
        transport_entry: TransportEntry,
    ) -> Result<bool, SyncError> {
        let key = self.group_key(group_id)?;

        let frame = match BASE64.decode(&transport_entry.encrypted_entry_base64) {
            Ok(f) => f,
            Err(_) => {
                self.emit(SyncEvent::EntryRejected {
                    group_id,
                    entry_id: None,
                    reason: RejectionReason::Decryption,
                });
                return Ok(false);
            }
        };
        let plaintext = match ledger_crypto::decrypt(&key, &frame) {
            Ok(p) => p,
            Err(_) => {
                self.emit(SyncEvent::EntryRejected {
                    group_id,
                    entry_id: None,
                    reason: RejectionReason::Decryption,
                });
                return Ok(false);
            }
        };
        let entry: Entry = match serde_json::from_slice(&plaintext) {
            Ok(e) => e,
            Err(e) => {
                self.emit(SyncEvent::EntryRejected {
                    group_id,
                    entry_id: None,
                    reason: RejectionReason::Deserialization(e.to_string()),
                });
                return Ok(false);
            }
        };

        self.accept_if_valid(group_id, entry).await
    }

    /// The validate→persist→apply→recompute critical section, gated behind a
    /// per-group lock so two incoming entries for the same group never
    /// interleave inside it (§5).
    async fn accept_if_valid(&self, group_id: GroupId, entry: Entry) -> Result<bool, SyncError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;

        if self.storage.get_entry(entry.entry_id).await?.is_some() {
            return Ok(false); // duplicate — silently dropped (iv).
        }

        let preceding = self.storage.get_all_entries(group_id).await?;
        let preceding = ledger_engine::ordered(preceding);
        let state = self.storage.get_group_state(group_id).await?;

        let is_genesis = matches!(entry.payload, ledger_core::EntryPayload::Genesis { .. });
        if state.is_none() && !is_genesis {
            self.emit(SyncEvent::EntryRejected {
                group_id,
                entry_id: Some(entry.entry_id),
                reason: RejectionReason::ExpectedGenesisFirst,
            });
            return Ok(false);
        }

        let outcome = ledger_engine::validate_entry(&entry, &preceding, state.as_ref());
        if !outcome.valid {
            self.emit(SyncEvent::EntryRejected {
                group_id,
                entry_id: Some(entry.entry_id),
                reason: RejectionReason::ValidationFailed(outcome.issues),
            });
            return Ok(false);
        }

        let entry_id = entry.entry_id;
        self.storage.append_entry(group_id, entry.clone()).await?;

        let mut new_state = ledger_engine::apply_entry(&entry, state);
        let mut full_entries = preceding;
        full_entries.push(entry);
        new_state.balances = ledger_balance::compute_balances(&full_entries);
        self.storage.save_group_state(group_id, new_state).await?;

        self.emit(SyncEvent::EntryReceived { group_id, entry_id });
        Ok(true)
    }

    // ── Initial sync (§4.8) ─────────────────────────────────────────────────

    /// Fetch the full remote ledger, validate it as a single chain, and on
    /// success persist every entry plus the final derived state. Persists
    /// nothing on failure.
    pub async fn initial_sync(&self, group_id: GroupId) -> Result<(), SyncError> {
        self.emit(SyncEvent::SyncStart { group_id });
        let key = self.group_key(group_id)?;

        let remote_entries = match self.transport.get_full_ledger(group_id).await {
            Ok(entries) => entries,
            Err(e) => {
                self.emit(SyncEvent::SyncError {
                    group_id,
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut decoded = Vec::with_capacity(remote_entries.len());
        for transport_entry in remote_entries {
            let Ok(frame) = BASE64.decode(&transport_entry.encrypted_entry_base64) else {
                continue;
            };
            let Ok(plaintext) = ledger_crypto::decrypt(&key, &frame) else {
                continue;
            };
            if let Ok(entry) = serde_json::from_slice::<Entry>(&plaintext) {
                decoded.push(entry);
            }
        }

        let result = ledger_engine::validate_and_replay_chain(decoded.clone());
        if !result.valid {
            self.emit(SyncEvent::SyncError {
                group_id,
                message: format!("initial sync chain invalid: {} error(s)", result.errors.len()),
            });
            return Err(SyncError::InvalidChain(result.errors));
        }

        let lock = self.group_lock(group_id);
        let _guard = lock.lock().await;
        let ordered_entries = ledger_engine::ordered(decoded);
        for entry in &ordered_entries {
            self.storage.append_entry(group_id, entry.clone()).await?;
        }
        if let Some(state) = result.state {
            self.storage.save_group_state(group_id, state).await?;
        }

        self.emit(SyncEvent::SyncComplete {
            group_id,
            accepted: ordered_entries.len(),
            total: ordered_entries.len(),
        });
        Ok(())
    }

    // ── Gap-fill sync (§4.8) ────────────────────────────────────────────────

    /// Fetch every remote entry strictly after the locally-known Lamport
    /// clock and feed each through the incoming path individually (so a
    /// partial failure still persists the entries that do validate).
    ///
    /// `current_lamport_clock` is unsigned, so the "or -1 if absent" fence
    /// has no literal representation when no local state exists yet. In that
    /// case this fetches the entire remote history (`get_entries_after(...,
    /// 0)` would silently skip a Genesis entry legitimately carrying
    /// `lamport_clock == 0`) and lets it through the same incoming path used
    /// for everything else.
    pub async fn gap_fill_sync(&self, group_id: GroupId) -> Result<(), SyncError> {
        self.emit(SyncEvent::SyncStart { group_id });

        let existing_state = self.storage.get_group_state(group_id).await?;
        let remote_entries = match &existing_state {
            Some(state) => self.transport.get_entries_after(group_id, state.current_lamport_clock).await,
            None => self.transport.get_full_ledger(group_id).await,
        };
        let remote_entries = match remote_entries {
            Ok(entries) => entries,
            Err(e) => {
                self.emit(SyncEvent::SyncError {
                    group_id,
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let total = remote_entries.len();
        let mut accepted = 0usize;
        for transport_entry in remote_entries {
            match self.handle_incoming_entry(group_id, transport_entry).await {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(e) => {
                    self.emit(SyncEvent::SyncError {
                        group_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.emit(SyncEvent::SyncComplete {
            group_id,
            accepted,
            total,
        });
        Ok(())
    }

    // ── Background sync (§4.8) ─────────────────────────────────────────────

    /// Connect the transport, run one gap-fill pass, then install a
    /// recurring timer. Unhandled sync errors from the timer emit
    /// `sync:error` but never stop the timer.
    pub async fn start_sync(self: &Arc<Self>, group_id: GroupId) -> Result<(), SyncError> {
        self.transport.connect(group_id).await?;
        self.gap_fill_sync(group_id).await?;

        let manager = self.clone();
        let interval = self.background_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick.
            loop {
                ticker.tick().await;
                if let Err(e) = manager.gap_fill_sync(group_id).await {
                    manager.emit(SyncEvent::SyncError {
                        group_id,
                        message: e.to_string(),
                    });
                }
            }
        });

        if let Some(previous) = self
            .background_tasks
            .lock()
            .expect("background task map mutex poisoned")
            .insert(group_id, handle)
        {
            previous.abort();
        }
        Ok(())
    }

    /// Cancel the background timer and disconnect the transport.
    pub async fn stop_sync(&self, group_id: GroupId) -> Result<(), SyncError> {
        if let Some(task) = self
            .background_tasks
            .lock()
            .expect("background task map mutex poisoned")
            .remove(&group_id)
        {
            task.abort();
        }
        self.transport.disconnect(group_id).await?;
        Ok(())
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        for (_, task) in self
            .background_tasks
            .lock()
            .expect("background task map mutex poisoned")
            .drain()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledger_core::Hash;
    use ledger_engine::build_genesis;
    use ledger_storage::memory::InMemoryStorage;
    use ledger_transport::{ConnectionState, ConnectionStateHandler, EntryHandler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A transport stand-in whose history methods return a fixed, injected
    /// set of entries — enough to drive gap-fill/initial-sync scenarios
    /// without a real relay.
    #[derive(Default)]
    struct FakeTransport {
        entries_after: StdMutex<Vec<TransportEntry>>,
        full_ledger: StdMutex<Vec<TransportEntry>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn connect(&self, _group_id: GroupId) -> Result<(), ledger_transport::TransportError> {
            Ok(())
        }
        async fn disconnect(&self, _group_id: GroupId) -> Result<(), ledger_transport::TransportError> {
            Ok(())
        }
        async fn disconnect_all(&self) -> Result<(), ledger_transport::TransportError> {
            Ok(())
        }
        async fn publish_entry(
            &self,
            _group_id: GroupId,
            _transport_entry: TransportEntry,
        ) -> Result<(), ledger_transport::TransportError> {
            Ok(())
        }
        async fn get_entries_after(
            &self,
            _group_id: GroupId,
            _after_lamport_clock: u64,
        ) -> Result<Vec<TransportEntry>, ledger_transport::TransportError> {
            Ok(self.entries_after.lock().unwrap().clone())
        }
        async fn get_full_ledger(
            &self,
            _group_id: GroupId,
        ) -> Result<Vec<TransportEntry>, ledger_transport::TransportError> {
            Ok(self.full_ledger.lock().unwrap().clone())
        }
        fn on_entry(&self, _handler: EntryHandler) {}
        fn on_connection_state(&self, _handler: ConnectionStateHandler) {}
        fn connected(&self) -> bool {
            true
        }
    }

    fn encrypt_entry(key: &GroupKey, entry: &Entry) -> TransportEntry {
        let canonical = ledger_core::to_canonical_bytes(entry).unwrap();
        let frame = ledger_crypto::encrypt(key, &canonical);
        TransportEntry {
            encrypted_entry_base64: BASE64.encode(frame),
            lamport_clock: entry.lamport_clock,
            sender_device_key: entry.creator_device_pubkey,
        }
    }

    #[tokio::test]
    async fn publish_then_handle_incoming_round_trips() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let transport: Arc<dyn Transport> = Arc::new(FakeTransport::default());
        let manager = SyncManager::new(storage.clone(), transport);

        let group_id = GroupId::new();
        manager.register_group_key(group_id, b"shared secret");

        let creator = ledger_crypto::KeyPair::generate();
        let genesis = build_genesis(&creator, group_id, "Trip".into(), "Alice".into(), 1_700_000_000_000).unwrap();

        let key = manager.group_key(group_id).unwrap();
        let wire = encrypt_entry(&key, &genesis);

        let accepted = manager.handle_incoming_entry(group_id, wire).await.unwrap();
        assert!(accepted);
        assert!(storage.get_entry(genesis.entry_id).await.unwrap().is_some());
        assert!(storage.get_group_state(group_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_incoming_entry_is_silently_dropped() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let transport: Arc<dyn Transport> = Arc::new(FakeTransport::default());
        let manager = SyncManager::new(storage.clone(), transport);

        let group_id = GroupId::new();
        manager.register_group_key(group_id, b"shared secret");
        let creator = ledger_crypto::KeyPair::generate();
        let genesis = build_genesis(&creator, group_id, "Trip".into(), "Alice".into(), 1_700_000_000_000).unwrap();
        let key = manager.group_key(group_id).unwrap();
        let wire = encrypt_entry(&key, &genesis);

        assert!(manager.handle_incoming_entry(group_id, wire.clone()).await.unwrap());
        assert!(!manager.handle_incoming_entry(group_id, wire).await.unwrap());
        assert_eq!(storage.get_all_entries(group_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn undecryptable_frame_emits_rejection_and_is_not_persisted() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let transport: Arc<dyn Transport> = Arc::new(FakeTransport::default());
        let manager = SyncManager::new(storage.clone(), transport);
        let group_id = GroupId::new();
        manager.register_group_key(group_id, b"shared secret");

        let rejections = Arc::new(AtomicUsize::new(0));
        let rejections_clone = rejections.clone();
        manager.on_event(Arc::new(move |event| {
            if matches!(event, SyncEvent::EntryRejected { .. }) {
                rejections_clone.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let garbage = TransportEntry {
            encrypted_entry_base64: BASE64.encode(b"not a real frame"),
            lamport_clock: 1,
            sender_device_key: ledger_core::PublicKey::from_bytes([3u8; 32]),
        };
        let accepted = manager.handle_incoming_entry(group_id, garbage).await.unwrap();
        assert!(!accepted);
        assert_eq!(rejections.load(Ordering::SeqCst), 1);
        assert_eq!(storage.get_group_ids().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn gap_fill_persists_new_entries_and_skips_already_known_ones() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let fake = Arc::new(FakeTransport::default());
        let transport: Arc<dyn Transport> = fake.clone();
        let manager = SyncManager::new(storage.clone(), transport);

        let group_id = GroupId::new();
        manager.register_group_key(group_id, b"shared secret");
        let creator = ledger_crypto::KeyPair::generate();
        let genesis = build_genesis(&creator, group_id, "Trip".into(), "Alice".into(), 1_700_000_000_000).unwrap();
        let key = manager.group_key(group_id).unwrap();

        // Pre-persist the genesis entry and its derived state, simulating a
        // device that is already partway caught up.
        manager.handle_incoming_entry(group_id, encrypt_entry(&key, &genesis)).await.unwrap();

        let member_added = ledger_engine::EntryBuilder::new(
            Some(genesis.entry_id),
            1,
            1_700_000_001_000,
            ledger_core::EntryPayload::MemberRemoved {
                member_root_pubkey: creator.public_key,
                reason: Some("left the trip".to_string()),
            },
        )
        .build(&creator)
        .unwrap();

        *fake.entries_after.lock().unwrap() = vec![
            encrypt_entry(&key, &genesis),      // already known — dropped as duplicate.
            encrypt_entry(&key, &member_added),  // new — accepted.
        ];

        manager.gap_fill_sync(group_id).await.unwrap();

        let state = storage.get_group_state(group_id).await.unwrap().unwrap();
        assert!(!state.is_active_member(&creator.public_key));
        assert_eq!(storage.get_all_entries(group_id).await.unwrap().len(), 2);
    }

    #[test]
    fn default_background_interval_matches_spec_default() {
        assert_eq!(DEFAULT_BACKGROUND_SYNC_INTERVAL.as_secs(), 30);
    }
}
