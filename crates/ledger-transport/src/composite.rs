use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use ledger_core::{GroupId, LamportClock};

use crate::config::CompositeConfig;
use crate::error::TransportError;
use crate::traits::{ConnectionState, ConnectionStateHandler, EntryHandler, Transport};
use crate::wire::TransportEntry;

/// Dedup key for an entry seen on either leg of the composite transport
/// (§4.7): the same entry published over both relay and peer legs must only
/// reach `on_entry` handlers once.
type SeenKey = (GroupId, LamportClock, ledger_core::PublicKey, String);

fn seen_key(group_id: GroupId, entry: &TransportEntry) -> SeenKey {
    let prefix: String = entry.encrypted_entry_base64.chars().take(32).collect();
    (group_id, entry.lamport_clock, entry.sender_device_key, prefix)
}

struct SeenSet {
    order: VecDeque<SeenKey>,
    members: std::collections::HashSet<SeenKey>,
    capacity: usize,
    trim_chunk: usize,
}

impl SeenSet {
    fn new(config: CompositeConfig) -> Self {
        Self {
            order: VecDeque::new(),
            members: std::collections::HashSet::new(),
            capacity: config.seen_set_capacity,
            trim_chunk: config.seen_set_trim_chunk,
        }
    }

    /// Returns `true` if this is the first time `key` has been seen.
    fn insert(&mut self, key: SeenKey) -> bool {
        if self.members.contains(&key) {
            return false;
        }
        self.members.insert(key.clone());
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            for _ in 0..self.trim_chunk.min(self.order.len()) {
                if let Some(oldest) = self.order.pop_front() {
                    self.members.remove(&oldest);
                }
            }
        }
        true
    }
}

/// Fans publishes and subscriptions out to both a reliable relay transport
/// and a best-effort peer transport, forwarding `on_entry` exactly once per
/// distinct entry regardless of which leg delivered it first (§4.7).
pub struct CompositeTransport {
    relay: Arc<dyn Transport>,
    peer: Arc<dyn Transport>,
    seen: Arc<StdMutex<SeenSet>>,
    entry_handlers: Arc<crate::registry::Registry<EntryHandler>>,
    state_handlers: Arc<crate::registry::Registry<ConnectionStateHandler>>,
}

impl CompositeTransport {
    pub fn new(relay: Arc<dyn Transport>, peer: Arc<dyn Transport>, config: CompositeConfig) -> Arc<Self> {
        let seen = Arc::new(StdMutex::new(SeenSet::new(config)));
        let entry_handlers = Arc::new(crate::registry::Registry::default());
        let state_handlers = Arc::new(crate::registry::Registry::default());

        let transport = Arc::new(Self {
            relay: relay.clone(),
            peer: peer.clone(),
            seen: seen.clone(),
            entry_handlers: entry_handlers.clone(),
            state_handlers: state_handlers.clone(),
        });

        let dedup_seen = seen.clone();
        let dedup_handlers = entry_handlers.clone();
        relay.on_entry(Arc::new(move |group_id, entry| {
            let first_seen = dedup_seen
                .lock()
                .expect("seen set mutex poisoned")
                .insert(seen_key(group_id, &entry));
            if first_seen {
                for handler in dedup_handlers.snapshot() {
                    handler(group_id, entry.clone());
                }
            }
        }));

        let dedup_seen = seen.clone();
        let dedup_handlers = entry_handlers.clone();
        peer.on_entry(Arc::new(move |group_id, entry| {
            let first_seen = dedup_seen
                .lock()
                .expect("seen set mutex poisoned")
                .insert(seen_key(group_id, &entry));
            if first_seen {
                for handler in dedup_handlers.snapshot() {
                    handler(group_id, entry.clone());
                }
            }
        }));

        let forward_handlers = state_handlers.clone();
        relay.on_connection_state(Arc::new(move |group_id, state| {
            for handler in forward_handlers.snapshot() {
                handler(group_id, state);
            }
        }));
        let forward_handlers = state_handlers.clone();
        peer.on_connection_state(Arc::new(move |group_id, state| {
            for handler in forward_handlers.snapshot() {
                handler(group_id, state);
            }
        }));

        transport
    }
}

#[async_trait]
impl Transport for CompositeTransport {
    async fn connect(&self, group_id: GroupId) -> Result<(), TransportError> {
        // The relay is authoritative; a peer-leg failure to connect should
        // not prevent sync from working over the relay alone.
        self.relay.connect(group_id).await?;
        let _ = self.peer.connect(group_id).await;
        Ok(())
    }

    async fn disconnect(&self, group_id: GroupId) -> Result<(), TransportError> {
        let relay_result = self.relay.disconnect(group_id).await;
        let _ = self.peer.disconnect(group_id).await;
        relay_result
    }

    async fn disconnect_all(&self) -> Result<(), TransportError> {
        let relay_result = self.relay.disconnect_all().await;
        let _ = self.peer.disconnect_all().await;
        relay_result
    }

    async fn publish_entry(
        &self,
        group_id: GroupId,
        transport_entry: TransportEntry,
    ) -> Result<(), TransportError> {
        // Mark our own publish as seen so an echo of it back from either leg
        // does not get redelivered to handlers as if it were new.
        self.seen
            .lock()
            .expect("seen set mutex poisoned")
            .insert(seen_key(group_id, &transport_entry));

        let relay_result = self.relay.publish_entry(group_id, transport_entry.clone()).await;
        let _ = self.peer.publish_entry(group_id, transport_entry).await;
        relay_result
    }

    async fn get_entries_after(
        &self,
        group_id: GroupId,
        after_lamport_clock: LamportClock,
    ) -> Result<Vec<TransportEntry>, TransportError> {
        self.relay.get_entries_after(group_id, after_lamport_clock).await
    }

    async fn get_full_ledger(&self, group_id: GroupId) -> Result<Vec<TransportEntry>, TransportError> {
        self.relay.get_full_ledger(group_id).await
    }

    fn on_entry(&self, handler: EntryHandler) {
        self.entry_handlers.push(handler);
    }

    fn on_connection_state(&self, handler: ConnectionStateHandler) {
        self.state_handlers.push(handler);
    }

    fn connected(&self) -> bool {
        self.relay.connected() || self.peer.connected()
    }
}
