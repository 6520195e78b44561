use std::sync::Arc;

use async_trait::async_trait;
use ledger_core::{GroupId, LamportClock};

use crate::error::TransportError;
use crate::wire::TransportEntry;

/// Connection lifecycle states a transport reports through
/// `on_connection_state` (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

pub type EntryHandler = Arc<dyn Fn(GroupId, TransportEntry) + Send + Sync>;
pub type ConnectionStateHandler = Arc<dyn Fn(GroupId, ConnectionState) + Send + Sync>;

/// The publish/fetch/subscribe contract every transport satisfies (§4.7):
/// a reliable relay transport, a best-effort peer transport, and a
/// composite transport that fans out to both and deduplicates.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, group_id: GroupId) -> Result<(), TransportError>;
    async fn disconnect(&self, group_id: GroupId) -> Result<(), TransportError>;
    async fn disconnect_all(&self) -> Result<(), TransportError>;

    async fn publish_entry(
        &self,
        group_id: GroupId,
        transport_entry: TransportEntry,
    ) -> Result<(), TransportError>;

    /// Entries for `group_id` with `lamport_clock` strictly greater than
    /// `after_lamport_clock`. Ordering is unspecified — the sync manager
    /// re-orders.
    async fn get_entries_after(
        &self,
        group_id: GroupId,
        after_lamport_clock: LamportClock,
    ) -> Result<Vec<TransportEntry>, TransportError>;

    async fn get_full_ledger(&self, group_id: GroupId) -> Result<Vec<TransportEntry>, TransportError>;

    /// Register a handler invoked for every entry pushed by the transport
    /// (as opposed to explicitly fetched). Handlers may register further
    /// handlers or otherwise mutate the registry from within a notification.
    fn on_entry(&self, handler: EntryHandler);

    fn on_connection_state(&self, handler: ConnectionStateHandler);

    /// Best-effort: whether the transport currently believes it is connected.
    fn connected(&self) -> bool;
}
