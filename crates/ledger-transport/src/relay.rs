use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use ledger_core::{GroupId, LamportClock};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::TransportError;
use crate::traits::{ConnectionState, ConnectionStateHandler, EntryHandler, Transport};
use crate::wire::{ClientMessage, ServerMessage, TransportEntry, WireEntry};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type PendingMap = HashMap<String, oneshot::Sender<Result<Vec<WireEntry>, TransportError>>>;

struct Shared {
    write: AsyncMutex<Option<futures::stream::SplitSink<WsStream, WsMessage>>>,
    pending: StdMutex<PendingMap>,
    subscriptions: StdMutex<HashSet<GroupId>>,
    connected: AtomicBool,
    entry_handlers: crate::registry::Registry<EntryHandler>,
    state_handlers: crate::registry::Registry<ConnectionStateHandler>,
    reconnect_task: StdMutex<Option<JoinHandle<()>>>,
    keepalive_task: AsyncMutex<Option<JoinHandle<()>>>,
    read_task: AsyncMutex<Option<JoinHandle<()>>>,
}

/// Reliable request/response + server-push relay transport (§4.7): one
/// persistent WebSocket connection multiplexing every subscribed group,
/// reconnecting with a fixed delay while at least one subscription is live,
/// with a keepalive ping and per-request timeouts on history queries.
pub struct RelayTransport {
    config: RelayConfig,
    shared: Arc<Shared>,
}

fn request_key(group_id: GroupId, kind: &str) -> String {
    format!("{group_id}:{kind}")
}

impl RelayTransport {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                write: AsyncMutex::new(None),
                pending: StdMutex::new(HashMap::new()),
                subscriptions: StdMutex::new(HashSet::new()),
                connected: AtomicBool::new(false),
                entry_handlers: crate::registry::Registry::default(),
                state_handlers: crate::registry::Registry::default(),
                reconnect_task: StdMutex::new(None),
                keepalive_task: AsyncMutex::new(None),
                read_task: AsyncMutex::new(None),
            }),
        }
    }

    fn notify_state(shared: &Shared, group_id: GroupId, state: ConnectionState) {
        for handler in shared.state_handlers.snapshot() {
            handler(group_id, state);
        }
    }

    async fn establish(&self) -> Result<(), TransportError> {
        let (ws_stream, _response) = connect_async(&self.config.url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (write, mut read) = ws_stream.split();

        *self.shared.write.lock().await = Some(write);
        self.shared.connected.store(true, Ordering::SeqCst);
        info!(url = %self.config.url, "relay transport connected");

        let shared = self.shared.clone();
        let url = self.config.url.clone();
        let reconnect_delay = self.config.reconnect_delay;
        let keepalive_interval = self.config.keepalive_interval;
        let read_task = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => handle_server_text(&shared, &text),
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            shared.connected.store(false, Ordering::SeqCst);
            reject_all_pending(&shared, TransportError::ConnectionClosed);
            schedule_reconnect(shared, url, reconnect_delay, keepalive_interval);
        });
        *self.shared.read_task.lock().await = Some(read_task);

        self.start_keepalive().await;
        Ok(())
    }

    async fn start_keepalive(&self) {
        spawn_keepalive(self.shared.clone(), self.config.keepalive_interval).await;
    }

    async fn send(&self, msg: &ClientMessage) -> Result<(), TransportError> {
        let payload = serde_json::to_string(msg)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let mut write = self.shared.write.lock().await;
        match write.as_mut() {
            Some(sink) => sink
                .send(WsMessage::Text(payload))
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string())),
            None => Err(TransportError::NotConnected),
        }
    }

    async fn request(
        &self,
        group_id: GroupId,
        kind: &'static str,
        msg: ClientMessage,
    ) -> Result<Vec<TransportEntry>, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .expect("pending map mutex poisoned")
            .insert(request_key(group_id, kind), tx);

        self.send(&msg).await?;

        let result = tokio::time::timeout(self.config.request_timeout, rx).await;
        match result {
            Ok(Ok(Ok(entries))) => Ok(entries.into_iter().map(Into::into).collect()),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed),
            Err(_) => {
                self.shared
                    .pending
                    .lock()
                    .expect("pending map mutex poisoned")
                    .remove(&request_key(group_id, kind));
                Err(TransportError::Timeout(self.config.request_timeout))
            }
        }
    }
}

async fn spawn_keepalive(shared: Arc<Shared>, interval: std::time::Duration) {
    if let Some(previous) = shared.keepalive_task.lock().await.take() {
        previous.abort();
    }
    let shared_inner = shared.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if !shared_inner.connected.load(Ordering::SeqCst) {
                break;
            }
            let mut write = shared_inner.write.lock().await;
            if let Some(sink) = write.as_mut() {
                let payload = serde_json::to_string(&ClientMessage::Ping).unwrap_or_default();
                if sink.send(WsMessage::Text(payload)).await.is_err() {
                    break;
                }
            }
        }
    });
    *shared.keepalive_task.lock().await = Some(handle);
}

/// Attempt to reconnect after an unexpected disconnect, with a fixed delay,
/// but only while at least one group subscription is still live (§5). Each
/// failed attempt reschedules itself; there is no reconnect attempt cap —
/// `disconnect_all` is the only way to stop retrying, by clearing every
/// subscription first.
fn schedule_reconnect(
    shared: Arc<Shared>,
    url: String,
    delay: std::time::Duration,
    keepalive_interval: std::time::Duration,
) {
    if let Some(previous) = shared
        .reconnect_task
        .lock()
        .expect("reconnect task mutex poisoned")
        .take()
    {
        previous.abort();
    }
    let shared_for_slot = shared.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let still_subscribed = !shared
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .is_empty();
        if !still_subscribed {
            return;
        }

        match connect_async(&url).await {
            Ok((ws_stream, _)) => {
                let (write, mut read) = ws_stream.split();
                *shared.write.lock().await = Some(write);
                shared.connected.store(true, Ordering::SeqCst);
                info!(%url, "relay transport reconnected");
                for group_id in shared
                    .subscriptions
                    .lock()
                    .expect("subscriptions mutex poisoned")
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
                {
                    RelayTransport::notify_state(&shared, group_id, ConnectionState::Connected);
                }

                let shared_inner = shared.clone();
                let url_inner = url.clone();
                let read_task = tokio::spawn(async move {
                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(WsMessage::Text(text)) => handle_server_text(&shared_inner, &text),
                            Ok(WsMessage::Close(_)) | Err(_) => break,
                            _ => {}
                        }
                    }
                    shared_inner.connected.store(false, Ordering::SeqCst);
                    reject_all_pending(&shared_inner, TransportError::ConnectionClosed);
                    schedule_reconnect(shared_inner, url_inner, delay, keepalive_interval);
                });
                *shared.read_task.lock().await = Some(read_task);
                spawn_keepalive(shared.clone(), keepalive_interval).await;
            }
            Err(e) => {
                warn!(error = %e, "relay reconnect attempt failed");
                for group_id in shared
                    .subscriptions
                    .lock()
                    .expect("subscriptions mutex poisoned")
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
                {
                    RelayTransport::notify_state(&shared, group_id, ConnectionState::Reconnecting);
                }
                schedule_reconnect(shared, url, delay, keepalive_interval);
            }
        }
    });
    *shared_for_slot
        .reconnect_task
        .lock()
        .expect("reconnect task mutex poisoned") = Some(task);
}

fn reject_all_pending(shared: &Shared, err: TransportError) {
    let mut pending = shared.pending.lock().expect("pending map mutex poisoned");
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(match &err {
            TransportError::ConnectionClosed => TransportError::ConnectionClosed,
            other => TransportError::ConnectionFailed(other.to_string()),
        }));
    }
}

fn handle_server_text(shared: &Shared, text: &str) {
    let Ok(msg) = serde_json::from_str::<ServerMessage>(text) else {
        debug!("ignoring unparseable relay frame");
        return;
    };
    match msg {
        ServerMessage::NewEntry {
            group_id,
            encrypted_entry,
            lamport_clock,
            sender_pubkey,
        } => {
            let entry = TransportEntry {
                encrypted_entry_base64: encrypted_entry,
                lamport_clock,
                sender_device_key: sender_pubkey,
            };
            for handler in shared.entry_handlers.snapshot() {
                handler(group_id, entry.clone());
            }
        }
        ServerMessage::EntriesResponse { group_id, entries } => {
            complete_pending(shared, group_id, "entries_after", Ok(entries));
        }
        ServerMessage::FullLedger { group_id, entries } => {
            complete_pending(shared, group_id, "full_ledger", Ok(entries));
        }
        ServerMessage::Pong => {}
        ServerMessage::Error { code, message } => {
            warn!(%code, %message, "relay reported an error");
        }
    }
}

fn complete_pending(
    shared: &Shared,
    group_id: GroupId,
    kind: &str,
    result: Result<Vec<WireEntry>, TransportError>,
) {
    if let Some(tx) = shared
        .pending
        .lock()
        .expect("pending map mutex poisoned")
        .remove(&request_key(group_id, kind))
    {
        let _ = tx.send(result);
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn connect(&self, group_id: GroupId) -> Result<(), TransportError> {
        let already_connected = self.shared.connected.load(Ordering::SeqCst);
        self.shared
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .insert(group_id);

        if !already_connected {
            self.establish().await?;
            Self::notify_state(&self.shared, group_id, ConnectionState::Connected);
        }
        Ok(())
    }

    async fn disconnect(&self, group_id: GroupId) -> Result<(), TransportError> {
        self.shared
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .remove(&group_id);
        Ok(())
    }

    async fn disconnect_all(&self) -> Result<(), TransportError> {
        self.shared
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .clear();
        self.shared.connected.store(false, Ordering::SeqCst);
        *self.shared.write.lock().await = None;
        if let Some(task) = self.shared.read_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.shared.keepalive_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self
            .shared
            .reconnect_task
            .lock()
            .expect("reconnect task mutex poisoned")
            .take()
        {
            task.abort();
        }
        reject_all_pending(&self.shared, TransportError::ConnectionClosed);
        Ok(())
    }

    async fn publish_entry(
        &self,
        group_id: GroupId,
        transport_entry: TransportEntry,
    ) -> Result<(), TransportError> {
        self.send(&ClientMessage::PublishEntry {
            group_id,
            lamport_clock: transport_entry.lamport_clock,
            sender_pubkey: transport_entry.sender_device_key,
            encrypted_entry: transport_entry.encrypted_entry_base64,
        })
        .await
    }

    async fn get_entries_after(
        &self,
        group_id: GroupId,
        after_lamport_clock: LamportClock,
    ) -> Result<Vec<TransportEntry>, TransportError> {
        self.request(
            group_id,
            "entries_after",
            ClientMessage::GetEntriesAfter {
                group_id,
                after_lamport_clock,
            },
        )
        .await
    }

    async fn get_full_ledger(&self, group_id: GroupId) -> Result<Vec<TransportEntry>, TransportError> {
        self.request(group_id, "full_ledger", ClientMessage::GetFullLedger { group_id })
            .await
    }

    fn on_entry(&self, handler: EntryHandler) {
        self.shared.entry_handlers.push(handler);
    }

    fn on_connection_state(&self, handler: ConnectionStateHandler) {
        self.shared.state_handlers.push(handler);
    }

    fn connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}
